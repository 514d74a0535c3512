//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

/// Result Type for Codec Operations
pub type CodecResult<T> = Result<T, CodecError>;

/// Represents possible errors that can occur while framing PWM traffic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// An I/O error occurred while reading from or writing to the underlying stream.
    ///
    /// Contains the error kind and a description of what operation failed.
    IOError {
        /// The kind of I/O error that occurred
        kind: std::io::ErrorKind,
        /// Description of the operation that failed
        operation: String,
    },

    /// The stream ended part way through a request frame.
    TruncatedFrame {
        /// Number of bytes of the incomplete frame that were received
        received: usize,
    },

    /// A response line grew past the allowed length without a newline.
    ResponseTooLong {
        /// Number of bytes buffered so far
        length: usize,
        /// Maximum permitted line length
        limit: usize,
    },

    /// A response line was not valid UTF-8.
    InvalidUtf8,

    /// A response line did not match any known response text.
    UnknownResponse(String),
}

impl CodecError {
    /// Check if the error was caused by the peer closing mid-frame
    pub fn is_truncated(&self) -> bool {
        matches!(self, CodecError::TruncatedFrame { .. })
    }
}

impl std::error::Error for CodecError {}

impl std::fmt::Display for CodecError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CodecError::IOError { kind, operation } => {
                write!(f, "I/O error during {}: {:?}", operation, kind)
            }
            CodecError::TruncatedFrame { received } => {
                write!(
                    f,
                    "stream ended after {} of {} request bytes",
                    received,
                    crate::REQUEST_FRAME_LEN
                )
            }
            CodecError::ResponseTooLong { length, limit } => {
                write!(f, "response line too long ({} > {} bytes)", length, limit)
            }
            CodecError::InvalidUtf8 => write!(f, "response line is not valid UTF-8"),
            CodecError::UnknownResponse(line) => write!(f, "unknown response: {:?}", line),
        }
    }
}

impl From<std::io::Error> for CodecError {
    fn from(err: std::io::Error) -> Self {
        CodecError::IOError {
            kind: err.kind(),
            operation: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_conversion() {
        let err: CodecError =
            std::io::Error::new(std::io::ErrorKind::BrokenPipe, "write failed").into();
        assert!(matches!(
            err,
            CodecError::IOError {
                kind: std::io::ErrorKind::BrokenPipe,
                ..
            }
        ));
        assert!(!err.is_truncated());
    }

    #[test]
    fn test_display() {
        let err = CodecError::TruncatedFrame { received: 5 };
        assert_eq!(err.to_string(), "stream ended after 5 of 12 request bytes");
        assert!(err.is_truncated());
    }
}
