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

//! Client error types

use pulsewire_codec::{CodecError, PwmResponse};
use std::io;
use thiserror::Error;

/// Client error type
#[derive(Debug, Error)]
pub enum ClientError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[source] io::Error),

    /// No server is listening at the socket path
    #[error("Socket not found")]
    SocketNotFound,

    /// Connection refused
    #[error("Connection refused")]
    ConnectionRefused,

    /// Connection timeout
    #[error("Connection timeout")]
    ConnectionTimeout,

    /// No response arrived in time
    #[error("Response timeout")]
    ResponseTimeout,

    /// Connection closed by server
    #[error("Connection closed by server")]
    ConnectionClosed,

    /// Malformed data from the server
    #[error("Codec error: {0}")]
    Codec(#[source] CodecError),

    /// The server sent a response nobody asked for
    #[error("Unexpected response: {0:?}")]
    UnexpectedResponse(PwmResponse),
}

impl From<io::Error> for ClientError {
    fn from(error: io::Error) -> Self {
        match error.kind() {
            io::ErrorKind::TimedOut => Self::ResponseTimeout,
            io::ErrorKind::NotFound => Self::SocketNotFound,
            io::ErrorKind::ConnectionRefused => Self::ConnectionRefused,
            io::ErrorKind::ConnectionReset | io::ErrorKind::BrokenPipe => Self::ConnectionClosed,
            _ => Self::Io(error),
        }
    }
}

impl From<CodecError> for ClientError {
    fn from(error: CodecError) -> Self {
        match error {
            CodecError::IOError { kind, .. } => io::Error::from(kind).into(),
            CodecError::TruncatedFrame { .. } => Self::ConnectionClosed,
            other => Self::Codec(other),
        }
    }
}

impl ClientError {
    /// Check if the error means the connection is gone
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::ConnectionClosed | Self::ConnectionRefused | Self::SocketNotFound
        )
    }
}

/// Client result type
pub type Result<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_mapping() {
        let err: ClientError = io::Error::from(io::ErrorKind::BrokenPipe).into();
        assert!(matches!(err, ClientError::ConnectionClosed));
        assert!(err.is_connection_error());

        let err: ClientError = io::Error::from(io::ErrorKind::NotFound).into();
        assert!(matches!(err, ClientError::SocketNotFound));

        let err: ClientError = io::Error::from(io::ErrorKind::PermissionDenied).into();
        assert!(matches!(err, ClientError::Io(_)));
        assert!(!err.is_connection_error());
    }

    #[test]
    fn test_codec_error_mapping() {
        let err: ClientError = CodecError::from(io::Error::from(io::ErrorKind::ConnectionReset)).into();
        assert!(matches!(err, ClientError::ConnectionClosed));

        let err: ClientError = CodecError::InvalidUtf8.into();
        assert!(matches!(err, ClientError::Codec(CodecError::InvalidUtf8)));
    }
}
