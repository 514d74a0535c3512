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

//! PWM response lines

use std::fmt;

/// Acknowledgement sent after a request has been applied
pub const SUCCESS_TEXT: &str = "PWM set successfully\n";

/// Rejection sent when a request fails validation
pub const INVALID_TEXT: &str = "Invalid PWM parameters\n";

/// Longest response line a client will buffer before giving up
pub const MAX_RESPONSE_LEN: usize = 256;

/// Server response to a single request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PwmResponse {
    /// The request was valid and has been handed to the hardware
    Success,
    /// The request failed validation; the server closes the connection after this
    Invalid,
}

impl PwmResponse {
    /// The exact text line sent on the wire, including the trailing newline
    pub const fn as_str(&self) -> &'static str {
        match self {
            PwmResponse::Success => SUCCESS_TEXT,
            PwmResponse::Invalid => INVALID_TEXT,
        }
    }

    /// Check if this is a success acknowledgement
    pub const fn is_success(&self) -> bool {
        matches!(self, PwmResponse::Success)
    }

    /// Parse a received line. The trailing newline is optional.
    pub fn from_line(line: &str) -> Option<Self> {
        let trimmed = line.strip_suffix('\n').unwrap_or(line);
        if trimmed == SUCCESS_TEXT.trim_end() {
            Some(PwmResponse::Success)
        } else if trimmed == INVALID_TEXT.trim_end() {
            Some(PwmResponse::Invalid)
        } else {
            None
        }
    }
}

impl fmt::Display for PwmResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str().trim_end())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_line() {
        assert_eq!(
            PwmResponse::from_line("PWM set successfully\n"),
            Some(PwmResponse::Success)
        );
        assert_eq!(
            PwmResponse::from_line("Invalid PWM parameters"),
            Some(PwmResponse::Invalid)
        );
        assert_eq!(PwmResponse::from_line("PWM set\n"), None);
    }

    #[test]
    fn test_text_is_newline_terminated() {
        assert!(PwmResponse::Success.as_str().ends_with('\n'));
        assert!(PwmResponse::Invalid.as_str().ends_with('\n'));
        assert_eq!(PwmResponse::Success.to_string(), "PWM set successfully");
    }
}
