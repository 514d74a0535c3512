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

//! Error types for the PWM service

use crate::sink::SinkError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for operations
pub type Result<T> = std::result::Result<T, ServiceError>;

/// PWM service error types
#[derive(Debug, Error)]
pub enum ServiceError {
    /// I/O error from the underlying socket
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The hardware sink failed
    #[error("Hardware sink error: {0}")]
    Sink(#[from] SinkError),

    /// Binding the control socket failed
    #[error("Failed to bind {path}: {source}")]
    Bind {
        /// Socket path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Setting the control socket permissions failed
    #[error("Failed to set permissions on {path}: {source}")]
    Permissions {
        /// Socket path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Something other than a socket occupies the socket path
    #[error("{0} exists and is not a socket")]
    NotASocket(PathBuf),

    /// Configuration rejected by validation
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Server has already been started
    #[error("Server already running")]
    AlreadyRunning,

    /// Server is not running
    #[error("Server not running")]
    ServerNotRunning,

    /// Server has been shut down and cannot be restarted
    #[error("Server has been shut down")]
    ServerStopped,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ServiceError::NotASocket(PathBuf::from("/tmp/pwm.sock"));
        assert_eq!(err.to_string(), "/tmp/pwm.sock exists and is not a socket");

        let err = ServiceError::InvalidConfig("max_sessions must be greater than 0".to_string());
        assert_eq!(
            err.to_string(),
            "Invalid configuration: max_sessions must be greater than 0"
        );
    }
}
