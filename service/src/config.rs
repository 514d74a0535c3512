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

//! Server configuration

use crate::{Result, ServiceError};
use std::path::PathBuf;
use std::time::Duration;

pub use pulsewire_codec::DEFAULT_SOCKET_PATH;

/// Server configuration
///
/// This structure contains all configuration options for the PWM server.
/// Use the builder pattern methods to customize the configuration.
///
/// # Example
///
/// ```
/// use pulsewire_service::ServerConfig;
/// use std::time::Duration;
///
/// let config = ServerConfig::default()
///     .with_max_sessions(16)
///     .with_idle_timeout(Duration::from_secs(30));
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Filesystem path of the Unix control socket
    pub socket_path: PathBuf,

    /// Permission bits applied to the socket file after binding
    pub socket_mode: u32,

    /// Maximum number of concurrent sessions (slot pool capacity)
    ///
    /// Once this many sessions are running the listener stops accepting until
    /// one of them ends.
    pub max_sessions: usize,

    /// Maximum time a session waits for the next request before closing
    pub idle_timeout: Duration,

    /// Timeout for writing a response
    pub write_timeout: Duration,

    /// Timeout for graceful shutdown
    ///
    /// Sessions still running after this long are told to close.
    pub shutdown_timeout: Duration,

    /// Pause after a failed accept before retrying
    pub accept_backoff: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            socket_path: PathBuf::from(DEFAULT_SOCKET_PATH),
            socket_mode: 0o666,
            max_sessions: 100,
            idle_timeout: Duration::from_secs(60),
            write_timeout: Duration::from_secs(10),
            shutdown_timeout: Duration::from_secs(30),
            accept_backoff: Duration::from_millis(100),
        }
    }
}

impl ServerConfig {
    /// Create a new configuration with the given socket path
    ///
    /// All other settings will use their default values.
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: socket_path.into(),
            ..Default::default()
        }
    }

    /// Set the socket permission bits
    pub fn with_socket_mode(mut self, mode: u32) -> Self {
        self.socket_mode = mode;
        self
    }

    /// Set the maximum number of concurrent sessions
    pub fn with_max_sessions(mut self, max: usize) -> Self {
        self.max_sessions = max;
        self
    }

    /// Set the idle timeout duration
    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Set the write timeout duration
    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// Set the shutdown timeout duration
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Set the accept error back-off
    pub fn with_accept_backoff(mut self, backoff: Duration) -> Self {
        self.accept_backoff = backoff;
        self
    }

    /// Per-session settings derived from this configuration
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            idle_timeout: self.idle_timeout,
            write_timeout: self.write_timeout,
        }
    }

    /// Validate the configuration
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<()> {
        if self.socket_path.as_os_str().is_empty() {
            return Err(invalid("socket_path must not be empty"));
        }

        if self.socket_mode > 0o777 {
            return Err(invalid("socket_mode must only contain permission bits"));
        }

        if self.max_sessions == 0 {
            return Err(invalid("max_sessions must be greater than 0"));
        }

        if self.idle_timeout.is_zero() {
            return Err(invalid("idle_timeout must be greater than 0"));
        }

        if self.write_timeout.is_zero() {
            return Err(invalid("write_timeout must be greater than 0"));
        }

        if self.shutdown_timeout.is_zero() {
            return Err(invalid("shutdown_timeout must be greater than 0"));
        }

        Ok(())
    }
}

fn invalid(reason: &str) -> ServiceError {
    ServiceError::InvalidConfig(reason.to_string())
}

/// Settings for a single connection session
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Idle timeout (max time to wait for the next request)
    pub idle_timeout: Duration,
    /// Write timeout (max time for sending a response)
    pub write_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        ServerConfig::default().session_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.socket_path, PathBuf::from("/tmp/pwm_service.sock"));
        assert_eq!(config.socket_mode, 0o666);
        assert_eq!(config.max_sessions, 100);
        assert_eq!(config.idle_timeout, Duration::from_secs(60));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_pattern() {
        let config = ServerConfig::new("/run/pwm.sock")
            .with_max_sessions(2)
            .with_idle_timeout(Duration::from_millis(250))
            .with_socket_mode(0o660);

        assert_eq!(config.socket_path, PathBuf::from("/run/pwm.sock"));
        assert_eq!(config.max_sessions, 2);
        assert_eq!(config.socket_mode, 0o660);

        let session = config.session_config();
        assert_eq!(session.idle_timeout, Duration::from_millis(250));
        assert_eq!(session.write_timeout, config.write_timeout);
    }

    #[test]
    fn test_validation() {
        let mut config = ServerConfig::default();
        assert!(config.validate().is_ok());

        config.max_sessions = 0;
        assert!(matches!(
            config.validate(),
            Err(ServiceError::InvalidConfig(_))
        ));

        config.max_sessions = 1;
        config.idle_timeout = Duration::ZERO;
        assert!(config.validate().is_err());

        config.idle_timeout = Duration::from_secs(1);
        config.socket_mode = 0o4777;
        assert!(config.validate().is_err());

        config.socket_mode = 0o600;
        config.socket_path = PathBuf::new();
        assert!(config.validate().is_err());
    }
}
