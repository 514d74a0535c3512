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

//! Hardware sink boundary
//!
//! The server hands every validated request to a [`HardwareSink`]. The call is
//! synchronous and is expected to return quickly; a real driver that needs to
//! block for long should hand the work to its own thread.

use pulsewire_codec::PwmRequest;
use std::fmt;
use std::sync::{Mutex, PoisonError};
use thiserror::Error;

/// Base clock of the PWM peripheral in Hz
pub const PWM_BASE_HZ: u64 = 19_200_000;

/// Number of steps in one PWM period
pub const PWM_RANGE: u32 = 1024;

/// Smallest clock divisor the peripheral accepts
pub const MIN_CLOCK_DIVISOR: u32 = 2;

/// Largest clock divisor the peripheral accepts
pub const MAX_CLOCK_DIVISOR: u32 = 4095;

/// Errors reported by a hardware sink
#[derive(Debug, Error)]
pub enum SinkError {
    /// The hardware could not be reached
    #[error("hardware unavailable: {0}")]
    Unavailable(String),

    /// The hardware refused the request for a channel
    #[error("channel {channel} rejected: {reason}")]
    Rejected {
        /// Channel the request targeted
        channel: i32,
        /// Reason given by the driver
        reason: String,
    },

    /// I/O error talking to the hardware
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Destination for validated PWM requests
pub trait HardwareSink: Send + Sync + 'static {
    /// Prepare the hardware; called once before the server accepts clients
    fn initialize(&self) -> Result<(), SinkError> {
        Ok(())
    }

    /// Configure and drive one channel
    fn drive(&self, request: &PwmRequest) -> Result<(), SinkError>;
}

/// Register-level settings for one request
///
/// The peripheral always runs in mark-space mode: a fixed period of `range`
/// steps with the output high for the first `value` of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PwmSettings {
    /// Output channel (pin)
    pub channel: i32,
    /// Steps per period
    pub range: u32,
    /// Clock divisor applied to [`PWM_BASE_HZ`]
    pub clock_divisor: u32,
    /// High steps per period
    pub value: u32,
}

impl PwmSettings {
    /// Derive peripheral settings from a validated request
    ///
    /// The divisor is `PWM_BASE_HZ / (frequency * PWM_RANGE)` clamped to
    /// [`MIN_CLOCK_DIVISOR`]`..=`[`MAX_CLOCK_DIVISOR`], so very high or very low
    /// frequencies saturate at what the peripheral can produce.
    pub fn from_request(request: &PwmRequest) -> Self {
        let frequency = u64::from(request.frequency().max(1).unsigned_abs());
        let divisor = PWM_BASE_HZ / (frequency * u64::from(PWM_RANGE));
        let clock_divisor = divisor.clamp(
            u64::from(MIN_CLOCK_DIVISOR),
            u64::from(MAX_CLOCK_DIVISOR),
        ) as u32;

        Self {
            channel: request.channel(),
            range: PWM_RANGE,
            clock_divisor,
            value: request.duty().clamp(0, PWM_RANGE as i32) as u32,
        }
    }

    /// Output frequency the peripheral actually produces with these settings
    pub fn effective_frequency(&self) -> f64 {
        PWM_BASE_HZ as f64 / (f64::from(self.clock_divisor) * f64::from(self.range))
    }
}

impl fmt::Display for PwmSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "channel {} range={} divisor={} value={}",
            self.channel, self.range, self.clock_divisor, self.value
        )
    }
}

/// Sink that logs the settings it would apply
///
/// Used by the daemon on hosts without PWM hardware.
#[derive(Debug, Default)]
pub struct LoggingSink;

impl LoggingSink {
    /// Create a logging sink
    pub fn new() -> Self {
        Self
    }
}

impl HardwareSink for LoggingSink {
    fn initialize(&self) -> Result<(), SinkError> {
        tracing::info!(
            base_hz = PWM_BASE_HZ,
            range = PWM_RANGE,
            "Logging sink initialized"
        );
        Ok(())
    }

    fn drive(&self, request: &PwmRequest) -> Result<(), SinkError> {
        let settings = PwmSettings::from_request(request);
        tracing::info!(
            channel = settings.channel,
            duty = request.duty(),
            frequency = request.frequency(),
            clock_divisor = settings.clock_divisor,
            effective_hz = settings.effective_frequency(),
            "PWM applied"
        );
        Ok(())
    }
}

/// In-memory sink that records every request it is given
///
/// Can be told to fail initialization or to fail requests for one channel.
#[derive(Debug, Default)]
pub struct RecordingSink {
    calls: Mutex<Vec<PwmRequest>>,
    failing_channel: Option<i32>,
    fail_initialize: bool,
}

impl RecordingSink {
    /// Create a sink that accepts everything
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every request for `channel`
    pub fn with_failing_channel(mut self, channel: i32) -> Self {
        self.failing_channel = Some(channel);
        self
    }

    /// Fail [`HardwareSink::initialize`]
    pub fn with_failing_initialize(mut self) -> Self {
        self.fail_initialize = true;
        self
    }

    /// Requests applied so far, in call order
    pub fn calls(&self) -> Vec<PwmRequest> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of requests applied so far
    pub fn call_count(&self) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl HardwareSink for RecordingSink {
    fn initialize(&self) -> Result<(), SinkError> {
        if self.fail_initialize {
            return Err(SinkError::Unavailable("recording sink set to fail".to_string()));
        }
        Ok(())
    }

    fn drive(&self, request: &PwmRequest) -> Result<(), SinkError> {
        if self.failing_channel == Some(request.channel()) {
            return Err(SinkError::Rejected {
                channel: request.channel(),
                reason: "channel set to fail".to_string(),
            });
        }
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(*request);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_divisor() {
        let settings = PwmSettings::from_request(&PwmRequest::new(18, 512, 50));
        assert_eq!(settings.range, 1024);
        assert_eq!(settings.clock_divisor, 375);
        assert_eq!(settings.value, 512);
        assert!((settings.effective_frequency() - 50.0).abs() < 0.01);
    }

    #[test]
    fn test_settings_divisor_clamped() {
        let fast = PwmSettings::from_request(&PwmRequest::new(0, 1, 1_000_000));
        assert_eq!(fast.clock_divisor, MIN_CLOCK_DIVISOR);

        let slow = PwmSettings::from_request(&PwmRequest::new(0, 1, 1));
        assert_eq!(slow.clock_divisor, MAX_CLOCK_DIVISOR);
    }

    #[test]
    fn test_recording_sink() {
        let sink = RecordingSink::new().with_failing_channel(3);
        assert!(sink.initialize().is_ok());
        assert!(sink.drive(&PwmRequest::new(1, 100, 1000)).is_ok());
        assert!(matches!(
            sink.drive(&PwmRequest::new(3, 100, 1000)),
            Err(SinkError::Rejected { channel: 3, .. })
        ));
        assert_eq!(sink.calls(), vec![PwmRequest::new(1, 100, 1000)]);
    }

    #[test]
    fn test_recording_sink_init_failure() {
        let sink = RecordingSink::new().with_failing_initialize();
        assert!(matches!(sink.initialize(), Err(SinkError::Unavailable(_))));
    }

    #[test]
    fn test_logging_sink_accepts() {
        let sink = LoggingSink::new();
        assert!(sink.initialize().is_ok());
        assert!(sink.drive(&PwmRequest::new(18, 1023, 3000)).is_ok());
    }
}
