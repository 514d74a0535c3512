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

//! PWM request frame

use byteorder::{ByteOrder, LittleEndian};
use std::fmt;

/// Size in bytes of one request frame on the wire
pub const REQUEST_FRAME_LEN: usize = 12;

/// Largest accepted duty cycle value (inclusive)
pub const DUTY_MAX: i32 = 1023;

const CHANNEL_OFFSET: usize = 0;
const DUTY_OFFSET: usize = 4;
const FREQUENCY_OFFSET: usize = 8;

/// A request to drive one PWM channel.
///
/// Requests are plain values. Decoding never rejects a frame, so a `PwmRequest` may hold
/// out of range values; use [`validate`](crate::validate) before acting on one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PwmRequest {
    channel: i32,
    duty: i32,
    frequency: i32,
}

impl PwmRequest {
    /// Create a new request
    pub const fn new(channel: i32, duty: i32, frequency: i32) -> Self {
        Self {
            channel,
            duty,
            frequency,
        }
    }

    /// Output channel (pin) identifier
    pub const fn channel(&self) -> i32 {
        self.channel
    }

    /// Duty cycle in `0..=DUTY_MAX`
    pub const fn duty(&self) -> i32 {
        self.duty
    }

    /// Frequency in Hz
    pub const fn frequency(&self) -> i32 {
        self.frequency
    }

    /// Shorthand for `validate(self).is_ok()`
    pub fn is_valid(&self) -> bool {
        crate::validate(self).is_ok()
    }

    /// Serialize into the fixed little-endian wire layout
    pub fn to_bytes(&self) -> [u8; REQUEST_FRAME_LEN] {
        let mut frame = [0u8; REQUEST_FRAME_LEN];
        LittleEndian::write_i32(&mut frame[CHANNEL_OFFSET..DUTY_OFFSET], self.channel);
        LittleEndian::write_i32(&mut frame[DUTY_OFFSET..FREQUENCY_OFFSET], self.duty);
        LittleEndian::write_i32(&mut frame[FREQUENCY_OFFSET..], self.frequency);
        frame
    }

    /// Deserialize from the fixed little-endian wire layout
    pub fn from_bytes(frame: &[u8; REQUEST_FRAME_LEN]) -> Self {
        Self {
            channel: LittleEndian::read_i32(&frame[CHANNEL_OFFSET..DUTY_OFFSET]),
            duty: LittleEndian::read_i32(&frame[DUTY_OFFSET..FREQUENCY_OFFSET]),
            frequency: LittleEndian::read_i32(&frame[FREQUENCY_OFFSET..]),
        }
    }
}

impl fmt::Display for PwmRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[Pin: {:2}, Duty: {:4}, Freq: {:4}]",
            self.channel, self.duty, self.frequency
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_layout_is_little_endian() {
        let request = PwmRequest::new(1, 0x0203, 0x0A0B0C0D);
        let bytes = request.to_bytes();

        assert_eq!(&bytes[0..4], &[0x01, 0x00, 0x00, 0x00]);
        assert_eq!(&bytes[4..8], &[0x03, 0x02, 0x00, 0x00]);
        assert_eq!(&bytes[8..12], &[0x0D, 0x0C, 0x0B, 0x0A]);
    }

    #[test]
    fn test_negative_values_survive() {
        let request = PwmRequest::new(-1, i32::MIN, i32::MAX);
        let decoded = PwmRequest::from_bytes(&request.to_bytes());

        assert_eq!(decoded, request);
        assert_eq!(decoded.channel(), -1);
        assert_eq!(decoded.duty(), i32::MIN);
        assert_eq!(decoded.frequency(), i32::MAX);
    }

    #[test]
    fn test_display() {
        let request = PwmRequest::new(12, 512, 1000);
        assert_eq!(request.to_string(), "[Pin: 12, Duty:  512, Freq: 1000]");
    }
}
