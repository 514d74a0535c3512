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

//! Request validation

use crate::{DUTY_MAX, PwmRequest};
use std::fmt;

/// The field that made a request unacceptable, with the offending value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    /// Channel identifiers must be non-negative
    Channel(i32),
    /// Duty cycle must be within `0..=DUTY_MAX`
    Duty(i32),
    /// Frequency must be strictly positive
    Frequency(i32),
}

impl std::error::Error for ValidationError {}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::Channel(value) => write!(f, "channel {} is negative", value),
            ValidationError::Duty(value) => {
                write!(f, "duty {} is outside 0..={}", value, DUTY_MAX)
            }
            ValidationError::Frequency(value) => {
                write!(f, "frequency {} is not positive", value)
            }
        }
    }
}

/// Check a decoded request against the domain constraints.
///
/// A request is valid iff `channel >= 0`, `0 <= duty <= DUTY_MAX` and `frequency > 0`.
/// Fields are checked in wire order and the first failure is reported.
pub fn validate(request: &PwmRequest) -> Result<(), ValidationError> {
    if request.channel() < 0 {
        return Err(ValidationError::Channel(request.channel()));
    }
    if !(0..=DUTY_MAX).contains(&request.duty()) {
        return Err(ValidationError::Duty(request.duty()));
    }
    if request.frequency() <= 0 {
        return Err(ValidationError::Frequency(request.frequency()));
    }
    Ok(())
}
