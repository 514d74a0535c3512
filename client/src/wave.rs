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

//! Sine wave duty generator

use pulsewire_codec::DUTY_MAX;
use std::f64::consts::TAU;
use std::time::Duration;

/// Duty cycle that follows a sine wave between two bounds
///
/// `min` and `max` are clamped into `0..=DUTY_MAX` and swapped when given in
/// the wrong order, so every duty the wave produces is valid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SineWave {
    min: i32,
    max: i32,
    period: Duration,
}

impl SineWave {
    /// Create a wave oscillating between `min` and `max` once per `period`
    pub fn new(min: i32, max: i32, period: Duration) -> Self {
        let a = min.clamp(0, DUTY_MAX);
        let b = max.clamp(0, DUTY_MAX);
        Self {
            min: a.min(b),
            max: a.max(b),
            period,
        }
    }

    /// Create a wave whose period is given in seconds
    ///
    /// Returns `None` when `period_secs` is negative, not finite or too large
    /// for a [`Duration`].
    pub fn from_secs(min: i32, max: i32, period_secs: f64) -> Option<Self> {
        Duration::try_from_secs_f64(period_secs)
            .ok()
            .map(|period| Self::new(min, max, period))
    }

    /// Lower duty bound
    pub fn min(&self) -> i32 {
        self.min
    }

    /// Upper duty bound
    pub fn max(&self) -> i32 {
        self.max
    }

    /// Length of one full cycle
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Duty at `elapsed` time into the wave
    ///
    /// A zero period yields a constant `min`.
    pub fn duty_at(&self, elapsed: Duration) -> i32 {
        if self.period.is_zero() {
            return self.min;
        }
        let phase = TAU * elapsed.as_secs_f64() / self.period.as_secs_f64();
        let normalized = (phase.sin() + 1.0) / 2.0;
        let duty = self.min + (f64::from(self.max - self.min) * normalized) as i32;
        duty.clamp(self.min, self.max)
    }
}
