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

//! Core types for the PWM service

use std::fmt;
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// Unique identifier for a connection (monotonically increasing, never reused)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Create a new connection ID
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the underlying u64 value
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Index of a slot within a [`SlotPool`](crate::SlotPool)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId(usize);

impl SlotId {
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    /// Position of the slot in the pool
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "slot-{}", self.0)
    }
}

/// Session state (stored as atomic u8 for lock-free inspection)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SessionState {
    /// Waiting for the next request frame, bounded by the idle timeout
    AwaitingMessage = 0,
    /// Checking a decoded request
    Validating = 1,
    /// Handing a valid request to the hardware sink
    Dispatching = 2,
    /// Writing the acknowledgement
    Responding = 3,
    /// Session has ended
    Closed = 4,
}

impl SessionState {
    /// Convert from u8 (for atomic operations)
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::AwaitingMessage,
            1 => Self::Validating,
            2 => Self::Dispatching,
            3 => Self::Responding,
            _ => Self::Closed,
        }
    }

    /// Convert to u8 (for atomic operations)
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Check if the session has ended
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Closed)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AwaitingMessage => write!(f, "awaiting-message"),
            Self::Validating => write!(f, "validating"),
            Self::Dispatching => write!(f, "dispatching"),
            Self::Responding => write!(f, "responding"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

/// Why a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CloseReason {
    /// No request arrived within the idle timeout
    IdleTimeout,
    /// The client closed its end of the stream
    PeerClosed,
    /// Reading from the stream failed
    ReadError,
    /// A request failed validation and the error text was sent
    Rejected,
    /// The hardware sink refused a valid request
    SinkFailure,
    /// Writing a response failed or timed out
    WriteError,
    /// The server is shutting down
    Shutdown,
}

impl CloseReason {
    /// Check if the session ended because of a fault rather than normal flow
    pub fn is_error(self) -> bool {
        matches!(self, Self::ReadError | Self::SinkFailure | Self::WriteError)
    }

    /// Stable label used for logs and metrics
    pub fn as_str(self) -> &'static str {
        match self {
            Self::IdleTimeout => "idle_timeout",
            Self::PeerClosed => "peer_closed",
            Self::ReadError => "read_error",
            Self::Rejected => "rejected",
            Self::SinkFailure => "sink_failure",
            Self::WriteError => "write_error",
            Self::Shutdown => "shutdown",
        }
    }
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Session information snapshot (for non-blocking queries)
#[derive(Debug, Clone)]
pub struct SessionInfo {
    /// Connection ID
    pub id: ConnectionId,
    /// Slot the session is bound to
    pub slot: SlotId,
    /// Current state
    pub state: SessionState,
    /// When the session started
    pub created_at: Instant,
}

impl SessionInfo {
    /// Get the session duration
    pub fn duration(&self) -> Duration {
        self.created_at.elapsed()
    }
}

/// Server snapshot for non-blocking debug information
#[derive(Debug, Clone)]
pub struct ServerSnapshot {
    /// Number of sessions currently holding a slot
    pub active_sessions: usize,
    /// Slot pool capacity
    pub capacity: usize,
    /// Total sessions since server start
    pub total_sessions: u64,
    /// Control socket path
    pub socket_path: PathBuf,
    /// Server uptime
    pub uptime: Duration,
    /// Server start time
    pub started_at: Instant,
}

impl fmt::Display for ServerSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PwmServer {{ active: {}/{}, total: {}, socket: {}, uptime: {:?} }}",
            self.active_sessions,
            self.capacity,
            self.total_sessions,
            self.socket_path.display(),
            self.uptime
        )
    }
}
