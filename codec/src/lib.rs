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

//! # Pulsewire PWM Protocol Codec
//!
//! This crate implements the wire protocol spoken over the Pulsewire control socket. It is
//! designed to be driven by `tokio_util::codec::Framed` on either end of a Unix stream.
//!
//! ## Overview
//!
//! A client asks the service to drive one PWM channel by sending a fixed-size binary
//! request. The service answers every request with a single line of ASCII text.
//!
//! - **Requests** are exactly [`REQUEST_FRAME_LEN`] bytes: three little-endian `i32`
//!   fields (`channel`, `duty`, `frequency`) with no length prefix.
//! - **Responses** are newline terminated text lines, either [`SUCCESS_TEXT`] or
//!   [`INVALID_TEXT`].
//!
//! ## Core Components
//!
//! ### [`PwmRequest`]
//!
//! The decoded request triple. Construction never fails; whether the values are
//! acceptable is decided separately by [`validate`].
//!
//! ### [`RequestCodec`]
//!
//! The server side codec. Decodes [`PwmRequest`] frames, reassembling frames that
//! arrive split across several reads, and encodes [`PwmResponse`] lines.
//!
//! ### [`ResponseCodec`]
//!
//! The client side mirror. Encodes [`PwmRequest`] frames and decodes [`PwmResponse`]
//! lines.
//!
//! ## Usage Example
//!
//! ```rust
//! use bytes::BytesMut;
//! use pulsewire_codec::{PwmRequest, PwmResponse, RequestCodec, ResponseCodec, validate};
//! use tokio_util::codec::{Decoder, Encoder};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut client = ResponseCodec::new();
//! let mut server = RequestCodec::new();
//!
//! let mut wire = BytesMut::new();
//! client.encode(PwmRequest::new(1, 512, 1000), &mut wire)?;
//!
//! let request = server.decode(&mut wire)?.expect("one full frame");
//! let response = match validate(&request) {
//!     Ok(()) => PwmResponse::Success,
//!     Err(_) => PwmResponse::Invalid,
//! };
//! server.encode(response, &mut wire)?;
//!
//! assert_eq!(client.decode(&mut wire)?, Some(PwmResponse::Success));
//! # Ok(())
//! # }
//! ```
//!
//! ## Byte Order
//!
//! Request fields are always little-endian regardless of host architecture. This keeps
//! the layout identical to the in-memory struct the existing ARM and x86 clients send,
//! while making the format explicit instead of platform dependent.

mod codec;
mod request;
mod response;
mod result;
mod validate;

pub use codec::{RequestCodec, ResponseCodec};
pub use request::{DUTY_MAX, PwmRequest, REQUEST_FRAME_LEN};
pub use response::{INVALID_TEXT, MAX_RESPONSE_LEN, PwmResponse, SUCCESS_TEXT};
pub use result::{CodecError, CodecResult};
pub use validate::{ValidationError, validate};

/// Well-known location of the server control socket
pub const DEFAULT_SOCKET_PATH: &str = "/tmp/pwm_service.sock";
