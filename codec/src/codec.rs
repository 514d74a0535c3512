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

//! Framing codecs for both ends of the control socket

use crate::{
    CodecError, MAX_RESPONSE_LEN, PwmRequest, PwmResponse, REQUEST_FRAME_LEN,
};
use bytes::{BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::trace;

/// Server side codec: decodes request frames, encodes response lines.
///
/// Requests carry no length prefix, so the decoder waits until a full
/// [`REQUEST_FRAME_LEN`] bytes are buffered. Frames split over several reads are
/// reassembled; several frames arriving in one read are yielded one at a time.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestCodec {
    _private: (),
}

impl RequestCodec {
    /// Create a new request codec
    pub fn new() -> Self {
        Self::default()
    }
}

impl Decoder for RequestCodec {
    type Item = PwmRequest;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<PwmRequest>, Self::Error> {
        if src.len() < REQUEST_FRAME_LEN {
            src.reserve(REQUEST_FRAME_LEN - src.len());
            return Ok(None);
        }

        let frame = src.split_to(REQUEST_FRAME_LEN);
        let mut raw = [0u8; REQUEST_FRAME_LEN];
        raw.copy_from_slice(&frame);
        let request = PwmRequest::from_bytes(&raw);
        trace!(request = %request, "Decoded request frame");
        Ok(Some(request))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<PwmRequest>, Self::Error> {
        match self.decode(src)? {
            Some(request) => Ok(Some(request)),
            None if src.is_empty() => Ok(None),
            None => {
                let received = src.len();
                src.clear();
                Err(CodecError::TruncatedFrame { received })
            }
        }
    }
}

impl Encoder<PwmResponse> for RequestCodec {
    type Error = CodecError;

    fn encode(&mut self, item: PwmResponse, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let text = item.as_str();
        dst.reserve(text.len());
        dst.put_slice(text.as_bytes());
        Ok(())
    }
}

/// Client side codec: encodes request frames, decodes response lines.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseCodec {
    /// Bytes of the current line already scanned for a newline
    scanned: usize,
}

impl ResponseCodec {
    /// Create a new response codec
    pub fn new() -> Self {
        Self::default()
    }
}

impl Decoder for ResponseCodec {
    type Item = PwmResponse;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<PwmResponse>, Self::Error> {
        let newline = src[self.scanned..]
            .iter()
            .position(|byte| *byte == b'\n')
            .map(|offset| self.scanned + offset);

        let Some(end) = newline else {
            if src.len() > MAX_RESPONSE_LEN {
                return Err(CodecError::ResponseTooLong {
                    length: src.len(),
                    limit: MAX_RESPONSE_LEN,
                });
            }
            self.scanned = src.len();
            return Ok(None);
        };

        self.scanned = 0;
        let line = src.split_to(end + 1);
        let text = std::str::from_utf8(&line).map_err(|_| CodecError::InvalidUtf8)?;
        PwmResponse::from_line(text)
            .map(Some)
            .ok_or_else(|| CodecError::UnknownResponse(text.trim_end().to_string()))
    }
}

impl Encoder<PwmRequest> for ResponseCodec {
    type Error = CodecError;

    fn encode(&mut self, item: PwmRequest, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.reserve(REQUEST_FRAME_LEN);
        dst.put_slice(&item.to_bytes());
        Ok(())
    }
}
