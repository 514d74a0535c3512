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

//! Property and stream tests for the PWM codecs

use bytes::BytesMut;
use futures::{SinkExt, StreamExt};
use proptest::prelude::*;
use pulsewire_codec::{
    DUTY_MAX, PwmRequest, PwmResponse, RequestCodec, ResponseCodec, ValidationError, validate,
};
use tokio::io::{AsyncWriteExt, duplex};
use tokio_util::codec::{Decoder, Encoder, FramedRead, FramedWrite};

fn valid_request() -> impl Strategy<Value = PwmRequest> {
    (0..=i32::MAX, 0..=DUTY_MAX, 1..=i32::MAX)
        .prop_map(|(channel, duty, frequency)| PwmRequest::new(channel, duty, frequency))
}

fn invalid_request() -> impl Strategy<Value = PwmRequest> {
    prop_oneof![
        (i32::MIN..0, any::<i32>(), any::<i32>()),
        (any::<i32>(), i32::MIN..0, any::<i32>()),
        (any::<i32>(), (DUTY_MAX + 1)..=i32::MAX, any::<i32>()),
        (any::<i32>(), any::<i32>(), i32::MIN..=0),
    ]
    .prop_map(|(channel, duty, frequency)| PwmRequest::new(channel, duty, frequency))
}

proptest! {
    #[test]
    fn valid_requests_pass_validation(request in valid_request()) {
        prop_assert_eq!(validate(&request), Ok(()));
        prop_assert!(request.is_valid());
    }

    #[test]
    fn invalid_requests_fail_validation(request in invalid_request()) {
        prop_assert!(validate(&request).is_err());
        prop_assert!(!request.is_valid());
    }

    #[test]
    fn frames_decode_to_the_encoded_request(
        channel in any::<i32>(),
        duty in any::<i32>(),
        frequency in any::<i32>(),
    ) {
        let request = PwmRequest::new(channel, duty, frequency);
        let mut wire = BytesMut::new();
        ResponseCodec::new().encode(request, &mut wire).unwrap();

        prop_assert_eq!(wire.len(), 12);
        prop_assert_eq!(RequestCodec::new().decode(&mut wire).unwrap(), Some(request));
        prop_assert!(wire.is_empty());
    }

    #[test]
    fn frames_survive_arbitrary_splits(split in 0usize..=12) {
        let request = PwmRequest::new(7, 300, 2000);
        let bytes = request.to_bytes();
        let mut codec = RequestCodec::new();

        let mut src = BytesMut::from(&bytes[..split]);
        let first = codec.decode(&mut src).unwrap();
        if split < 12 {
            prop_assert_eq!(first, None);
            src.extend_from_slice(&bytes[split..]);
            prop_assert_eq!(codec.decode(&mut src).unwrap(), Some(request));
        } else {
            prop_assert_eq!(first, Some(request));
        }
    }
}

#[test]
fn test_validation_reports_field() {
    assert_eq!(
        validate(&PwmRequest::new(0, 2048, 100)),
        Err(ValidationError::Duty(2048))
    );
    assert_eq!(
        validate(&PwmRequest::new(0, 10, -5)),
        Err(ValidationError::Frequency(-5))
    );
}

#[tokio::test]
async fn test_framed_request_stream_reassembles_writes() {
    let (mut client, server) = duplex(64);
    let mut frames = FramedRead::new(server, RequestCodec::new());

    let first = PwmRequest::new(1, 512, 1000).to_bytes();
    let second = PwmRequest::new(2, 1023, 50).to_bytes();

    client.write_all(&first[..5]).await.unwrap();
    client.write_all(&first[5..]).await.unwrap();
    client.write_all(&second).await.unwrap();
    drop(client);

    assert_eq!(
        frames.next().await.unwrap().unwrap(),
        PwmRequest::new(1, 512, 1000)
    );
    assert_eq!(
        frames.next().await.unwrap().unwrap(),
        PwmRequest::new(2, 1023, 50)
    );
    assert!(frames.next().await.is_none());
}

#[tokio::test]
async fn test_framed_request_stream_truncated() {
    let (mut client, server) = duplex(64);
    let mut frames = FramedRead::new(server, RequestCodec::new());

    client.write_all(&[0u8; 8]).await.unwrap();
    drop(client);

    let err = frames.next().await.unwrap().unwrap_err();
    assert!(err.is_truncated());
}

#[tokio::test]
async fn test_framed_response_roundtrip() {
    let (client, server) = duplex(256);
    let mut writer = FramedWrite::new(server, RequestCodec::new());
    let mut reader = FramedRead::new(client, ResponseCodec::new());

    writer.send(PwmResponse::Success).await.unwrap();
    writer.send(PwmResponse::Invalid).await.unwrap();
    drop(writer);

    assert_eq!(reader.next().await.unwrap().unwrap(), PwmResponse::Success);
    assert_eq!(reader.next().await.unwrap().unwrap(), PwmResponse::Invalid);
    assert!(reader.next().await.is_none());
}
