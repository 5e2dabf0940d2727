//! Fuzz target for engine response normalization.
//!
//! Run with: cargo +nightly fuzz run fuzz_normalize
//!
//! The first two bytes pick a status code; the rest is the engine body.

#![no_main]

use harbourmaster_core::{Payload, ProxyError, UpstreamResponse};
use hyper::StatusCode;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }
    let code = 100 + u16::from_be_bytes([data[0], data[1]]) % 500;
    let Ok(status) = StatusCode::from_u16(code) else {
        return;
    };
    let body = data[2..].to_vec();
    let empty = body.is_empty();

    match UpstreamResponse::new(status, body).into_payload() {
        Ok(Payload::NoContent) => assert!(empty),
        Ok(Payload::Content(_)) => assert!(!empty && status.as_u16() < 400),
        Err(ProxyError::Upstream { status: got, .. }) => assert_eq!(got, status),
        Err(ProxyError::MalformedResponse { .. }) => assert!(!empty),
        Err(e) => panic!("unexpected error kind: {e}"),
    }
});
