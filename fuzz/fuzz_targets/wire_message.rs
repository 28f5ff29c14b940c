//! Fuzz test for wire message decoding
//!
//! Tests that arbitrary frame bodies never panic the decoder and that
//! structured messages survive encoding.

#![no_main]

use arbitrary::Arbitrary;
use disturbdb_core::{NONCE_SIZE, WireMessage};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
enum Input {
    Raw(Vec<u8>),
    Message { nonce: u64, data: Vec<u8> },
}

fuzz_target!(|input: Input| {
    match input {
        Input::Raw(bytes) => match WireMessage::decode(&bytes) {
            Ok(message) => {
                assert_eq!(message.data.len(), bytes.len() - NONCE_SIZE);
                assert_eq!(message.to_bytes(), bytes);
            }
            Err(_) => assert!(bytes.len() < NONCE_SIZE),
        },
        Input::Message { nonce, data } => {
            let message = WireMessage::new(nonce, data);
            let decoded = WireMessage::decode(&message.to_bytes()).unwrap();
            assert_eq!(decoded, message);
        }
    }
});
