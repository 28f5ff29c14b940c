//! Fuzz test for peer record decoding
//!
//! Peer records arrive from untrusted peers during the handshake. Decoding
//! must never panic, and anything that decodes must re-encode to the same
//! record bytes.

#![no_main]

use disturbdb_core::PeerId;
use disturbdb_crypto::Ed25519PublicKey;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(id) = PeerId::<Ed25519PublicKey>::decode(data) else {
        return;
    };

    let len = PeerId::<Ed25519PublicKey>::encoded_len();
    let encoded = id.to_bytes();
    assert_eq!(encoded.len(), len);

    // IPv4-mapped hosts re-encode identically; other hosts are stored as-is
    let again = PeerId::<Ed25519PublicKey>::decode(&encoded).unwrap();
    assert_eq!(again, id);

    // Rendering must not panic for any host
    let _ = id.address();
    let _ = id.registry_key();
    let _ = id.to_json();
});
