//! Fuzz test for secret key loading
//!
//! Secret keys come from config files and the environment. Loading must
//! reject anything that is not 32 bytes of hex without panicking.

#![no_main]

use disturbdb_crypto::{Ed25519PrivateKey, Ed25519PublicKey, PrivateKey, PublicKey};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    if let Ok(key) = Ed25519PrivateKey::from_hex(text) {
        // A loaded key exports the same 32 bytes it was loaded from
        let exported = key.to_hex();
        assert_eq!(exported.len(), 64);
        let reloaded = Ed25519PrivateKey::from_hex(&exported).unwrap();
        assert_eq!(reloaded.public_key(), key.public_key());
    }

    let _ = Ed25519PublicKey::from_hex(text);
});
