//! Cryptographic test vectors from official specifications.
//!
//! This module contains test vectors from:
//! - RFC 8032 Section 7.1 (Ed25519)
//!
//! These vectors ensure the peer identity keys match RFC 8032
//! exactly, so records signed here verify on any other Ed25519 stack.

use disturbdb_crypto::{
    CryptoError, Ed25519PrivateKey, Ed25519PublicKey, Ed25519Signature, PrivateKey, PublicKey,
    Signature,
};

struct Vector {
    secret: &'static str,
    public: &'static str,
    message: &'static str,
    signature: &'static str,
}

// ============================================================================
// RFC 8032 Test Vectors (Ed25519)
// ============================================================================

const RFC8032_VECTORS: &[Vector] = &[
    // TEST 1
    Vector {
        secret: "9d61b19deffd5a60ba844af492ec2cc44449c5697b326919703bac031cae7f60",
        public: "d75a980182b10ab7d54bfed3c964073a0ee172f3daa62325af021a68f707511a",
        message: "",
        signature: "e5564300c360ac729086e2cc806e828a84877f1eb8e5d974d873e065224901555fb8821590a33bacc61e39701cf9b46bd25bf5f0595bbe24655141438e7a100b",
    },
    // TEST 2
    Vector {
        secret: "4ccd089b28ff96da9db6c346ec114e0f5b8a319f35aba624da8cf6ed4fb8a6fb",
        public: "3d4017c3e843895a92b70aa74d1b7ebc9c982ccf2ec4968cc0cd55f12af4660c",
        message: "72",
        signature: "92a009a9f0d4cab8720e820b5f642540a2b27b5416503f8fb3762223ebdb69da085ac1e43e15996e458f3613d0f11d8c387b2eaeb4302aeeb00d291612bb0c00",
    },
    // TEST 3
    Vector {
        secret: "c5aa8df43f9f837bedb7442f31dcb7b166d38535076f094b85ce3a2e0b4458f7",
        public: "fc51cd8e6218a1a38da47ed00230f0580816ed13ba3303ac5deb911548908025",
        message: "af82",
        signature: "6291d657deec24024827e69c3abe01a30ce548a284743a445e3680d7db5ac3ac18ff9b538d16f290ae67f760984dc6594a7c15e9716ed28dc027beceea1ec40a",
    },
];

#[test]
fn test_ed25519_rfc8032_public_keys() {
    for vector in RFC8032_VECTORS {
        let private = Ed25519PrivateKey::from_hex(vector.secret).unwrap();
        assert_eq!(private.public_key().to_hex(), vector.public);
    }
}

#[test]
fn test_ed25519_rfc8032_signatures() {
    for vector in RFC8032_VECTORS {
        let private = Ed25519PrivateKey::from_hex(vector.secret).unwrap();
        let message = hex::decode(vector.message).unwrap();

        let signature = private.sign(&message);
        assert_eq!(signature.to_hex(), vector.signature);
    }
}

#[test]
fn test_ed25519_rfc8032_verification() {
    for vector in RFC8032_VECTORS {
        let public = Ed25519PublicKey::from_hex(vector.public).unwrap();
        let message = hex::decode(vector.message).unwrap();
        let signature = hex::decode(vector.signature).unwrap();

        assert_eq!(public.verify_bytes(&message, &signature), Ok(true));

        let mut flipped = message.clone();
        flipped.push(0x00);
        assert_eq!(public.verify_bytes(&flipped, &signature), Ok(false));
    }
}

#[test]
fn test_ed25519_secret_hex_roundtrip_matches_vector() {
    let vector = &RFC8032_VECTORS[0];
    let private = Ed25519PrivateKey::from_hex(vector.secret).unwrap();
    assert_eq!(private.to_hex().as_str(), vector.secret);
}

#[test]
fn test_ed25519_secret_hex_tolerates_surrounding_whitespace() {
    let vector = &RFC8032_VECTORS[1];
    let padded = format!("  {}\n", vector.secret);
    let private = Ed25519PrivateKey::from_hex(&padded).unwrap();
    assert_eq!(private.public_key().to_hex(), vector.public);
}

#[test]
fn test_ed25519_signature_from_other_scheme_rejected() {
    let vector = &RFC8032_VECTORS[0];
    let public = Ed25519PublicKey::from_hex(vector.public).unwrap();

    // A 65-byte compact secp256k1-style signature must not be accepted
    let foreign = [0x1bu8; 65];
    let err = public.verify_bytes(b"", &foreign).unwrap_err();
    assert!(matches!(
        err,
        CryptoError::InvalidSignatureType {
            scheme: "ed25519",
            expected: 64,
            actual: 65,
        }
    ));

    assert!(Ed25519Signature::from_slice(&foreign).is_err());
}
