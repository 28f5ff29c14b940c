//! Symmetric identity handshake.
//!
//! Both ends run the same exchange, so there is no initiator/responder split:
//!
//! ```text
//! A                                              B
//! │── HELLO  record_A || challenge_A ───────────▶│
//! │◀──────────── HELLO  record_B || challenge_B ─│
//! │── PROOF  sign_A(D || challenge_B || rec_A) ─▶│
//! │◀─ PROOF  sign_B(D || challenge_A || rec_B) ──│
//! ```
//!
//! `D` is [`HANDSHAKE_DOMAIN`]. Each side proves possession of the key in the
//! record it sent by signing the challenge chosen by the other side, which
//! binds the proof to this connection.
//!
//! Self-connections and records with a loopback or unspecified host are
//! refused before any proof is sent.

use crate::message::{read_frame, write_frame};
use crate::node::error::{NodeError, Result};
use crate::node::identity::Identity;
use crate::peer::PeerId;
use disturbdb_crypto::random::random_32;
use disturbdb_crypto::{PrivateKey, PublicKey, Signature};
use tokio::io::{AsyncRead, AsyncWrite};

/// Domain separator prefixed to every signed transcript
pub const HANDSHAKE_DOMAIN: &[u8] = b"disturbdb-handshake-v1";

/// Challenge size in bytes
pub const CHALLENGE_SIZE: usize = 32;

fn transcript(challenge: &[u8], record: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(HANDSHAKE_DOMAIN.len() + challenge.len() + record.len());
    out.extend_from_slice(HANDSHAKE_DOMAIN);
    out.extend_from_slice(challenge);
    out.extend_from_slice(record);
    out
}

/// Run the handshake over an established stream.
///
/// Returns the verified identity of the remote peer. The caller bounds the
/// exchange with a timeout.
///
/// # Errors
///
/// Returns [`NodeError::Handshake`] on a malformed exchange, a
/// self-connection or a bad proof, [`NodeError::UnroutablePeer`] if the peer
/// advertises a non-identifying host, and I/O errors from the stream.
pub async fn perform<K, R, W>(
    reader: &mut R,
    writer: &mut W,
    identity: &Identity<K>,
    own_id: &PeerId<K::PublicKey>,
) -> Result<PeerId<K::PublicKey>>
where
    K: PrivateKey,
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let record_len = PeerId::<K::PublicKey>::encoded_len();
    let hello_len = record_len + CHALLENGE_SIZE;
    let proof_len = <<K::PublicKey as PublicKey>::Signature as Signature>::SIZE;

    let challenge = random_32()?;
    let own_record = own_id.to_bytes();

    let mut hello = Vec::with_capacity(hello_len);
    hello.extend_from_slice(&own_record);
    hello.extend_from_slice(&challenge);
    write_frame(writer, &hello).await?;

    let peer_hello = read_frame(reader, hello_len)
        .await?
        .ok_or(NodeError::handshake("connection closed before hello"))?;
    if peer_hello.len() != hello_len {
        return Err(NodeError::handshake("malformed hello"));
    }

    let (peer_record, peer_challenge) = peer_hello.split_at(record_len);
    let peer_id = PeerId::<K::PublicKey>::decode(peer_record)?;

    if peer_id.public_key() == identity.public_key() {
        return Err(NodeError::handshake("refusing connection to self"));
    }
    if !peer_id.is_routable() {
        return Err(NodeError::UnroutablePeer(peer_id.socket_addr().to_string()));
    }

    let proof = identity.sign(&transcript(peer_challenge, &own_record));
    write_frame(writer, proof.as_bytes()).await?;

    let peer_proof = read_frame(reader, proof_len)
        .await?
        .ok_or(NodeError::handshake("connection closed before proof"))?;

    let verified = peer_id
        .public_key()
        .verify_bytes(&transcript(&challenge, peer_record), &peer_proof)?;
    if !verified {
        tracing::debug!(peer = %peer_id, "rejected identity proof");
        return Err(NodeError::handshake("invalid identity proof"));
    }

    tracing::debug!(peer = %peer_id, "handshake verified");
    Ok(peer_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::FRAME_HEADER_SIZE;
    use crate::node::identity::NodeKey;
    use tokio::io::{AsyncReadExt, AsyncWriteExt, duplex, split};

    fn identity() -> Identity<NodeKey> {
        Identity::generate().unwrap()
    }

    #[tokio::test]
    async fn test_handshake_exchanges_identities() {
        let (a, b) = duplex(4096);
        let (mut ar, mut aw) = split(a);
        let (mut br, mut bw) = split(b);

        let ida = identity();
        let idb = identity();
        let reca = ida.peer_id("10.0.0.1:3000".parse().unwrap());
        let recb = idb.peer_id("10.0.0.2:3000".parse().unwrap());

        let (ra, rb) = tokio::join!(
            perform(&mut ar, &mut aw, &ida, &reca),
            perform(&mut br, &mut bw, &idb, &recb),
        );

        assert_eq!(ra.unwrap(), recb);
        assert_eq!(rb.unwrap(), reca);
    }

    #[tokio::test]
    async fn test_handshake_rejects_self_connection() {
        let (a, b) = duplex(4096);
        let (mut ar, mut aw) = split(a);
        let (mut br, mut bw) = split(b);

        let id = identity();
        let rec = id.peer_id("10.0.0.1:3000".parse().unwrap());

        let (ra, rb) = tokio::join!(
            perform(&mut ar, &mut aw, &id, &rec),
            perform(&mut br, &mut bw, &id, &rec),
        );

        assert!(matches!(ra, Err(NodeError::Handshake(_))));
        assert!(matches!(rb, Err(NodeError::Handshake(_))));
    }

    #[tokio::test]
    async fn test_handshake_rejects_unroutable_peer() {
        let (a, b) = duplex(4096);
        let (mut ar, mut aw) = split(a);
        let (mut br, mut bw) = split(b);

        let ida = identity();
        let idb = identity();
        let reca = ida.peer_id("10.0.0.1:3000".parse().unwrap());
        let recb = idb.peer_id("127.0.0.1:3000".parse().unwrap());

        // A refuses before sending its proof and hangs up
        let handshake_a = async move {
            let result = perform(&mut ar, &mut aw, &ida, &reca).await;
            drop((ar, aw));
            result
        };
        let handshake_b = perform(&mut br, &mut bw, &idb, &recb);
        let (ra, rb) = tokio::join!(handshake_a, handshake_b);

        assert!(matches!(ra, Err(NodeError::UnroutablePeer(_))));
        assert!(rb.is_err());
    }

    #[tokio::test]
    async fn test_handshake_rejects_forged_proof() {
        let (a, mut b) = duplex(4096);
        let (mut ar, mut aw) = split(a);

        let ida = identity();
        let reca = ida.peer_id("10.0.0.1:3000".parse().unwrap());

        // Claim another node's identity without holding its key
        let victim = identity();
        let forged = victim.peer_id("10.0.0.2:3000".parse().unwrap());

        let attacker = async {
            let mut hello = forged.to_bytes();
            hello.extend_from_slice(&[7u8; CHALLENGE_SIZE]);
            write_frame(&mut b, &hello).await.unwrap();

            let theirs = read_frame(&mut b, 4096).await.unwrap().unwrap();
            assert_eq!(theirs.len(), 50 + CHALLENGE_SIZE);

            let bogus = identity().sign(b"not the transcript");
            write_frame(&mut b, bogus.as_bytes()).await.unwrap();
            b
        };

        let (result, _b) = tokio::join!(perform(&mut ar, &mut aw, &ida, &reca), attacker);
        assert!(matches!(result, Err(NodeError::Handshake(_))));
    }

    #[tokio::test]
    async fn test_handshake_rejects_oversize_hello() {
        let (a, mut b) = duplex(4096);
        let (mut ar, mut aw) = split(a);

        let ida = identity();
        let reca = ida.peer_id("10.0.0.1:3000".parse().unwrap());

        b.write_all(&(10_000u32).to_be_bytes()).await.unwrap();

        let result = perform(&mut ar, &mut aw, &ida, &reca).await;
        assert!(matches!(result, Err(NodeError::MessageTooLarge { .. })));

        // Our hello went out before the peer's header was read
        let mut header = [0u8; FRAME_HEADER_SIZE];
        b.read_exact(&mut header).await.unwrap();
        assert_eq!(u32::from_be_bytes(header) as usize, 50 + CHALLENGE_SIZE);
    }

    #[tokio::test]
    async fn test_handshake_rejects_short_hello() {
        let (a, mut b) = duplex(4096);
        let (mut ar, mut aw) = split(a);

        let ida = identity();
        let reca = ida.peer_id("10.0.0.1:3000".parse().unwrap());

        write_frame(&mut b, &[1u8; 20]).await.unwrap();

        let result = perform(&mut ar, &mut aw, &ida, &reca).await;
        assert!(matches!(result, Err(NodeError::Handshake(_))));
    }

    #[tokio::test]
    async fn test_handshake_peer_hangs_up() {
        let (a, b) = duplex(4096);
        let (mut ar, mut aw) = split(a);
        drop(b);

        let ida = identity();
        let reca = ida.peer_id("10.0.0.1:3000".parse().unwrap());

        assert!(perform(&mut ar, &mut aw, &ida, &reca).await.is_err());
    }
}
