//! Wire messages and stream framing.
//!
//! A [`WireMessage`] is a big-endian nonce followed by an opaque payload.
//! A nonce of zero marks a fire-and-forget notification; any other nonce is a
//! request that expects exactly one response carrying the same nonce.
//!
//! On a byte stream every message (and every handshake record) travels inside
//! a length-prefixed frame:
//!
//! ```text
//! ┌───────────────┬──────────────────────────────┐
//! │ length (4 BE) │ body (length bytes)          │
//! └───────────────┴──────────────────────────────┘
//! ```
//!
//! The declared length is checked against the receiver's limit before any
//! buffer is allocated.

use crate::error::{DecodeError, Error};
use std::io::ErrorKind;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Nonce size in bytes
pub const NONCE_SIZE: usize = 8;

/// Frame length prefix size in bytes
pub const FRAME_HEADER_SIZE: usize = 4;

/// Nonce value reserved for notifications
pub const NOTIFICATION_NONCE: u64 = 0;

/// A nonce-tagged protocol message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireMessage {
    /// Correlation nonce (0 for notifications)
    pub nonce: u64,
    /// Opaque payload
    pub data: Vec<u8>,
}

impl WireMessage {
    /// Create a message with an explicit nonce
    pub fn new(nonce: u64, data: impl Into<Vec<u8>>) -> Self {
        Self {
            nonce,
            data: data.into(),
        }
    }

    /// Create a notification (nonce 0)
    pub fn notification(data: impl Into<Vec<u8>>) -> Self {
        Self::new(NOTIFICATION_NONCE, data)
    }

    /// Whether the sender expects a response
    pub fn is_request(&self) -> bool {
        self.nonce != NOTIFICATION_NONCE
    }

    /// Encoded size in bytes
    pub fn encoded_len(&self) -> usize {
        NONCE_SIZE + self.data.len()
    }

    /// Append `be_u64(nonce) || data` to `out`.
    pub fn encode(&self, out: &mut Vec<u8>) {
        out.reserve(self.encoded_len());
        out.extend_from_slice(&self.nonce.to_be_bytes());
        out.extend_from_slice(&self.data);
    }

    /// Encode into a freshly allocated buffer
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.encoded_len());
        self.encode(&mut out);
        out
    }

    /// Decode a message from untrusted bytes.
    ///
    /// The payload is every byte after the nonce.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::TruncatedInput`] if fewer than 8 bytes are given.
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        if bytes.len() < NONCE_SIZE {
            return Err(DecodeError::TruncatedInput {
                expected: NONCE_SIZE,
                actual: bytes.len(),
            });
        }

        let (nonce, data) = bytes.split_at(NONCE_SIZE);
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        nonce_bytes.copy_from_slice(nonce);

        Ok(Self {
            nonce: u64::from_be_bytes(nonce_bytes),
            data: data.to_vec(),
        })
    }
}

/// Write one length-prefixed frame and flush.
///
/// # Errors
///
/// Returns [`Error::FrameTooLarge`] if the body does not fit a 32-bit length
/// and [`Error::Io`] if the write fails.
pub async fn write_frame<W>(writer: &mut W, body: &[u8]) -> Result<(), Error>
where
    W: AsyncWrite + Unpin,
{
    let len = u32::try_from(body.len()).map_err(|_| Error::FrameTooLarge {
        size: body.len(),
        max: u32::MAX as usize,
    })?;

    writer.write_all(&len.to_be_bytes()).await?;
    writer.write_all(body).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one length-prefixed frame.
///
/// Returns `Ok(None)` when the stream ends before a new frame starts.
///
/// # Errors
///
/// Returns [`Error::FrameTooLarge`] if the declared length exceeds
/// `max_size` (nothing is allocated in that case) and [`Error::Io`] if the
/// stream fails or ends inside a frame body.
pub async fn read_frame<R>(reader: &mut R, max_size: usize) -> Result<Option<Vec<u8>>, Error>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; FRAME_HEADER_SIZE];
    match reader.read_exact(&mut header).await {
        Ok(_) => {}
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    let size = u32::from_be_bytes(header) as usize;
    if size > max_size {
        return Err(Error::FrameTooLarge {
            size,
            max: max_size,
        });
    }

    let mut body = vec![0u8; size];
    reader.read_exact(&mut body).await?;
    Ok(Some(body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_layout() {
        let msg = WireMessage::new(0x0102_0304_0506_0708, b"payload".to_vec());
        let bytes = msg.to_bytes();

        assert_eq!(&bytes[..8], &[1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(&bytes[8..], b"payload");
        assert_eq!(bytes.len(), msg.encoded_len());
    }

    #[test]
    fn test_encode_appends() {
        let mut out = vec![0xEE];
        WireMessage::notification(b"x".to_vec()).encode(&mut out);
        assert_eq!(out, [0xEE, 0, 0, 0, 0, 0, 0, 0, 0, b'x']);
    }

    #[test]
    fn test_decode_returns_payload_after_nonce() {
        // The payload is the bytes after the nonce, never the nonce itself
        let bytes = [0, 0, 0, 0, 0, 0, 0, 9, b'h', b'i'];
        let msg = WireMessage::decode(&bytes).unwrap();

        assert_eq!(msg.nonce, 9);
        assert_eq!(msg.data, b"hi");
    }

    #[test]
    fn test_decode_nonce_only() {
        let msg = WireMessage::decode(&[0u8; 8]).unwrap();
        assert_eq!(msg.nonce, 0);
        assert!(msg.data.is_empty());
        assert!(!msg.is_request());
    }

    #[test]
    fn test_decode_truncated() {
        let err = WireMessage::decode(&[1, 2, 3]).unwrap_err();
        assert_eq!(
            err,
            DecodeError::TruncatedInput {
                expected: 8,
                actual: 3
            }
        );
    }

    #[test]
    fn test_request_flag() {
        assert!(WireMessage::new(1, Vec::new()).is_request());
        assert!(WireMessage::new(u64::MAX, Vec::new()).is_request());
        assert!(!WireMessage::notification(Vec::new()).is_request());
    }

    #[tokio::test]
    async fn test_frame_roundtrip() {
        let (mut a, mut b) = tokio::io::duplex(1024);

        write_frame(&mut a, b"first").await.unwrap();
        write_frame(&mut a, b"").await.unwrap();

        assert_eq!(read_frame(&mut b, 64).await.unwrap().unwrap(), b"first");
        assert_eq!(read_frame(&mut b, 64).await.unwrap().unwrap(), b"");
    }

    #[tokio::test]
    async fn test_read_frame_clean_eof() {
        let (a, mut b) = tokio::io::duplex(64);
        drop(a);
        assert!(read_frame(&mut b, 64).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_read_frame_rejects_oversize_before_body() {
        let (mut a, mut b) = tokio::io::duplex(64);

        // Only the header is sent; the check must not wait for a body
        a.write_all(&(1_000_000u32).to_be_bytes()).await.unwrap();

        let err = read_frame(&mut b, 1024).await.unwrap_err();
        assert!(matches!(
            err,
            Error::FrameTooLarge {
                size: 1_000_000,
                max: 1024
            }
        ));
    }

    #[tokio::test]
    async fn test_read_frame_truncated_body() {
        let (mut a, mut b) = tokio::io::duplex(64);
        a.write_all(&10u32.to_be_bytes()).await.unwrap();
        a.write_all(b"abc").await.unwrap();
        drop(a);

        let err = read_frame(&mut b, 64).await.unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
