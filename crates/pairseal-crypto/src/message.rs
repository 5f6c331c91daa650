//! Encrypted message envelope
//!
//! Wire format (big-endian, no padding):
//! ```text
//! offset  size  field
//! 0       8     total length (u64)
//! 8       4     version (i32)
//! 12      24    nonce
//! 36      N     ciphertext (N >= 1)
//! ```
//!
//! The length field is informational. [`Message::from_bytes`] frames on the
//! buffer itself and accepts any length value; [`Message::from_bytes_strict`]
//! additionally requires `length == 36 + N`.

use pairseal_core::{SealError, SealResult, NONCE_SIZE};

/// Message encrypted with the shared secret key (XChaCha20-Poly1305)
pub const SYMMETRIC_VERSION: i32 = 0;

/// Message encrypted with a NaCl box (X25519 + XSalsa20-Poly1305)
pub const ASYMMETRIC_VERSION: i32 = 1;

const LENGTH_SIZE: usize = 8;
const VERSION_SIZE: usize = 4;

/// Bytes preceding the ciphertext
pub const HEADER_SIZE: usize = LENGTH_SIZE + VERSION_SIZE + NONCE_SIZE;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    length: u64,
    version: i32,
    nonce: [u8; NONCE_SIZE],
    ciphertext: Vec<u8>,
}

impl Message {
    /// Build a message, computing its total wire length.
    pub fn new(version: i32, nonce: [u8; NONCE_SIZE], ciphertext: Vec<u8>) -> SealResult<Self> {
        let length = u64::try_from(ciphertext.len())
            .ok()
            .and_then(|n| n.checked_add(HEADER_SIZE as u64))
            .ok_or(SealError::LengthOverflow)?;
        Ok(Self {
            length,
            version,
            nonce,
            ciphertext,
        })
    }

    /// Declared total length, as carried in the header.
    pub fn length(&self) -> u64 {
        self.length
    }

    pub fn version(&self) -> i32 {
        self.version
    }

    pub fn nonce(&self) -> &[u8; NONCE_SIZE] {
        &self.nonce
    }

    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }

    /// Encode to the wire format.
    pub fn to_bytes(&self) -> SealResult<Vec<u8>> {
        let capacity = HEADER_SIZE
            .checked_add(self.ciphertext.len())
            .ok_or(SealError::LengthOverflow)?;

        let mut out = Vec::with_capacity(capacity);
        out.extend_from_slice(&self.length.to_be_bytes());
        out.extend_from_slice(&self.version.to_be_bytes());
        out.extend_from_slice(&self.nonce);
        out.extend_from_slice(&self.ciphertext);
        Ok(out)
    }

    /// Decode from the wire format without checking the length field.
    ///
    /// Fails with [`SealError::MessageParsing`] if `data` is shorter than the
    /// header plus one ciphertext byte.
    pub fn from_bytes(data: &[u8]) -> SealResult<Self> {
        if data.len() <= HEADER_SIZE {
            return Err(SealError::MessageParsing(format!(
                "need at least {} bytes, got {}",
                HEADER_SIZE + 1,
                data.len()
            )));
        }

        let (length, rest) = data.split_at(LENGTH_SIZE);
        let (version, rest) = rest.split_at(VERSION_SIZE);
        let (nonce, ciphertext) = rest.split_at(NONCE_SIZE);

        Ok(Self {
            length: u64::from_be_bytes(to_array(length)?),
            version: i32::from_be_bytes(to_array(version)?),
            nonce: to_array(nonce)?,
            ciphertext: ciphertext.to_vec(),
        })
    }

    /// Decode and require the length field to match the buffer size.
    pub fn from_bytes_strict(data: &[u8]) -> SealResult<Self> {
        let message = Self::from_bytes(data)?;
        let actual = data.len() as u64;
        if message.length != actual {
            return Err(SealError::LengthMismatch {
                declared: message.length,
                actual,
            });
        }
        Ok(message)
    }
}

fn to_array<const N: usize>(slice: &[u8]) -> SealResult<[u8; N]> {
    slice
        .try_into()
        .map_err(|_| SealError::MessageParsing(format!("expected {N} bytes, got {}", slice.len())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample() -> Message {
        Message::new(SYMMETRIC_VERSION, [0xAA; NONCE_SIZE], b"ciphertext".to_vec()).unwrap()
    }

    #[test]
    fn test_layout() {
        let bytes = sample().to_bytes().unwrap();

        assert_eq!(bytes.len(), HEADER_SIZE + 10);
        assert_eq!(&bytes[..8], &(46u64).to_be_bytes());
        assert_eq!(&bytes[8..12], &[0, 0, 0, 0]);
        assert_eq!(&bytes[12..36], &[0xAA; NONCE_SIZE]);
        assert_eq!(&bytes[36..], b"ciphertext");
    }

    #[test]
    fn test_length_counts_header() {
        let m = sample();
        assert_eq!(m.length(), (HEADER_SIZE + m.ciphertext().len()) as u64);
    }

    #[test]
    fn test_decode_roundtrip() {
        let m = sample();
        let decoded = Message::from_bytes(&m.to_bytes().unwrap()).unwrap();
        assert_eq!(decoded, m);
    }

    #[test]
    fn test_decode_rejects_short_input() {
        assert!(matches!(Message::from_bytes(&[]), Err(SealError::MessageParsing(_))));
        assert!(matches!(Message::from_bytes(&[0u8; 10]), Err(SealError::MessageParsing(_))));
        // header only: an empty ciphertext is malformed
        assert!(matches!(
            Message::from_bytes(&[0u8; HEADER_SIZE]),
            Err(SealError::MessageParsing(_))
        ));
    }

    #[test]
    fn test_decode_minimum_size() {
        let m = Message::from_bytes(&[0u8; HEADER_SIZE + 1]).unwrap();
        assert_eq!(m.ciphertext(), &[0u8]);
        assert_eq!(m.length(), 0);
    }

    #[test]
    fn test_decode_negative_version() {
        let mut bytes = sample().to_bytes().unwrap();
        bytes[8..12].copy_from_slice(&(-2i32).to_be_bytes());
        assert_eq!(Message::from_bytes(&bytes).unwrap().version(), -2);
    }

    #[test]
    fn test_lenient_decode_ignores_length_field() {
        let mut bytes = sample().to_bytes().unwrap();
        bytes[..8].copy_from_slice(&u64::MAX.to_be_bytes());

        let m = Message::from_bytes(&bytes).unwrap();
        assert_eq!(m.length(), u64::MAX);
        assert_eq!(m.ciphertext(), b"ciphertext");

        // re-encoding preserves what was received
        assert_eq!(m.to_bytes().unwrap(), bytes);
    }

    #[test]
    fn test_strict_decode_checks_length_field() {
        let bytes = sample().to_bytes().unwrap();
        assert!(Message::from_bytes_strict(&bytes).is_ok());

        let mut tampered = bytes.clone();
        tampered[..8].copy_from_slice(&7u64.to_be_bytes());
        assert!(matches!(
            Message::from_bytes_strict(&tampered),
            Err(SealError::LengthMismatch { declared: 7, actual: 46 })
        ));

        // trailing bytes change the actual size
        let mut extended = bytes;
        extended.push(0);
        assert!(Message::from_bytes_strict(&extended).is_err());
    }

    proptest! {
        #[test]
        fn codec_roundtrip(
            version in 0i32..=1,
            nonce in any::<[u8; 24]>(),
            ciphertext in proptest::collection::vec(any::<u8>(), 1..=10_000),
        ) {
            let m = Message::new(version, nonce, ciphertext.clone()).unwrap();
            let decoded = Message::from_bytes_strict(&m.to_bytes().unwrap()).unwrap();
            prop_assert_eq!(decoded.version(), version);
            prop_assert_eq!(decoded.nonce(), &nonce);
            prop_assert_eq!(decoded.ciphertext(), &ciphertext[..]);
        }

        #[test]
        fn decode_never_panics(data in proptest::collection::vec(any::<u8>(), 0..=256)) {
            match Message::from_bytes(&data) {
                Ok(m) => prop_assert_eq!(m.ciphertext().len(), data.len() - HEADER_SIZE),
                Err(e) => {
                    prop_assert!(data.len() <= HEADER_SIZE);
                    prop_assert!(matches!(e, SealError::MessageParsing(_)));
                }
            }
        }
    }
}
