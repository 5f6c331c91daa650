//! Key material: zeroizing 32-byte keys and fallible random generation

use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::Zeroize;

use pairseal_core::error::key_size_error;
use pairseal_core::{KeyKind, SealError, SealResult, KEY_SIZE};

/// A 256-bit key (salt, secret, nonce key, or keypair half). Zeroized on drop.
#[derive(Clone, PartialEq, Eq)]
pub struct KeyBytes {
    bytes: [u8; KEY_SIZE],
}

impl KeyBytes {
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self { bytes }
    }

    /// Take the first [`KEY_SIZE`] bytes of `data`.
    ///
    /// Fails with [`SealError::KeySize`] if fewer are available.
    pub fn from_prefix(data: &[u8]) -> SealResult<Self> {
        let prefix = data.get(..KEY_SIZE).ok_or_else(|| key_size_error(data.len()))?;
        let mut bytes = [0u8; KEY_SIZE];
        bytes.copy_from_slice(prefix);
        Ok(Self { bytes })
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }

    pub fn is_zero(&self) -> bool {
        self.bytes.iter().all(|b| *b == 0)
    }
}

impl Drop for KeyBytes {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for KeyBytes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyBytes")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Generate a random 256-bit value for `kind` from the OS RNG.
///
/// A failing random source surfaces as `SaltGeneration` for salts and
/// `KeyGeneration` for everything else.
pub fn generate_key(kind: KeyKind) -> SealResult<KeyBytes> {
    let mut bytes = [0u8; KEY_SIZE];
    if let Err(e) = OsRng.try_fill_bytes(&mut bytes) {
        bytes.zeroize();
        return Err(match kind {
            KeyKind::Salt => SealError::SaltGeneration(e.to_string()),
            _ => SealError::KeyGeneration(e.to_string()),
        });
    }
    Ok(KeyBytes::from_bytes(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_keys_differ() {
        let k1 = generate_key(KeyKind::Secret).unwrap();
        let k2 = generate_key(KeyKind::Secret).unwrap();
        assert_ne!(k1, k2, "random keys must differ");
        assert!(!k1.is_zero());
    }

    #[test]
    fn test_from_prefix_truncates_long_input() {
        let mut data = vec![9u8; KEY_SIZE];
        data.extend_from_slice(b"trailing");
        let key = KeyBytes::from_prefix(&data).unwrap();
        assert_eq!(key.as_bytes(), &[9u8; KEY_SIZE]);
    }

    #[test]
    fn test_from_prefix_short_input() {
        let err = KeyBytes::from_prefix(&[1u8; 31]).unwrap_err();
        assert!(matches!(err, SealError::KeySize { expected: 32, actual: 31 }));
    }

    #[test]
    fn test_debug_is_redacted() {
        let key = KeyBytes::from_bytes([0xAB; KEY_SIZE]);
        let dbg = format!("{key:?}");
        assert!(dbg.contains("REDACTED"));
        assert!(!dbg.contains("171"));
    }
}
