//! Deterministic nonce derivation: HKDF-SHA256 over a monotonic counter
//!
//! ```text
//! nonce = HKDF-SHA256(ikm = nonce_key, salt = salt, info = context || decimal(counter))[..24]
//! ```
//!
//! The same tuple always yields the same nonce; distinct counters yield
//! independent nonces. Uniqueness per key therefore only requires never
//! reusing a counter value, which the engine's atomic counter enforces.

use hkdf::Hkdf;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::digest::typenum::Unsigned;
use sha2::digest::OutputSizeUser;
use sha2::Sha256;
use std::sync::atomic::{AtomicU64, Ordering};

use pairseal_core::{SealError, SealResult, KEY_SIZE, NONCE_SIZE};

// The salt length is tied to the hash output size. Changing the hash means
// revisiting the salt size.
const _: () = assert!(
    <<Sha256 as OutputSizeUser>::OutputSize as Unsigned>::USIZE == KEY_SIZE,
    "salt size must match the HKDF hash output size"
);

/// Derive the nonce for `counter` under (`nonce_key`, `salt`, `context`).
pub fn derive_nonce(
    nonce_key: &[u8; KEY_SIZE],
    salt: &[u8; KEY_SIZE],
    context: &str,
    counter: u64,
) -> SealResult<[u8; NONCE_SIZE]> {
    let hkdf = Hkdf::<Sha256>::new(Some(&salt[..]), &nonce_key[..]);
    let info = format!("{context}{counter}");

    let mut nonce = [0u8; NONCE_SIZE];
    hkdf.expand(info.as_bytes(), &mut nonce)
        .map_err(|e| SealError::NonceDerivation(e.to_string()))?;
    Ok(nonce)
}

/// Monotonic counter feeding [`derive_nonce`].
///
/// Each call to `claim` returns a value no other caller of the
/// same counter will ever see, even under concurrent use. The counter never
/// wraps; it fails with [`SealError::NonceExhausted`] at `u64::MAX`.
#[derive(Debug)]
pub(crate) struct NonceCounter {
    next: AtomicU64,
}

impl NonceCounter {
    pub(crate) fn starting_at(start: u64) -> Self {
        Self {
            next: AtomicU64::new(start),
        }
    }

    /// A counter starting at a random point in `[0, 2^63)`.
    ///
    /// Counters are not persisted, so two engines built from the same stored
    /// keys (e.g. across restarts) must not start from the same value.
    pub(crate) fn seeded() -> SealResult<Self> {
        let mut seed = [0u8; 8];
        OsRng
            .try_fill_bytes(&mut seed)
            .map_err(|e| SealError::NonceDerivation(format!("seeding nonce counter: {e}")))?;
        Ok(Self::starting_at(u64::from_be_bytes(seed) >> 1))
    }

    /// Claim the next unused counter value.
    pub(crate) fn claim(&self) -> SealResult<u64> {
        self.next
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                current.checked_add(1)
            })
            .map_err(|_| SealError::NonceExhausted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;

    const KEY: [u8; KEY_SIZE] = [0x42; KEY_SIZE];
    const SALT: [u8; KEY_SIZE] = [0x17; KEY_SIZE];

    #[test]
    fn test_nonce_uniqueness_over_counter() {
        let mut seen = HashSet::new();
        for counter in 0..1000u64 {
            let nonce = derive_nonce(&KEY, &SALT, "test", counter).unwrap();
            assert!(seen.insert(nonce), "duplicate nonce at counter {counter}");
        }
    }

    #[test]
    fn test_nonce_determinism() {
        let a = derive_nonce(&KEY, &SALT, "sec51", 7).unwrap();
        let b = derive_nonce(&KEY, &SALT, "sec51", 7).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_nonce_depends_on_every_input() {
        let base = derive_nonce(&KEY, &SALT, "ctx", 1).unwrap();
        assert_ne!(base, derive_nonce(&[0x43; KEY_SIZE], &SALT, "ctx", 1).unwrap());
        assert_ne!(base, derive_nonce(&KEY, &[0x18; KEY_SIZE], "ctx", 1).unwrap());
        assert_ne!(base, derive_nonce(&KEY, &SALT, "ctx2", 1).unwrap());
        assert_ne!(base, derive_nonce(&KEY, &SALT, "ctx", 2).unwrap());
    }

    #[test]
    fn test_matches_plain_hkdf_sha256() {
        let hkdf = Hkdf::<Sha256>::new(Some(&SALT[..]), &KEY[..]);
        let mut expected = [0u8; NONCE_SIZE];
        hkdf.expand(b"peer42", &mut expected).unwrap();

        assert_eq!(derive_nonce(&KEY, &SALT, "peer", 42).unwrap(), expected);
    }

    #[test]
    fn test_salt_size_matches_hash_output() {
        assert_eq!(Sha256::output_size(), KEY_SIZE);
    }

    #[test]
    fn test_counter_claims_are_sequential() {
        let counter = NonceCounter::starting_at(10);
        assert_eq!(counter.claim().unwrap(), 10);
        assert_eq!(counter.claim().unwrap(), 11);
        assert_eq!(counter.claim().unwrap(), 12);
    }

    #[test]
    fn test_counter_never_wraps() {
        let counter = NonceCounter::starting_at(u64::MAX - 1);
        assert_eq!(counter.claim().unwrap(), u64::MAX - 1);
        assert!(matches!(counter.claim(), Err(SealError::NonceExhausted)));
        assert!(matches!(counter.claim(), Err(SealError::NonceExhausted)));
    }

    #[test]
    fn test_seeded_counter_has_headroom() {
        let counter = NonceCounter::seeded().unwrap();
        assert!(counter.claim().unwrap() < 1 << 63);
    }

    #[test]
    fn test_concurrent_claims_are_unique() {
        let counter = Arc::new(NonceCounter::starting_at(0));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let counter = Arc::clone(&counter);
                thread::spawn(move || {
                    (0..500)
                        .map(|_| counter.claim().unwrap())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut all = HashSet::new();
        for h in handles {
            for value in h.join().unwrap() {
                assert!(all.insert(value), "counter value {value} claimed twice");
            }
        }
        assert_eq!(all.len(), 8 * 500);
    }

    proptest! {
        #[test]
        fn derive_is_deterministic(
            key in any::<[u8; 32]>(),
            salt in any::<[u8; 32]>(),
            context in "[a-z0-9_]{0,24}",
            counter in any::<u64>(),
        ) {
            let a = derive_nonce(&key, &salt, &context, counter).unwrap();
            let b = derive_nonce(&key, &salt, &context, counter).unwrap();
            prop_assert_eq!(a, b);
        }

        #[test]
        fn consecutive_counters_differ(
            key in any::<[u8; 32]>(),
            salt in any::<[u8; 32]>(),
            counter in 0..u64::MAX,
        ) {
            let a = derive_nonce(&key, &salt, "peer", counter).unwrap();
            let b = derive_nonce(&key, &salt, "peer", counter + 1).unwrap();
            prop_assert_ne!(a, b);
        }
    }
}
