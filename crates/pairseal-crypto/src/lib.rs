//! pairseal-crypto: authenticated encryption between two named endpoints
//!
//! Architecture:
//! ```text
//! identifier ──sanitize──▶ KeyStore (load or create once, per identifier)
//!                            ├── salt        ─┐
//!                            ├── nonce key   ─┴─▶ HKDF-SHA256(info = context || counter) ─▶ 24-byte nonce
//!                            ├── secret key  ───▶ XChaCha20-Poly1305          (version 0)
//!                            └── keypair     ───▶ X25519 + XSalsa20-Poly1305   (version 1, shared key cached)
//!
//! Message wire format: [u64 length][i32 version][24-byte nonce][ciphertext], big-endian
//! ```
//!
//! Nonces are never random and never persisted: each encryption claims a
//! unique value from an atomic counter owned by the engine and derives the
//! nonce from it, so nonce uniqueness reduces to counter uniqueness.
//! The counter is not reachable from outside the crate:
//!
//! ```compile_fail
//! use pairseal_crypto::nonce::NonceCounter;
//! ```

mod aead;
pub mod engine;
pub mod keys;
pub mod keystore;
pub mod message;
pub mod nonce;

pub use engine::{CryptoEngine, SharedKeyState};
pub use keys::KeyBytes;
pub use keystore::KeyStore;
pub use message::{Message, ASYMMETRIC_VERSION, HEADER_SIZE, SYMMETRIC_VERSION};
pub use nonce::derive_nonce;

pub use pairseal_core::{SealError, SealResult, KEY_SIZE, NONCE_SIZE};

/// Size of a Poly1305 authentication tag
pub const TAG_SIZE: usize = 16;
