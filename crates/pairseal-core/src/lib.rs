//! pairseal-core: shared types, configuration, and errors for pairseal
//!
//! Everything here is independent of the cryptographic primitives so that the
//! storage and crypto crates can share one error vocabulary and one config
//! schema.

pub mod config;
pub mod error;
pub mod types;

pub use config::{EngineConfig, KeysConfig, PairsealConfig};
pub use error::{SealError, SealResult};
pub use types::{sanitize_identifier, KeyKind};

/// Size of every persisted key blob (salt, secret, nonce key, keypair halves)
pub const KEY_SIZE: usize = 32;

/// Size of a message nonce (192-bit)
pub const NONCE_SIZE: usize = 24;
