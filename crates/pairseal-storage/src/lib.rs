//! pairseal-storage: byte-blob stores for persisted key material
//!
//! Key blobs are small, written once, and never updated in place. A store
//! therefore only needs existence checks, whole-blob reads, exclusive
//! creation, and deletion (for cleanup after a failed keypair write).

pub mod fs;
pub mod memory;

pub use fs::FsBlobStore;
pub use memory::MemoryBlobStore;

use pairseal_core::SealResult;
use std::time::SystemTime;

/// A flat namespace of named byte blobs.
///
/// `create_exclusive` must fail with [`pairseal_core::SealError::AlreadyExists`]
/// when the name is already taken, including when another writer created it
/// after a preceding `exists` check.
pub trait BlobStore: Send + Sync {
    fn exists(&self, name: &str) -> SealResult<bool>;

    fn read_all(&self, name: &str) -> SealResult<Vec<u8>>;

    fn create_exclusive(&self, name: &str, data: &[u8]) -> SealResult<()>;

    /// Remove a blob. Removing a missing blob is not an error.
    fn delete(&self, name: &str) -> SealResult<()>;

    /// Last modification time, or `None` if the blob does not exist.
    fn modified(&self, name: &str) -> SealResult<Option<SystemTime>>;
}
