//! In-memory blob store for tests and embedders that manage persistence themselves.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::SystemTime;

use pairseal_core::{SealError, SealResult};

use crate::BlobStore;

#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<HashMap<String, (Vec<u8>, SystemTime)>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a blob with an explicit modification time.
    pub fn insert_with_mtime(&self, name: &str, data: Vec<u8>, modified: SystemTime) {
        self.lock().insert(name.to_string(), (data, modified));
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, (Vec<u8>, SystemTime)>> {
        self.blobs.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl BlobStore for MemoryBlobStore {
    fn exists(&self, name: &str) -> SealResult<bool> {
        Ok(self.lock().contains_key(name))
    }

    fn read_all(&self, name: &str) -> SealResult<Vec<u8>> {
        self.lock()
            .get(name)
            .map(|(data, _)| data.clone())
            .ok_or_else(|| SealError::KeyRead {
                name: name.to_string(),
                reason: "not found".into(),
            })
    }

    fn create_exclusive(&self, name: &str, data: &[u8]) -> SealResult<()> {
        let mut blobs = self.lock();
        if blobs.contains_key(name) {
            return Err(SealError::AlreadyExists {
                name: name.to_string(),
            });
        }
        blobs.insert(name.to_string(), (data.to_vec(), SystemTime::now()));
        Ok(())
    }

    fn delete(&self, name: &str) -> SealResult<()> {
        self.lock().remove(name);
        Ok(())
    }

    fn modified(&self, name: &str) -> SealResult<Option<SystemTime>> {
        Ok(self.lock().get(name).map(|(_, modified)| *modified))
    }
}
