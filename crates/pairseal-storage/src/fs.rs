//! Directory-backed blob store
//!
//! Each blob is one file directly under the root directory. Files are created
//! with `O_CREAT | O_EXCL` so that concurrent creators race safely: exactly one
//! wins, the other gets `AlreadyExists`.

use anyhow::Context;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use pairseal_core::{KeysConfig, SealError, SealResult};

use crate::BlobStore;

#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
    file_mode: u32,
}

impl FsBlobStore {
    /// Open (creating if needed) a store rooted at `root`.
    pub fn open(root: impl Into<PathBuf>, file_mode: u32) -> SealResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root)
            .with_context(|| format!("creating key directory: {}", root.display()))
            .map_err(SealError::Storage)?;
        tracing::debug!(root = %root.display(), "opened key blob store");
        Ok(Self { root, file_mode })
    }

    pub fn from_config(config: &KeysConfig) -> SealResult<Self> {
        Self::open(config.resolved_dir()?, config.file_mode)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, name: &str) -> SealResult<PathBuf> {
        let valid = !name.is_empty()
            && name != "."
            && name != ".."
            && !name.contains(['/', '\\', '\0']);
        if !valid {
            return Err(SealError::Config(format!("invalid blob name: {name:?}")));
        }
        Ok(self.root.join(name))
    }

    #[cfg(unix)]
    fn create_options(&self) -> OpenOptions {
        use std::os::unix::fs::OpenOptionsExt;
        let mut opts = OpenOptions::new();
        opts.write(true).create_new(true).mode(self.file_mode);
        opts
    }

    #[cfg(not(unix))]
    fn create_options(&self) -> OpenOptions {
        let mut opts = OpenOptions::new();
        opts.write(true).create_new(true);
        opts
    }
}

impl BlobStore for FsBlobStore {
    fn exists(&self, name: &str) -> SealResult<bool> {
        let path = self.path_for(name)?;
        path.try_exists()
            .with_context(|| format!("checking key blob: {}", path.display()))
            .map_err(SealError::Storage)
    }

    fn read_all(&self, name: &str) -> SealResult<Vec<u8>> {
        let path = self.path_for(name)?;
        match fs::read(&path) {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(SealError::KeyRead {
                name: name.to_string(),
                reason: "not found".into(),
            }),
            Err(e) => Err(SealError::Storage(
                anyhow::Error::new(e).context(format!("reading key blob: {}", path.display())),
            )),
        }
    }

    fn create_exclusive(&self, name: &str, data: &[u8]) -> SealResult<()> {
        let path = self.path_for(name)?;
        let mut file = match self.create_options().open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(SealError::AlreadyExists {
                    name: name.to_string(),
                })
            }
            Err(e) => {
                return Err(SealError::Storage(
                    anyhow::Error::new(e).context(format!("creating key blob: {}", path.display())),
                ))
            }
        };

        if let Err(e) = file.write_all(data).and_then(|()| file.sync_all()) {
            // a truncated key blob must not survive
            drop(file);
            if let Err(rm) = fs::remove_file(&path) {
                tracing::warn!(path = %path.display(), "failed to remove truncated key blob: {rm}");
            }
            return Err(SealError::Storage(
                anyhow::Error::new(e).context(format!("writing key blob: {}", path.display())),
            ));
        }

        tracing::debug!(path = %path.display(), bytes = data.len(), "created key blob");
        Ok(())
    }

    fn delete(&self, name: &str) -> SealResult<()> {
        let path = self.path_for(name)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(SealError::Storage(
                anyhow::Error::new(e).context(format!("deleting key blob: {}", path.display())),
            )),
        }
    }

    fn modified(&self, name: &str) -> SealResult<Option<SystemTime>> {
        let path = self.path_for(name)?;
        match fs::metadata(&path) {
            Ok(meta) => meta
                .modified()
                .map(Some)
                .with_context(|| format!("reading mtime: {}", path.display()))
                .map_err(SealError::Storage),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(SealError::Storage(
                anyhow::Error::new(e).context(format!("stat key blob: {}", path.display())),
            )),
        }
    }
}
