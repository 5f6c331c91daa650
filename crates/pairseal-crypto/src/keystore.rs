//! Load-or-create-once persistence of per-identifier key material
//!
//! Blobs are named `{identifier}_{kind}.key` and hold 32 raw bytes. Single
//! keys are created with exclusive-create semantics. The asymmetric keypair
//! follows a two-step protocol:
//!
//! 1. both halves present: load both and check they belong together
//! 2. exactly one half present: fail, never regenerate over it
//! 3. neither present: write the public key, then the private key; if the
//!    private write fails, delete the public key again, and report
//!    [`SealError::PartiallyPersisted`] if even that delete fails

use crypto_box::SecretKey;
use std::time::Duration;
use zeroize::Zeroize;

use pairseal_core::{KeyKind, SealError, SealResult, KEY_SIZE};
use pairseal_storage::BlobStore;

use crate::keys::{generate_key, KeyBytes};

pub struct KeyStore<'a> {
    store: &'a dyn BlobStore,
    identifier: String,
}

impl<'a> KeyStore<'a> {
    /// `identifier` is used verbatim as the blob name prefix.
    pub fn new(store: &'a dyn BlobStore, identifier: &str) -> Self {
        Self {
            store,
            identifier: identifier.to_string(),
        }
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn blob_name(&self, kind: KeyKind) -> String {
        kind.blob_name(&self.identifier)
    }

    /// Read an existing key blob and return its first 32 bytes.
    pub fn load(&self, kind: KeyKind) -> SealResult<KeyBytes> {
        let name = self.blob_name(kind);
        let mut data = self.store.read_all(&name)?;
        if data.len() < KEY_SIZE {
            let found = data.len();
            data.zeroize();
            return Err(SealError::KeyRead {
                name,
                reason: format!("expected {KEY_SIZE} bytes, found {found}"),
            });
        }
        let key = KeyBytes::from_prefix(&data);
        data.zeroize();
        tracing::debug!(blob = %name, "loaded key material");
        key
    }

    /// Generate and persist a fresh key.
    ///
    /// Fails with [`SealError::AlreadyExists`] if the blob already exists,
    /// whether it was there before the call or appeared concurrently.
    pub fn create(&self, kind: KeyKind) -> SealResult<KeyBytes> {
        let name = self.blob_name(kind);
        if self.store.exists(&name)? {
            return Err(SealError::AlreadyExists { name });
        }
        let key = generate_key(kind)?;
        self.store.create_exclusive(&name, key.as_bytes())?;
        tracing::info!(blob = %name, "generated and persisted new key material");
        Ok(key)
    }

    /// Load the key if its blob exists, otherwise create it.
    ///
    /// Keypair halves are rejected here; use [`KeyStore::load_or_create_keypair`].
    pub fn load_or_create(&self, kind: KeyKind) -> SealResult<KeyBytes> {
        if matches!(kind, KeyKind::Public | KeyKind::Private) {
            return Err(SealError::Config(format!(
                "{kind} key must be loaded as part of a keypair"
            )));
        }
        if self.store.exists(&self.blob_name(kind))? {
            return self.load(kind);
        }
        self.create(kind)
    }

    /// Load or create the asymmetric keypair. Returns `(public, private)`.
    pub fn load_or_create_keypair(&self) -> SealResult<(KeyBytes, KeyBytes)> {
        let public_name = self.blob_name(KeyKind::Public);
        let private_name = self.blob_name(KeyKind::Private);

        match (
            self.store.exists(&public_name)?,
            self.store.exists(&private_name)?,
        ) {
            (true, true) => {
                let public = self.load(KeyKind::Public)?;
                let private = self.load(KeyKind::Private)?;
                if derive_public(&private).as_bytes() != public.as_bytes() {
                    return Err(SealError::InconsistentKeyPair {
                        present: private_name,
                        missing: format!("a matching {public_name}"),
                    });
                }
                Ok((public, private))
            }
            (true, false) => Err(SealError::InconsistentKeyPair {
                present: public_name,
                missing: private_name,
            }),
            (false, true) => Err(SealError::InconsistentKeyPair {
                present: private_name,
                missing: public_name,
            }),
            (false, false) => self.create_keypair(),
        }
    }

    fn create_keypair(&self) -> SealResult<(KeyBytes, KeyBytes)> {
        let public_name = self.blob_name(KeyKind::Public);
        let private_name = self.blob_name(KeyKind::Private);

        let private = generate_key(KeyKind::Private)?;
        let public = derive_public(&private);

        self.store.create_exclusive(&public_name, public.as_bytes())?;

        if let Err(write_err) = self.store.create_exclusive(&private_name, private.as_bytes()) {
            if let Err(cleanup_err) = self.store.delete(&public_name) {
                tracing::error!(
                    public = %public_name,
                    private = %private_name,
                    "private key failed to persist and the public key could not be removed: {cleanup_err}; \
                     delete both blobs manually"
                );
                return Err(SealError::PartiallyPersisted {
                    public: public_name,
                    private: private_name,
                    cause: Box::new(write_err),
                });
            }
            tracing::warn!(
                public = %public_name,
                "private key failed to persist, removed the public key: {write_err}"
            );
            return Err(write_err);
        }

        tracing::info!(identifier = %self.identifier, "generated and persisted new keypair");
        Ok((public, private))
    }

    /// Whether the salt blob is older than `max_age`.
    ///
    /// Only reports; rotating the salt is left to the operator.
    pub fn salt_is_stale(&self, max_age: Duration) -> SealResult<bool> {
        let modified = self.store.modified(&self.blob_name(KeyKind::Salt))?;
        Ok(match modified {
            Some(at) => at.elapsed().map(|age| age > max_age).unwrap_or(false),
            None => false,
        })
    }
}

fn derive_public(private: &KeyBytes) -> KeyBytes {
    let secret = SecretKey::from(*private.as_bytes());
    KeyBytes::from_bytes(*secret.public_key().as_bytes())
}
