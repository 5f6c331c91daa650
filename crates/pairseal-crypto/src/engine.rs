//! Per-identifier crypto engine
//!
//! A [`CryptoEngine`] owns the five key blobs of one communication
//! identifier, a nonce counter, and a cache of the box shared key for the most
//! recently used peer. All operations take `&self` and are safe to call from
//! several threads: counter values are claimed atomically and the peer cache
//! is guarded by a mutex.
//!
//! Shared-key cache states:
//! ```text
//! Pending ──(encrypt/decrypt with peer P)──▶ Cached(P)
//! Cached(P) ──(same P)──▶ Cached(P)          reuse
//! Cached(P) ──(other Q)──▶ Cached(Q)         recompute
//! ```

use crypto_box::SalsaBox;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use pairseal_core::{
    sanitize_identifier, KeyKind, PairsealConfig, SealError, SealResult, KEY_SIZE, NONCE_SIZE,
};
use pairseal_storage::{BlobStore, FsBlobStore};

use crate::aead;
use crate::keys::KeyBytes;
use crate::keystore::KeyStore;
use crate::message::{Message, ASYMMETRIC_VERSION, SYMMETRIC_VERSION};
use crate::nonce::{derive_nonce, NonceCounter};

/// Whether the engine currently holds a precomputed shared key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SharedKeyState {
    Pending,
    Cached,
}

struct PeerSession {
    peer_public: [u8; KEY_SIZE],
    shared: Arc<SalsaBox>,
}

pub struct CryptoEngine {
    context: String,
    salt: KeyBytes,
    secret_key: KeyBytes,
    nonce_key: KeyBytes,
    public_key: KeyBytes,
    private_key: KeyBytes,
    counter: NonceCounter,
    peer: Mutex<Option<PeerSession>>,
    strict_length: bool,
}

impl CryptoEngine {
    /// Initialize with default configuration.
    pub fn init(identifier: &str, store: &dyn BlobStore) -> SealResult<Self> {
        Self::init_with_config(identifier, store, &PairsealConfig::default())
    }

    /// Sanitize `identifier`, then load or create the salt, keypair, secret
    /// key, and nonce key, in that order. The first failure is returned.
    pub fn init_with_config(
        identifier: &str,
        store: &dyn BlobStore,
        config: &PairsealConfig,
    ) -> SealResult<Self> {
        let context = sanitize_identifier(identifier);
        if context.is_empty() {
            return Err(SealError::Config(format!(
                "identifier {identifier:?} is empty after sanitizing"
            )));
        }
        let keys = KeyStore::new(store, &context);

        let salt = keys.load_or_create(KeyKind::Salt)?;
        let (public_key, private_key) = keys.load_or_create_keypair()?;
        let secret_key = keys.load_or_create(KeyKind::Secret)?;
        let nonce_key = keys.load_or_create(KeyKind::Nonce)?;

        match keys.salt_is_stale(config.keys.salt_max_age()) {
            Ok(true) => tracing::warn!(
                context = %context,
                max_age_days = config.keys.salt_max_age_days,
                "salt is older than the configured maximum age and should be rotated"
            ),
            Ok(false) => {}
            Err(e) => tracing::warn!(context = %context, "could not check salt age: {e}"),
        }

        tracing::debug!(context = %context, "crypto engine initialized");

        Ok(Self {
            context,
            salt,
            secret_key,
            nonce_key,
            public_key,
            private_key,
            counter: NonceCounter::seeded()?,
            peer: Mutex::new(None),
            strict_length: config.engine.strict_length,
        })
    }

    /// Initialize against the filesystem key directory from `config`.
    pub fn open(identifier: &str, config: &PairsealConfig) -> SealResult<Self> {
        let store = FsBlobStore::from_config(&config.keys)?;
        Self::init_with_config(identifier, &store, config)
    }

    /// The sanitized identifier namespacing this engine's keys.
    pub fn context(&self) -> &str {
        &self.context
    }

    pub fn public_key(&self) -> &[u8; KEY_SIZE] {
        self.public_key.as_bytes()
    }

    /// The peer public key of the most recent asymmetric operation.
    pub fn peer_public_key(&self) -> Option<[u8; KEY_SIZE]> {
        self.lock_peer().as_ref().map(|s| s.peer_public)
    }

    pub fn shared_key_state(&self) -> SharedKeyState {
        match *self.lock_peer() {
            Some(_) => SharedKeyState::Cached,
            None => SharedKeyState::Pending,
        }
    }

    /// Encrypt with the shared secret key.
    pub fn encrypt_symmetric(&self, plaintext: &[u8]) -> SealResult<Message> {
        if plaintext.is_empty() {
            return Err(SealError::EmptyMessage);
        }
        let nonce = self.next_nonce()?;
        let ciphertext = aead::seal_symmetric(self.secret_key.as_bytes(), &nonce, plaintext)?;
        Message::new(SYMMETRIC_VERSION, nonce, ciphertext)
    }

    /// Encrypt for the holder of `peer_public_key`.
    pub fn encrypt_asymmetric(
        &self,
        plaintext: &[u8],
        peer_public_key: &[u8],
    ) -> SealResult<Message> {
        if plaintext.is_empty() {
            return Err(SealError::EmptyMessage);
        }
        let peer = validate_peer_key(peer_public_key)?;
        let nonce = self.next_nonce()?;
        let shared = self.shared_key(&peer);
        let ciphertext = aead::seal_box(&shared, &nonce, plaintext)?;
        Message::new(ASYMMETRIC_VERSION, nonce, ciphertext)
    }

    /// Decrypt `message`. Asymmetric messages need the sender's public key.
    ///
    /// Authentication failures surface as [`SealError::MessageDecryption`]
    /// and must not be retried.
    pub fn decrypt(
        &self,
        message: &Message,
        peer_public_key: Option<&[u8]>,
    ) -> SealResult<Vec<u8>> {
        let result = match message.version() {
            SYMMETRIC_VERSION => aead::open_symmetric(
                self.secret_key.as_bytes(),
                message.nonce(),
                message.ciphertext(),
            ),
            ASYMMETRIC_VERSION => {
                let peer = peer_public_key
                    .ok_or(SealError::KeyNotValid("a peer public key is required"))?;
                let peer = validate_peer_key(peer)?;
                let shared = self.shared_key(&peer);
                aead::open_box(&shared, message.nonce(), message.ciphertext())
            }
            other => return Err(SealError::UnsupportedVersion(other)),
        };

        if let Err(SealError::MessageDecryption) = &result {
            tracing::debug!(
                context = %self.context,
                version = message.version(),
                "message failed authentication"
            );
        }
        result
    }

    /// Decode a wire envelope and decrypt it.
    ///
    /// The length field is cross-checked when `engine.strict_length` is set.
    pub fn decrypt_bytes(
        &self,
        data: &[u8],
        peer_public_key: Option<&[u8]>,
    ) -> SealResult<Vec<u8>> {
        let message = if self.strict_length {
            Message::from_bytes_strict(data)?
        } else {
            Message::from_bytes(data)?
        };
        self.decrypt(&message, peer_public_key)
    }

    fn next_nonce(&self) -> SealResult<[u8; NONCE_SIZE]> {
        let counter = self.counter.claim()?;
        derive_nonce(
            self.nonce_key.as_bytes(),
            self.salt.as_bytes(),
            &self.context,
            counter,
        )
    }

    /// The shared key for `peer`, precomputed if the cache is empty or holds
    /// a different peer. The lock is released before the caller uses it.
    fn shared_key(&self, peer: &[u8; KEY_SIZE]) -> Arc<SalsaBox> {
        let mut guard = self.lock_peer();
        if !matches!(guard.as_ref(), Some(s) if &s.peer_public == peer) {
            *guard = None;
        }
        let session = guard.get_or_insert_with(|| {
            tracing::debug!(context = %self.context, "precomputing shared key for peer");
            PeerSession {
                peer_public: *peer,
                shared: Arc::new(aead::precompute_shared_key(peer, self.private_key.as_bytes())),
            }
        });
        Arc::clone(&session.shared)
    }

    fn lock_peer(&self) -> MutexGuard<'_, Option<PeerSession>> {
        self.peer.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for CryptoEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CryptoEngine")
            .field("context", &self.context)
            .field("keys", &"[REDACTED]")
            .field("shared_key", &self.shared_key_state())
            .finish()
    }
}

fn validate_peer_key(key: &[u8]) -> SealResult<[u8; KEY_SIZE]> {
    let key: [u8; KEY_SIZE] = key
        .try_into()
        .map_err(|_| SealError::KeyNotValid("peer public key must be exactly 32 bytes"))?;
    if key.iter().all(|b| *b == 0) {
        return Err(SealError::KeyNotValid("peer public key is all zeros"));
    }
    Ok(key)
}
