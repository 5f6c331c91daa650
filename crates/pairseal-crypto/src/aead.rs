//! Thin adapters over the AEAD primitives
//!
//! - symmetric: XChaCha20-Poly1305 keyed by the secret key
//! - asymmetric: NaCl box (X25519 + XSalsa20-Poly1305); a [`SalsaBox`] holds the
//!   precomputed shared key for one (peer public, local private) pair
//!
//! Every open failure collapses into [`SealError::MessageDecryption`].

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    XChaCha20Poly1305, XNonce,
};
use crypto_box::{PublicKey, SalsaBox, SecretKey};

use pairseal_core::{SealError, SealResult, KEY_SIZE, NONCE_SIZE};

pub(crate) fn seal_symmetric(
    key: &[u8; KEY_SIZE],
    nonce: &[u8; NONCE_SIZE],
    plaintext: &[u8],
) -> SealResult<Vec<u8>> {
    let cipher = XChaCha20Poly1305::new(key.into());
    cipher
        .encrypt(XNonce::from_slice(nonce), plaintext)
        .map_err(|e| SealError::Encryption(format!("symmetric seal failed: {e}")))
}

pub(crate) fn open_symmetric(
    key: &[u8; KEY_SIZE],
    nonce: &[u8; NONCE_SIZE],
    ciphertext: &[u8],
) -> SealResult<Vec<u8>> {
    let cipher = XChaCha20Poly1305::new(key.into());
    cipher
        .decrypt(XNonce::from_slice(nonce), ciphertext)
        .map_err(|_| SealError::MessageDecryption)
}

/// Precompute the box shared key between `peer_public` and `private`.
pub(crate) fn precompute_shared_key(
    peer_public: &[u8; KEY_SIZE],
    private: &[u8; KEY_SIZE],
) -> SalsaBox {
    let peer = PublicKey::from(*peer_public);
    let secret = SecretKey::from(*private);
    SalsaBox::new(&peer, &secret)
}

pub(crate) fn seal_box(
    shared: &SalsaBox,
    nonce: &[u8; NONCE_SIZE],
    plaintext: &[u8],
) -> SealResult<Vec<u8>> {
    shared
        .encrypt(crypto_box::Nonce::from_slice(nonce), plaintext)
        .map_err(|e| SealError::Encryption(format!("box seal failed: {e}")))
}

pub(crate) fn open_box(
    shared: &SalsaBox,
    nonce: &[u8; NONCE_SIZE],
    ciphertext: &[u8],
) -> SealResult<Vec<u8>> {
    shared
        .decrypt(crypto_box::Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| SealError::MessageDecryption)
}
