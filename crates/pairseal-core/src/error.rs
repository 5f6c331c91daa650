use thiserror::Error;

use crate::KEY_SIZE;

pub type SealResult<T> = Result<T, SealError>;

#[derive(Debug, Error)]
pub enum SealError {
    // configuration
    #[error("the provisioned key size is less than {expected} bytes (got {actual})")]
    KeySize { expected: usize, actual: usize },

    #[error("the provisioned public key is not valid: {0}")]
    KeyNotValid(&'static str),

    #[error("config error: {0}")]
    Config(String),

    // generation
    #[error("could not generate random salt: {0}")]
    SaltGeneration(String),

    #[error("could not generate random key: {0}")]
    KeyGeneration(String),

    // storage
    #[error("key blob already exists: {name}")]
    AlreadyExists { name: String },

    #[error("could not read key blob {name}: {reason}")]
    KeyRead { name: String, reason: String },

    #[error("inconsistent keypair: {present} exists but {missing} does not")]
    InconsistentKeyPair { present: String, missing: String },

    #[error(
        "keypair partially persisted and cleanup failed; delete {public} and {private} manually: {cause}"
    )]
    PartiallyPersisted {
        public: String,
        private: String,
        #[source]
        cause: Box<SealError>,
    },

    #[error("storage error: {0:#}")]
    Storage(#[source] anyhow::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // derivation
    #[error("could not derive a nonce: {0}")]
    NonceDerivation(String),

    #[error("nonce counter exhausted")]
    NonceExhausted,

    // cryptographic
    #[error("could not verify the message, it has been tampered with or the key is wrong")]
    MessageDecryption,

    #[error("encryption failed: {0}")]
    Encryption(String),

    // parsing
    #[error("could not parse the message from bytes: {0}")]
    MessageParsing(String),

    #[error("the message exceeds the maximum encodable size")]
    LengthOverflow,

    #[error("declared message length {declared} does not match actual length {actual}")]
    LengthMismatch { declared: u64, actual: u64 },

    #[error("unsupported message version: {0}")]
    UnsupportedVersion(i32),

    // input
    #[error("can not encrypt an empty message")]
    EmptyMessage,
}

impl SealError {
    /// Whether a caller may reasonably retry the failed operation.
    ///
    /// Only storage and I/O failures qualify. Authentication failures and
    /// every validation error are terminal: the same inputs cannot succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SealError::Storage(_) | SealError::Io(_))
    }
}

/// Build a [`SealError::KeySize`] for a buffer that is too short to hold a key.
pub fn key_size_error(actual: usize) -> SealError {
    SealError::KeySize {
        expected: KEY_SIZE,
        actual,
    }
}
