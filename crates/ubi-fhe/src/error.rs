//! Errors raised by the encryption capability.

use thiserror::Error;
use ubi_core::CiphertextHandle;

/// Failure inside the encryption library or its transport.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FheError {
    /// The library context was used before `initialize()` completed.
    #[error("encryption context not initialized")]
    NotInitialized,

    /// An input proof does not bind the ciphertext to the contract and user.
    #[error("invalid input proof: {0}")]
    InvalidInputProof(String),

    /// The handle is not known to the coprocessor.
    #[error("unknown ciphertext handle {0}")]
    UnknownHandle(CiphertextHandle),

    /// Public decryption was requested for a handle that was never marked
    /// publicly decryptable.
    #[error("handle {0} is not publicly decryptable")]
    NotPubliclyDecryptable(CiphertextHandle),

    /// Scalar division by zero.
    #[error("division by zero")]
    DivisionByZero,

    /// A decryption proof did not meet the signer threshold.
    #[error("signature check failed: {0}")]
    SignatureCheck(String),

    /// ABI-encoded clear values could not be decoded.
    #[error("malformed ABI clear values: {0}")]
    Abi(String),

    /// The relayer answered with a non-2xx status.
    #[error("relayer returned {status}: {body}")]
    Relayer {
        /// HTTP status code.
        status: u16,
        /// Response body, as text.
        body: String,
    },

    /// Transport-level failure reaching the relayer.
    #[error("relayer transport error: {0}")]
    Transport(String),
}

impl FheError {
    /// Whether the failure is a network/transport problem rather than a
    /// cryptographic rejection.
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Relayer { .. } | Self::Transport(_))
    }
}
