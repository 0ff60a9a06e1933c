//! # Error Types: Shared Taxonomy
//!
//! `ErrorKind` is the closed set of failure kinds surfaced to a driver.
//! Contract-side kinds revert the triggering transaction; client-side kinds
//! are caught at the action boundary and turned into a status message.
//!
//! `UbiError` covers the failures of this crate itself: malformed
//! identifiers and timestamps.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The kinds of failure a registry interaction can end in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// No profile is registered for the address.
    ProfileNotFound,
    /// The caller already registered a profile.
    ProfileAlreadyExists,
    /// The profile has already been settled.
    AlreadyVerified,
    /// An encrypted input failed validation against its input proof.
    InvalidCiphertext,
    /// A decryption proof did not carry enough valid signatures.
    SignatureCheckFailed,
    /// The wallet owner declined to sign.
    UserRejectedSigning,
    /// Transport, RPC or relayer failure.
    NetworkOrRpcFailure,
}

impl ErrorKind {
    /// Whether the failure originates in the contract (and therefore
    /// reverted the whole transaction).
    pub fn is_contract_revert(&self) -> bool {
        matches!(
            self,
            Self::ProfileNotFound
                | Self::ProfileAlreadyExists
                | Self::AlreadyVerified
                | Self::InvalidCiphertext
                | Self::SignatureCheckFailed
        )
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::ProfileNotFound => "ProfileNotFound",
            Self::ProfileAlreadyExists => "ProfileAlreadyExists",
            Self::AlreadyVerified => "AlreadyVerified",
            Self::InvalidCiphertext => "InvalidCiphertext",
            Self::SignatureCheckFailed => "SignatureCheckFailed",
            Self::UserRejectedSigning => "UserRejectedSigning",
            Self::NetworkOrRpcFailure => "NetworkOrRpcFailure",
        };
        f.write_str(s)
    }
}

/// Errors raised while parsing foundational types.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UbiError {
    /// An address or handle was not well-formed hex of the right width.
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// A timestamp could not be parsed or was out of range.
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),
}
