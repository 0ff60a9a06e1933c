//! Registry errors. Each one reverts the call that raised it.

use thiserror::Error;
use ubi_core::{DriverAddress, ErrorKind};
use ubi_fhe::FheError;

/// Reasons a registry call reverts.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// No profile exists for the driver.
    #[error("no profile registered for {driver}")]
    ProfileNotFound {
        /// The driver looked up.
        driver: DriverAddress,
    },

    /// The caller already registered a profile.
    #[error("profile already exists for {driver}")]
    ProfileAlreadyExists {
        /// The caller.
        driver: DriverAddress,
    },

    /// The profile was already settled.
    #[error("profile for {driver} is already verified")]
    AlreadyVerified {
        /// The profile owner.
        driver: DriverAddress,
    },

    /// An encrypted input failed validation.
    #[error("invalid ciphertext for {field}: {reason}")]
    InvalidCiphertext {
        /// Which input field was rejected.
        field: &'static str,
        /// Library-provided reason.
        reason: String,
    },

    /// The decryption proof did not verify against the stored handles.
    #[error("decryption signature check failed: {0}")]
    SignatureCheckFailed(String),

    /// The proven clear values are not a single `uint32`.
    #[error("malformed clear values: {0}")]
    MalformedClearValues(String),

    /// The encryption library failed during evaluation.
    #[error("encryption library failure: {0}")]
    Fhe(#[from] FheError),
}

impl RegistryError {
    /// The user-facing failure kind.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ProfileNotFound { .. } => ErrorKind::ProfileNotFound,
            Self::ProfileAlreadyExists { .. } => ErrorKind::ProfileAlreadyExists,
            Self::AlreadyVerified { .. } => ErrorKind::AlreadyVerified,
            Self::InvalidCiphertext { .. } | Self::Fhe(_) => ErrorKind::InvalidCiphertext,
            Self::SignatureCheckFailed(_) | Self::MalformedClearValues(_) => {
                ErrorKind::SignatureCheckFailed
            }
        }
    }
}
