//! Client-side errors.
//!
//! Every session action catches its failure, records it as a status
//! message, and returns it. Nothing here panics the session.

use thiserror::Error;
use ubi_core::{CiphertextHandle, ContractAddress, DriverAddress, ErrorKind};
use ubi_fhe::FheError;
use ubi_registry::RegistryError;

use crate::config::ConfigError;

/// Wallet-layer failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WalletError {
    /// The user declined the request.
    #[error("request rejected by user")]
    Rejected,
    /// No wallet provider is reachable.
    #[error("wallet unavailable: {0}")]
    Unavailable(String),
}

/// Chain-binding failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    /// The user declined to sign the transaction.
    #[error("transaction rejected by user")]
    UserRejected,
    /// The contract reverted the call.
    #[error("transaction reverted: {0}")]
    Reverted(#[from] RegistryError),
    /// Transport or node failure.
    #[error("rpc failure: {0}")]
    Rpc(String),
}

impl ChainError {
    /// The user-facing failure kind.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UserRejected => ErrorKind::UserRejectedSigning,
            Self::Reverted(e) => e.kind(),
            Self::Rpc(_) => ErrorKind::NetworkOrRpcFailure,
        }
    }
}

/// Failures of a session action.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// The action needs a connected wallet.
    #[error("wallet not connected")]
    NotConnected,
    /// The action needs the encryption context.
    #[error("encryption context not ready")]
    EncryptionNotReady,
    /// Another decryption is in flight.
    #[error("a decryption is already in progress")]
    Busy,
    /// Only a profile's owner can settle it.
    #[error("profile {id} is owned by another driver than {account}")]
    NotProfileOwner {
        /// The profile requested.
        id: DriverAddress,
        /// The connected account.
        account: DriverAddress,
    },
    /// The wallet was disconnected while the action was in flight.
    #[error("session disconnected during the action")]
    Disconnected,
    /// The chain binding serves another registry than the configured one.
    #[error("chain serves registry {deployed}, configured {configured}")]
    ContractMismatch {
        configured: ContractAddress,
        deployed: ContractAddress,
    },
    /// The decryption bundle lacks the requested handle.
    #[error("decryption returned no value for {0}")]
    IncompleteDecryption(CiphertextHandle),
    #[error(transparent)]
    Wallet(#[from] WalletError),
    #[error(transparent)]
    Chain(#[from] ChainError),
    #[error(transparent)]
    Fhe(#[from] FheError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl ClientError {
    /// The user-facing failure kind, when the error maps onto one.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Wallet(WalletError::Rejected) => Some(ErrorKind::UserRejectedSigning),
            Self::Wallet(WalletError::Unavailable(_)) => Some(ErrorKind::NetworkOrRpcFailure),
            Self::Chain(e) => Some(e.kind()),
            Self::Fhe(e) if e.is_network() => Some(ErrorKind::NetworkOrRpcFailure),
            Self::Fhe(FheError::InvalidInputProof(_)) => Some(ErrorKind::InvalidCiphertext),
            Self::Fhe(FheError::SignatureCheck(_)) => Some(ErrorKind::SignatureCheckFailed),
            _ => None,
        }
    }
}
