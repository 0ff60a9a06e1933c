//! Wallet connection seam.

use std::sync::atomic::{AtomicBool, Ordering};

use ubi_core::DriverAddress;

use crate::error::WalletError;

/// Connects to a wallet provider and yields the active account.
#[allow(async_fn_in_trait)]
pub trait WalletConnector {
    /// Request account access.
    async fn connect(&self) -> Result<DriverAddress, WalletError>;

    /// Drop account access.
    async fn disconnect(&self);
}

/// A wallet with a fixed account, for local runs and tests.
#[derive(Debug)]
pub struct DevWallet {
    account: DriverAddress,
    reject: AtomicBool,
    connected: AtomicBool,
}

impl DevWallet {
    /// Wallet holding `account`.
    pub fn new(account: DriverAddress) -> Self {
        Self {
            account,
            reject: AtomicBool::new(false),
            connected: AtomicBool::new(false),
        }
    }

    /// Make subsequent connection requests fail as user-rejected.
    pub fn reject_connections(&self, reject: bool) {
        self.reject.store(reject, Ordering::SeqCst);
    }

    /// Whether the wallet currently grants access.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

impl WalletConnector for DevWallet {
    async fn connect(&self) -> Result<DriverAddress, WalletError> {
        if self.reject.load(Ordering::SeqCst) {
            return Err(WalletError::Rejected);
        }
        self.connected.store(true, Ordering::SeqCst);
        Ok(self.account)
    }

    async fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }
}
