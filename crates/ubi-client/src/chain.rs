//! Chain binding for the registry contract.
//!
//! [`RegistryChain`] is what the session talks to: read calls plus the
//! three transactions. [`InProcessChain`] hosts a [`DriverRegistry`] in
//! memory and plays the node, the mempool and the wallet's signing prompt.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use ubi_core::{ContractAddress, DriverAddress, Timestamp};
use ubi_fhe::{DecryptionProof, FheExecutor};
use ubi_registry::{
    CallContext, CreateProfile, DriverRegistry, EncryptedData, ProfileView, RegistryError,
    RegistryEvent,
};

use crate::error::ChainError;

/// Seconds between blocks on the in-process chain.
pub const BLOCK_TIME_SECS: i64 = 12;

/// Outcome of a mined transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxReceipt {
    /// Block the transaction landed in.
    pub block_number: u64,
    /// Events the transaction emitted.
    pub events: Vec<RegistryEvent>,
}

/// Access to a deployed registry.
#[allow(async_fn_in_trait)]
pub trait RegistryChain {
    /// Address of the registry contract.
    fn contract_address(&self) -> ContractAddress;

    /// Every registered driver, in registration order.
    async fn list_drivers(&self) -> Result<Vec<DriverAddress>, ChainError>;

    /// Public fields of a profile.
    async fn get_profile(&self, driver: &DriverAddress) -> Result<ProfileView, ChainError>;

    /// Ciphertext handles of a profile.
    async fn get_encrypted_data(&self, driver: &DriverAddress) -> Result<EncryptedData, ChainError>;

    /// Send `create_profile` signed by `from`.
    async fn create_profile(
        &self,
        from: &DriverAddress,
        req: CreateProfile,
    ) -> Result<TxReceipt, ChainError>;

    /// Send `compute_discount` signed by `from`.
    async fn compute_discount(&self, from: &DriverAddress) -> Result<TxReceipt, ChainError>;

    /// Send `verify_decryption` signed by `from`.
    async fn verify_decryption(
        &self,
        from: &DriverAddress,
        abi_encoded_clear_values: Vec<u8>,
        proof: DecryptionProof,
    ) -> Result<TxReceipt, ChainError>;
}

/// A registry running in this process.
///
/// Clones share the same registry, so several sessions can act on one chain.
#[derive(Debug)]
pub struct InProcessChain<F> {
    registry: Arc<Mutex<DriverRegistry<F>>>,
    block: Arc<AtomicU64>,
    genesis: Timestamp,
    reject_next: Arc<AtomicBool>,
}

impl<F> Clone for InProcessChain<F> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
            block: Arc::clone(&self.block),
            genesis: self.genesis,
            reject_next: Arc::clone(&self.reject_next),
        }
    }
}

impl<F: FheExecutor> InProcessChain<F> {
    /// Deploy a fresh registry at `address`, with block time starting at
    /// `genesis`.
    pub fn deploy(address: ContractAddress, fhe: F, genesis: Timestamp) -> Self {
        Self {
            registry: Arc::new(Mutex::new(DriverRegistry::new(address, fhe))),
            block: Arc::new(AtomicU64::new(0)),
            genesis,
            reject_next: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Make the next transaction fail as if the user declined to sign.
    pub fn reject_next_signature(&self) {
        self.reject_next.store(true, Ordering::SeqCst);
    }

    /// Current block height.
    pub fn block_number(&self) -> u64 {
        self.block.load(Ordering::SeqCst)
    }

    /// Run `f` against the registry under its lock.
    pub fn with_registry<R>(&self, f: impl FnOnce(&DriverRegistry<F>) -> R) -> R {
        let registry = self.registry.lock();
        f(&*registry)
    }

    /// Sign, mine and execute one transaction. A reverted call mines no
    /// block.
    fn transact<R>(
        &self,
        from: &DriverAddress,
        call: impl FnOnce(&mut DriverRegistry<F>, &CallContext) -> Result<R, RegistryError>,
    ) -> Result<TxReceipt, ChainError> {
        if self.reject_next.swap(false, Ordering::SeqCst) {
            tracing::info!(from = %from, "signature request rejected");
            return Err(ChainError::UserRejected);
        }

        let mut registry = self.registry.lock();
        let block_number = self.block.load(Ordering::SeqCst) + 1;
        let ctx = CallContext {
            caller: *from,
            block_timestamp: self.block_timestamp(block_number)?,
        };
        let events_before = registry.events().len();
        call(&mut *registry, &ctx)?;
        self.block.store(block_number, Ordering::SeqCst);

        Ok(TxReceipt {
            block_number,
            events: registry.events()[events_before..].to_vec(),
        })
    }

    fn block_timestamp(&self, block_number: u64) -> Result<Timestamp, ChainError> {
        let offset = i64::try_from(block_number)
            .ok()
            .and_then(|n| n.checked_mul(BLOCK_TIME_SECS))
            .ok_or_else(|| ChainError::Rpc(format!("block {block_number} out of range")))?;
        Timestamp::from_epoch_secs(self.genesis.epoch_secs() + offset)
            .map_err(|e| ChainError::Rpc(e.to_string()))
    }
}

impl<F: FheExecutor> RegistryChain for InProcessChain<F> {
    fn contract_address(&self) -> ContractAddress {
        *self.registry.lock().address()
    }

    async fn list_drivers(&self) -> Result<Vec<DriverAddress>, ChainError> {
        Ok(self.registry.lock().list_drivers().to_vec())
    }

    async fn get_profile(&self, driver: &DriverAddress) -> Result<ProfileView, ChainError> {
        Ok(self.registry.lock().get_profile(driver)?)
    }

    async fn get_encrypted_data(&self, driver: &DriverAddress) -> Result<EncryptedData, ChainError> {
        Ok(self.registry.lock().get_encrypted_data(driver)?)
    }

    async fn create_profile(
        &self,
        from: &DriverAddress,
        req: CreateProfile,
    ) -> Result<TxReceipt, ChainError> {
        self.transact(from, |registry, ctx| registry.create_profile(ctx, req))
    }

    async fn compute_discount(&self, from: &DriverAddress) -> Result<TxReceipt, ChainError> {
        self.transact(from, |registry, ctx| registry.compute_discount(ctx))
    }

    async fn verify_decryption(
        &self,
        from: &DriverAddress,
        abi_encoded_clear_values: Vec<u8>,
        proof: DecryptionProof,
    ) -> Result<TxReceipt, ChainError> {
        self.transact(from, |registry, ctx| {
            registry.verify_decryption(ctx, &abi_encoded_clear_values, &proof)
        })
    }
}
