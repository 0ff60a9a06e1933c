//! # Client Session
//!
//! One connected wallet account driving the registry. The session owns the
//! wallet, the chain binding and both encryption seams, plus a small locked
//! state: the account, whether encryption is ready, the loaded policies,
//! locally stored policy names and the latest status message.
//!
//! ## Action boundary
//!
//! Every public action records its outcome as a [`StatusMessage`] and
//! returns a `Result`. Failures never panic and never leave the session in
//! a half-updated state.
//!
//! ## Re-entrancy
//!
//! Two actions must not run twice concurrently: encryption setup and
//! decrypt-then-verify. Each is guarded by an atomic flag that is held for
//! the duration of the action and released on every exit path. The state
//! lock is never held across an `.await`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use ubi_core::{DriverAddress, ErrorKind};
use ubi_fhe::{InputEncryptor, PublicDecryptor};
use ubi_registry::{CreateProfile, RegistryError, RegistryEvent};

use crate::chain::RegistryChain;
use crate::config::ClientConfig;
use crate::error::{ChainError, ClientError};
use crate::policy::{Policy, PolicyDraft};
use crate::wallet::WalletConnector;

// ─── Status ──────────────────────────────────────────────────────────

/// Severity of a status message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusLevel {
    Pending,
    Success,
    Error,
}

/// The latest user-facing outcome of a session action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusMessage {
    pub level: StatusLevel,
    pub text: String,
}

impl StatusMessage {
    pub fn pending(text: impl Into<String>) -> Self {
        Self { level: StatusLevel::Pending, text: text.into() }
    }

    pub fn success(text: impl Into<String>) -> Self {
        Self { level: StatusLevel::Success, text: text.into() }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self { level: StatusLevel::Error, text: text.into() }
    }
}

/// Result of [`ClientSession::ensure_fhe_ready`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitOutcome {
    /// This call initialized the library.
    Initialized,
    /// A previous call already did.
    AlreadyReady,
    /// Another call is initializing right now; this one did nothing.
    InFlight,
}

// ─── Session ─────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct SessionState {
    /// Bumped by every disconnect. Actions started under an older epoch
    /// may not write back.
    epoch: u64,
    account: Option<DriverAddress>,
    fhe_ready: bool,
    policies: Vec<Policy>,
    labels: HashMap<DriverAddress, String>,
    status: Option<StatusMessage>,
}

/// Clears a re-entrancy flag when dropped.
struct FlagGuard<'a>(&'a AtomicBool);

impl<'a> FlagGuard<'a> {
    /// Raise `flag`, or return `None` if it was already raised.
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        if flag.swap(true, Ordering::SeqCst) {
            None
        } else {
            Some(Self(flag))
        }
    }
}

impl Drop for FlagGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// A client session against one registry deployment.
pub struct ClientSession<W, C, E, D> {
    config: ClientConfig,
    wallet: W,
    chain: C,
    encryptor: E,
    decryptor: D,
    state: Mutex<SessionState>,
    fhe_initializing: AtomicBool,
    decrypting: AtomicBool,
}

impl<W, C, E, D> ClientSession<W, C, E, D>
where
    W: WalletConnector,
    C: RegistryChain,
    E: InputEncryptor,
    D: PublicDecryptor,
{
    /// Assemble a disconnected session.
    pub fn new(config: ClientConfig, wallet: W, chain: C, encryptor: E, decryptor: D) -> Self {
        Self {
            config,
            wallet,
            chain,
            encryptor,
            decryptor,
            state: Mutex::new(SessionState::default()),
            fhe_initializing: AtomicBool::new(false),
            decrypting: AtomicBool::new(false),
        }
    }

    /// Assemble a disconnected session configured from the environment
    /// (see [`ClientConfig::from_env`]).
    pub fn from_env(wallet: W, chain: C, encryptor: E, decryptor: D) -> Result<Self, ClientError> {
        Ok(Self::new(ClientConfig::from_env()?, wallet, chain, encryptor, decryptor))
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn wallet(&self) -> &W {
        &self.wallet
    }

    pub fn chain(&self) -> &C {
        &self.chain
    }

    pub fn encryptor(&self) -> &E {
        &self.encryptor
    }

    pub fn decryptor(&self) -> &D {
        &self.decryptor
    }

    /// The connected account, if any.
    pub fn account(&self) -> Option<DriverAddress> {
        self.state.lock().account
    }

    pub fn is_fhe_ready(&self) -> bool {
        self.state.lock().fhe_ready
    }

    /// Policies as of the last successful load.
    pub fn policies(&self) -> Vec<Policy> {
        self.state.lock().policies.clone()
    }

    /// The latest status message.
    pub fn status(&self) -> Option<StatusMessage> {
        self.state.lock().status.clone()
    }

    /// Take and clear the latest status message.
    pub fn take_status(&self) -> Option<StatusMessage> {
        self.state.lock().status.take()
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Connect the wallet, prepare encryption and load policies.
    ///
    /// Fails with [`ClientError::ContractMismatch`] when the chain binding
    /// serves a different registry than the configured one.
    pub async fn connect(&self) -> Result<DriverAddress, ClientError> {
        let epoch = self.epoch();
        self.set_status(epoch, StatusMessage::pending("Connecting wallet…"));

        let deployed = self.chain.contract_address();
        if deployed != self.config.contract_address {
            let err = ClientError::ContractMismatch {
                configured: self.config.contract_address,
                deployed,
            };
            return Err(self.fail(epoch, "Connection refused", err));
        }

        let account = self
            .wallet
            .connect()
            .await
            .map_err(|e| self.fail(epoch, "Wallet connection failed", e.into()))?;
        self.commit(epoch, |state| state.account = Some(account))?;
        tracing::info!(account = %account, "wallet connected");

        self.init_fhe(epoch).await?;
        self.load_policies_in(epoch).await?;
        self.set_status(epoch, StatusMessage::success(format!("Connected as {}", account.short())));
        Ok(account)
    }

    /// Drop the account and everything derived from it. Actions still in
    /// flight finish without writing back into the session.
    pub async fn disconnect(&self) {
        self.wallet.disconnect().await;
        let mut state = self.state.lock();
        let epoch = state.epoch.wrapping_add(1);
        *state = SessionState { epoch, ..SessionState::default() };
        tracing::info!("wallet disconnected");
    }

    /// Initialize the encryption library once.
    ///
    /// A call made while another is still initializing returns
    /// [`InitOutcome::InFlight`] without touching the library.
    pub async fn ensure_fhe_ready(&self) -> Result<InitOutcome, ClientError> {
        self.init_fhe(self.epoch()).await
    }

    async fn init_fhe(&self, epoch: u64) -> Result<InitOutcome, ClientError> {
        let Some(_guard) = FlagGuard::acquire(&self.fhe_initializing) else {
            if self.is_fhe_ready() {
                return Ok(InitOutcome::AlreadyReady);
            }
            tracing::debug!("encryption setup already in flight");
            return Ok(InitOutcome::InFlight);
        };
        // A previous holder may have finished just before the swap.
        if self.is_fhe_ready() {
            return Ok(InitOutcome::AlreadyReady);
        }

        self.set_status(epoch, StatusMessage::pending("Initializing encryption…"));
        self.encryptor
            .initialize()
            .await
            .map_err(|e| self.fail(epoch, "Encryption setup failed", e.into()))?;
        self.commit(epoch, |state| state.fhe_ready = true)?;
        self.set_status(epoch, StatusMessage::success("Encryption ready"));
        tracing::info!("encryption context ready");
        Ok(InitOutcome::Initialized)
    }

    // ── Actions ──────────────────────────────────────────────────────

    /// Reload every policy from the chain.
    ///
    /// A profile that fails to load is logged and left out; only a failure
    /// to list drivers fails the call.
    pub async fn load_policies(&self) -> Result<Vec<Policy>, ClientError> {
        self.load_policies_in(self.epoch()).await
    }

    async fn load_policies_in(&self, epoch: u64) -> Result<Vec<Policy>, ClientError> {
        let drivers = self
            .chain
            .list_drivers()
            .await
            .map_err(|e| self.fail(epoch, "Failed to load policies", e.into()))?;

        let mut policies = Vec::with_capacity(drivers.len());
        for driver in drivers {
            match self.chain.get_profile(&driver).await {
                Ok(view) => {
                    let label = self.state.lock().labels.get(&driver).cloned();
                    policies.push(Policy::from_view(&view, label.as_deref()));
                }
                Err(e) => {
                    tracing::warn!(driver = %driver, error = %e, "skipping policy that failed to load");
                }
            }
        }

        let loaded = policies.clone();
        self.commit(epoch, |state| state.policies = loaded)?;
        tracing::debug!(count = policies.len(), "policies loaded");
        Ok(policies)
    }

    /// Encrypt a draft and register it as the connected driver's profile.
    pub async fn create_policy(&self, draft: PolicyDraft) -> Result<(), ClientError> {
        let epoch = self.epoch();
        let name = draft.name.clone();
        let account = match self.submit_policy(epoch, draft).await {
            Ok(account) => account,
            Err(e) => {
                let text = if e.kind() == Some(ErrorKind::UserRejectedSigning) {
                    "Transaction rejected by user".to_string()
                } else {
                    format!("Submission failed: {e}")
                };
                tracing::warn!(error = %e, "policy submission failed");
                self.set_status(epoch, StatusMessage::error(text));
                return Err(e);
            }
        };

        self.commit(epoch, |state| {
            state.labels.insert(account, name.clone());
        })?;
        if let Err(e) = self.load_policies_in(epoch).await {
            tracing::warn!(error = %e, "policy list refresh failed after creation");
        }
        self.set_status(epoch, StatusMessage::success(format!("Policy \"{name}\" created")));
        tracing::info!(driver = %account, "policy created");
        Ok(())
    }

    async fn submit_policy(&self, epoch: u64, draft: PolicyDraft) -> Result<DriverAddress, ClientError> {
        let account = self.require_account()?;
        if !self.is_fhe_ready() {
            return Err(ClientError::EncryptionNotReady);
        }
        let contract = self.config.contract_address;

        self.set_status(epoch, StatusMessage::pending("Encrypting policy data…"));
        let encrypted_mileage = self
            .encryptor
            .encrypt_u32(&contract, &account, draft.raw_score)
            .await?;
        let encrypted_speeding_events = self
            .encryptor
            .encrypt_u32(&contract, &account, draft.speeding_events)
            .await?;

        self.ensure_current(epoch)?;
        self.set_status(epoch, StatusMessage::pending("Waiting for signature…"));
        self.chain
            .create_profile(
                &account,
                CreateProfile {
                    encrypted_mileage,
                    encrypted_speeding_events,
                    age: draft.age,
                    vehicle_value: draft.vehicle_value,
                    base_premium: draft.base_premium,
                },
            )
            .await?;
        Ok(account)
    }

    /// Obtain the verified score of policy `id`.
    ///
    /// An already verified policy answers from chain state. Otherwise the
    /// owner decrypts the mileage ciphertext through the relayer and
    /// submits the proof. Returns `Ok(None)` when the policy was settled by
    /// someone else between the decryption and the submission.
    pub async fn request_decryption(&self, id: DriverAddress) -> Result<Option<u32>, ClientError> {
        // The in-flight call owns the status line.
        let Some(_guard) = FlagGuard::acquire(&self.decrypting) else {
            tracing::warn!(policy = %id, "decryption requested while another is in flight");
            return Err(ClientError::Busy);
        };

        let epoch = self.epoch();
        match self.decrypt_and_verify(epoch, id).await {
            Ok(Some(value)) => {
                self.set_status(epoch, StatusMessage::success(format!("Verified score: {value}")));
                Ok(Some(value))
            }
            Ok(None) => {
                self.set_status(epoch, StatusMessage::success("Policy was already verified"));
                Ok(None)
            }
            Err(e) => Err(self.fail(epoch, "Decryption failed", e)),
        }
    }

    async fn decrypt_and_verify(&self, epoch: u64, id: DriverAddress) -> Result<Option<u32>, ClientError> {
        let profile = self.chain.get_profile(&id).await?;
        if profile.is_verified {
            tracing::debug!(policy = %id, "score already on-chain");
            return Ok(Some(profile.decrypted_discount));
        }

        let account = self.require_account()?;
        if account != id {
            return Err(ClientError::NotProfileOwner { id, account });
        }

        self.set_status(epoch, StatusMessage::pending("Requesting decryption…"));
        let handles = self.chain.get_encrypted_data(&id).await?;
        let bundle = self
            .decryptor
            .public_decrypt(&[handles.mileage], &self.config.contract_address)
            .await?;
        let value = bundle
            .clear_values
            .get(&handles.mileage)
            .copied()
            .ok_or(ClientError::IncompleteDecryption(handles.mileage))?;
        tracing::debug!(policy = %id, "decryption bundle received");

        self.ensure_current(epoch)?;
        self.set_status(epoch, StatusMessage::pending("Submitting decryption proof…"));
        let outcome = self
            .chain
            .verify_decryption(&account, bundle.abi_encoded_clear_values, bundle.decryption_proof)
            .await;
        let verified = match outcome {
            Ok(_) => Some(value),
            Err(ChainError::Reverted(RegistryError::AlreadyVerified { .. })) => {
                tracing::info!(policy = %id, "policy settled concurrently");
                None
            }
            Err(e) => return Err(e.into()),
        };

        if let Err(e) = self.load_policies_in(epoch).await {
            tracing::warn!(error = %e, "policy list refresh failed after verification");
        }
        Ok(verified)
    }

    /// Ask the registry to compute and settle the connected driver's
    /// discount. Returns the settled value.
    pub async fn request_onchain_computation(&self) -> Result<u32, ClientError> {
        let epoch = self.epoch();
        match self.compute_onchain(epoch).await {
            Ok(value) => {
                self.set_status(epoch, StatusMessage::success(format!("Discount computed: {value}")));
                Ok(value)
            }
            Err(e) => Err(self.fail(epoch, "On-chain computation failed", e)),
        }
    }

    async fn compute_onchain(&self, epoch: u64) -> Result<u32, ClientError> {
        let account = self.require_account()?;
        self.set_status(epoch, StatusMessage::pending("Computing discount on-chain…"));
        let receipt = self.chain.compute_discount(&account).await?;

        let emitted = receipt.events.iter().find_map(|e| match e {
            RegistryEvent::DiscountComputed { discount, .. } => Some(*discount),
            _ => None,
        });
        let value = match emitted {
            Some(v) => v,
            None => self.chain.get_profile(&account).await?.decrypted_discount,
        };

        if let Err(e) = self.load_policies_in(epoch).await {
            tracing::warn!(error = %e, "policy list refresh failed after computation");
        }
        tracing::info!(driver = %account, discount = value, "on-chain computation settled");
        Ok(value)
    }

    // ── Helpers ──────────────────────────────────────────────────────

    fn epoch(&self) -> u64 {
        self.state.lock().epoch
    }

    fn ensure_current(&self, epoch: u64) -> Result<(), ClientError> {
        self.commit(epoch, |_| ())
    }

    /// Apply `f` to the session state unless a disconnect happened since
    /// `epoch`.
    fn commit<R>(&self, epoch: u64, f: impl FnOnce(&mut SessionState) -> R) -> Result<R, ClientError> {
        let mut state = self.state.lock();
        if state.epoch != epoch {
            tracing::debug!("discarding result of an action started before disconnect");
            return Err(ClientError::Disconnected);
        }
        Ok(f(&mut state))
    }

    fn require_account(&self) -> Result<DriverAddress, ClientError> {
        self.account().ok_or(ClientError::NotConnected)
    }

    fn set_status(&self, epoch: u64, status: StatusMessage) {
        let _ = self.commit(epoch, |state| state.status = Some(status));
    }

    /// Record `err` as the session status and hand it back.
    fn fail(&self, epoch: u64, context: &str, err: ClientError) -> ClientError {
        tracing::warn!(error = %err, "{context}");
        self.set_status(epoch, StatusMessage::error(format!("{context}: {err}")));
        err
    }
}
