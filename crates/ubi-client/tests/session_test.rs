//! Session flows against an in-process registry and the mock coprocessor.

use std::collections::HashSet;
use std::sync::Barrier;

use ubi_client::{
    ChainError, ClientConfig, ClientError, ClientSession, DevWallet, InProcessChain, InitOutcome,
    PolicyDraft, RegistryChain, StatusLevel, TxReceipt,
};
use ubi_core::{CiphertextHandle, ContractAddress, DriverAddress, ErrorKind, Timestamp};
use ubi_fhe::{DecryptionBundle, DecryptionProof, FheError, MockFhe, PublicDecryptor};
use ubi_registry::{CreateProfile, EncryptedData, ProfileView, RegistryError, SettlementMethod};

const ALICE: DriverAddress = DriverAddress::from_bytes([0xa1; 20]);
const BOB: DriverAddress = DriverAddress::from_bytes([0xb0; 20]);

fn deployment() -> (InProcessChain<MockFhe>, MockFhe) {
    let fhe = MockFhe::from_seed([7u8; 32]);
    let chain = InProcessChain::deploy(
        ContractAddress::from_bytes([0xc0; 20]),
        fhe.clone(),
        Timestamp::from_epoch_secs(1_700_000_000).unwrap(),
    );
    (chain, fhe)
}

fn session<C: RegistryChain, D: PublicDecryptor>(
    chain: C,
    fhe: &MockFhe,
    driver: DriverAddress,
    decryptor: D,
) -> ClientSession<DevWallet, C, MockFhe, D> {
    let config = ClientConfig::local(chain.contract_address()).unwrap();
    ClientSession::new(config, DevWallet::new(driver), chain, fhe.clone(), decryptor)
}

fn event_count(chain: &InProcessChain<MockFhe>) -> usize {
    chain.with_registry(|r| r.events().len())
}

// ── Decryptor doubles ────────────────────────────────────────────────

/// Yields before delegating, so a second caller can interleave.
struct SlowDecryptor(MockFhe);

impl PublicDecryptor for SlowDecryptor {
    async fn public_decrypt(
        &self,
        handles: &[CiphertextHandle],
        contract: &ContractAddress,
    ) -> Result<DecryptionBundle, FheError> {
        tokio::task::yield_now().await;
        self.0.public_decrypt(handles, contract).await
    }
}

/// Settles the profile on-chain right after producing the bundle.
struct RacingDecryptor {
    fhe: MockFhe,
    chain: InProcessChain<MockFhe>,
    driver: DriverAddress,
}

impl PublicDecryptor for RacingDecryptor {
    async fn public_decrypt(
        &self,
        handles: &[CiphertextHandle],
        contract: &ContractAddress,
    ) -> Result<DecryptionBundle, FheError> {
        let bundle = self.fhe.public_decrypt(handles, contract).await?;
        self.chain.compute_discount(&self.driver).await.unwrap();
        Ok(bundle)
    }
}

// ── Chain double ─────────────────────────────────────────────────────

/// Fails selected reads, delegating everything else.
#[derive(Clone)]
struct FlakyChain {
    inner: InProcessChain<MockFhe>,
    broken_profiles: HashSet<DriverAddress>,
    fail_list: bool,
}

impl RegistryChain for FlakyChain {
    fn contract_address(&self) -> ContractAddress {
        self.inner.contract_address()
    }

    async fn list_drivers(&self) -> Result<Vec<DriverAddress>, ChainError> {
        if self.fail_list {
            return Err(ChainError::Rpc("connection reset".into()));
        }
        self.inner.list_drivers().await
    }

    async fn get_profile(&self, driver: &DriverAddress) -> Result<ProfileView, ChainError> {
        if self.broken_profiles.contains(driver) {
            return Err(ChainError::Rpc("timeout".into()));
        }
        self.inner.get_profile(driver).await
    }

    async fn get_encrypted_data(&self, driver: &DriverAddress) -> Result<EncryptedData, ChainError> {
        self.inner.get_encrypted_data(driver).await
    }

    async fn create_profile(
        &self,
        from: &DriverAddress,
        req: CreateProfile,
    ) -> Result<TxReceipt, ChainError> {
        self.inner.create_profile(from, req).await
    }

    async fn compute_discount(&self, from: &DriverAddress) -> Result<TxReceipt, ChainError> {
        self.inner.compute_discount(from).await
    }

    async fn verify_decryption(
        &self,
        from: &DriverAddress,
        abi_encoded_clear_values: Vec<u8>,
        proof: DecryptionProof,
    ) -> Result<TxReceipt, ChainError> {
        self.inner
            .verify_decryption(from, abi_encoded_clear_values, proof)
            .await
    }
}

// ── Connection and setup ─────────────────────────────────────────────

#[tokio::test]
async fn connect_initializes_encryption_and_loads_policies() {
    let (chain, fhe) = deployment();
    let s = session(chain, &fhe, ALICE, fhe.clone());

    assert_eq!(s.connect().await.unwrap(), ALICE);
    assert_eq!(s.account(), Some(ALICE));
    assert!(s.is_fhe_ready());
    assert_eq!(s.encryptor().initialize_count(), 1);
    assert!(s.policies().is_empty());
    assert_eq!(s.status().unwrap().level, StatusLevel::Success);
    assert!(s.wallet().is_connected());
}

#[tokio::test]
async fn rejected_wallet_connection_is_reported() {
    let (chain, fhe) = deployment();
    let s = session(chain, &fhe, ALICE, fhe.clone());
    s.wallet().reject_connections(true);

    let err = s.connect().await.unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::UserRejectedSigning));
    assert_eq!(s.account(), None);
    assert_eq!(s.status().unwrap().level, StatusLevel::Error);
}

#[tokio::test]
async fn concurrent_initialization_runs_once() {
    let (chain, fhe) = deployment();
    let s = session(chain, &fhe, ALICE, fhe.clone());

    let (first, second) = tokio::join!(s.ensure_fhe_ready(), s.ensure_fhe_ready());
    assert_eq!(first.unwrap(), InitOutcome::Initialized);
    assert_eq!(second.unwrap(), InitOutcome::InFlight);
    assert_eq!(s.encryptor().initialize_count(), 1);

    assert_eq!(s.ensure_fhe_ready().await.unwrap(), InitOutcome::AlreadyReady);
    assert_eq!(s.encryptor().initialize_count(), 1);
}

#[test]
fn initialization_across_threads_runs_once() {
    const THREADS: usize = 8;
    let (chain, fhe) = deployment();
    let s = session(chain, &fhe, ALICE, fhe.clone());
    let barrier = Barrier::new(THREADS);

    let outcomes: Vec<InitOutcome> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                scope.spawn(|| {
                    let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
                    barrier.wait();
                    rt.block_on(s.ensure_fhe_ready()).unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(s.encryptor().initialize_count(), 1);
    assert_eq!(outcomes.iter().filter(|o| **o == InitOutcome::Initialized).count(), 1);
    assert!(s.is_fhe_ready());
}

#[tokio::test]
async fn connect_refuses_a_different_registry() {
    let (chain, fhe) = deployment();
    let configured = ContractAddress::from_bytes([0xc1; 20]);
    let config = ClientConfig::local(configured).unwrap();
    let s = ClientSession::new(config, DevWallet::new(ALICE), chain, fhe.clone(), fhe.clone());

    let err = s.connect().await.unwrap_err();
    assert_eq!(
        err,
        ClientError::ContractMismatch {
            configured,
            deployed: ContractAddress::from_bytes([0xc0; 20]),
        }
    );
    assert_eq!(s.account(), None);
    assert!(!s.wallet().is_connected());
    assert_eq!(s.status().unwrap().level, StatusLevel::Error);
}

#[tokio::test]
async fn session_from_env_targets_the_configured_registry() {
    let (chain, fhe) = deployment();
    std::env::remove_var("UBI_CONTRACT_ADDRESS");
    let missing = ClientSession::from_env(DevWallet::new(ALICE), chain.clone(), fhe.clone(), fhe.clone());
    assert!(matches!(missing, Err(ClientError::Config(_))));

    std::env::set_var("UBI_CONTRACT_ADDRESS", chain.contract_address().to_hex());
    let s = ClientSession::from_env(DevWallet::new(ALICE), chain.clone(), fhe.clone(), fhe.clone());
    std::env::remove_var("UBI_CONTRACT_ADDRESS");
    let s = s.unwrap();

    assert_eq!(s.config().contract_address, chain.contract_address());
    assert_eq!(s.connect().await.unwrap(), ALICE);
}

#[tokio::test]
async fn disconnect_during_connect_leaves_nothing_behind() {
    let (chain, fhe) = deployment();
    let s = session(chain, &fhe, ALICE, fhe.clone());

    // Encryption setup yields, letting the disconnect land mid-connect.
    let (connected, ()) = tokio::join!(s.connect(), s.disconnect());
    assert_eq!(connected.unwrap_err(), ClientError::Disconnected);
    assert_eq!(s.account(), None);
    assert!(!s.is_fhe_ready());
    assert!(s.policies().is_empty());
    assert_eq!(s.status(), None);
}

#[tokio::test]
async fn disconnect_during_decryption_submits_nothing() {
    let (chain, fhe) = deployment();
    let s = session(chain.clone(), &fhe, ALICE, SlowDecryptor(fhe.clone()));
    s.connect().await.unwrap();
    s.create_policy(PolicyDraft::new("Commute", 80, 1_000)).await.unwrap();
    let blocks = chain.block_number();

    let (decrypted, ()) = tokio::join!(s.request_decryption(ALICE), s.disconnect());
    assert_eq!(decrypted.unwrap_err(), ClientError::Disconnected);
    assert_eq!(chain.block_number(), blocks);
    assert!(!chain.get_profile(&ALICE).await.unwrap().is_verified);
    assert_eq!(s.account(), None);
    assert!(s.policies().is_empty());
    assert_eq!(s.status(), None);
}

#[tokio::test]
async fn disconnect_clears_session_state() {
    let (chain, fhe) = deployment();
    let s = session(chain, &fhe, ALICE, fhe.clone());
    s.connect().await.unwrap();
    s.create_policy(PolicyDraft::new("Commute", 70, 1_000)).await.unwrap();

    s.disconnect().await;
    assert_eq!(s.account(), None);
    assert!(!s.is_fhe_ready());
    assert!(s.policies().is_empty());
    assert_eq!(s.status(), None);
    assert!(!s.wallet().is_connected());
}

// ── Policy creation ──────────────────────────────────────────────────

#[tokio::test]
async fn create_policy_registers_and_refreshes() {
    let (chain, fhe) = deployment();
    let s = session(chain.clone(), &fhe, ALICE, fhe.clone());
    s.connect().await.unwrap();

    s.create_policy(PolicyDraft::new("Daily commute", 80, 1_000).with_age(35))
        .await
        .unwrap();

    let policies = s.policies();
    assert_eq!(policies.len(), 1);
    assert_eq!(policies[0].id, ALICE);
    assert_eq!(policies[0].name, "Daily commute");
    assert_eq!(policies[0].age, 35);
    assert!(!policies[0].is_verified);
    assert_eq!(s.take_status().unwrap().level, StatusLevel::Success);
    assert_eq!(s.status(), None);

    let handles = chain.get_encrypted_data(&ALICE).await.unwrap();
    assert_eq!(fhe.plaintext(&handles.mileage), Some(80));
    assert_eq!(fhe.plaintext(&handles.speeding_events), Some(0));
}

#[tokio::test]
async fn rejected_signature_sets_status_and_creates_nothing() {
    let (chain, fhe) = deployment();
    let s = session(chain.clone(), &fhe, ALICE, fhe.clone());
    s.connect().await.unwrap();

    chain.reject_next_signature();
    let err = s
        .create_policy(PolicyDraft::new("Weekend", 60, 500))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), Some(ErrorKind::UserRejectedSigning));
    let status = s.status().unwrap();
    assert_eq!(status.level, StatusLevel::Error);
    assert_eq!(status.text, "Transaction rejected by user");
    assert!(!chain.with_registry(|r| r.has_profile(&ALICE)));
}

#[tokio::test]
async fn duplicate_policy_reports_submission_failure() {
    let (chain, fhe) = deployment();
    let s = session(chain, &fhe, ALICE, fhe.clone());
    s.connect().await.unwrap();
    s.create_policy(PolicyDraft::new("First", 60, 500)).await.unwrap();

    let err = s
        .create_policy(PolicyDraft::new("Second", 60, 500))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::ProfileAlreadyExists));
    assert!(s.status().unwrap().text.starts_with("Submission failed: "));
    assert_eq!(s.policies()[0].name, "First");
}

#[tokio::test]
async fn create_policy_requires_connection() {
    let (chain, fhe) = deployment();
    let s = session(chain, &fhe, ALICE, fhe.clone());

    let err = s
        .create_policy(PolicyDraft::new("Orphan", 60, 500))
        .await
        .unwrap_err();
    assert_eq!(err, ClientError::NotConnected);
    assert_eq!(s.status().unwrap().text, "Submission failed: wallet not connected");
}

// ── Loading ──────────────────────────────────────────────────────────

#[tokio::test]
async fn load_skips_profiles_that_fail_to_fetch() {
    let (chain, fhe) = deployment();
    for driver in [ALICE, BOB] {
        let s = session(chain.clone(), &fhe, driver, fhe.clone());
        s.connect().await.unwrap();
        s.create_policy(PolicyDraft::new("p", 50, 100)).await.unwrap();
    }

    let flaky = FlakyChain {
        inner: chain,
        broken_profiles: HashSet::from([ALICE]),
        fail_list: false,
    };
    let s = session(flaky, &fhe, BOB, fhe.clone());
    let policies = s.load_policies().await.unwrap();
    assert_eq!(policies.len(), 1);
    assert_eq!(policies[0].id, BOB);
}

#[tokio::test]
async fn list_failure_is_an_error() {
    let (chain, fhe) = deployment();
    let flaky = FlakyChain {
        inner: chain,
        broken_profiles: HashSet::new(),
        fail_list: true,
    };
    let s = session(flaky, &fhe, BOB, fhe.clone());

    let err = s.load_policies().await.unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::NetworkOrRpcFailure));
    assert_eq!(s.status().unwrap().level, StatusLevel::Error);
}

// ── Decryption ───────────────────────────────────────────────────────

#[tokio::test]
async fn decryption_verifies_and_then_takes_the_fast_path() {
    let (chain, fhe) = deployment();
    let s = session(chain.clone(), &fhe, ALICE, fhe.clone());
    s.connect().await.unwrap();
    s.create_policy(PolicyDraft::new("Commute", 80, 1_000)).await.unwrap();

    assert_eq!(s.request_decryption(ALICE).await.unwrap(), Some(80));
    let policy = &s.policies()[0];
    assert!(policy.is_verified);
    assert_eq!(policy.decrypted_score, Some(80));
    assert_eq!(policy.settlement_method, Some(SettlementMethod::ExternallyVerified));
    assert_eq!(s.status().unwrap().text, "Verified score: 80");

    let events = event_count(&chain);
    let blocks = chain.block_number();
    assert_eq!(s.request_decryption(ALICE).await.unwrap(), Some(80));
    assert_eq!(event_count(&chain), events);
    assert_eq!(chain.block_number(), blocks);
}

#[tokio::test]
async fn only_the_owner_can_settle() {
    let (chain, fhe) = deployment();
    let alice = session(chain.clone(), &fhe, ALICE, fhe.clone());
    let bob = session(chain, &fhe, BOB, fhe.clone());
    alice.connect().await.unwrap();
    bob.connect().await.unwrap();
    alice.create_policy(PolicyDraft::new("Commute", 66, 900)).await.unwrap();

    let err = bob.request_decryption(ALICE).await.unwrap_err();
    assert_eq!(err, ClientError::NotProfileOwner { id: ALICE, account: BOB });

    alice.request_decryption(ALICE).await.unwrap();
    assert_eq!(bob.request_decryption(ALICE).await.unwrap(), Some(66));
}

#[tokio::test]
async fn second_concurrent_decryption_is_busy() {
    let (chain, fhe) = deployment();
    let s = session(chain, &fhe, ALICE, SlowDecryptor(fhe.clone()));
    s.connect().await.unwrap();
    s.create_policy(PolicyDraft::new("Commute", 80, 1_000)).await.unwrap();

    let (first, second) = tokio::join!(s.request_decryption(ALICE), s.request_decryption(ALICE));
    assert_eq!(first.unwrap(), Some(80));
    assert_eq!(second.unwrap_err(), ClientError::Busy);

    // The flag is released once the first call finishes.
    assert_eq!(s.request_decryption(ALICE).await.unwrap(), Some(80));
}

#[tokio::test]
async fn concurrent_settlement_yields_no_new_value() {
    let (chain, fhe) = deployment();
    let racing = RacingDecryptor {
        fhe: fhe.clone(),
        chain: chain.clone(),
        driver: ALICE,
    };
    let s = session(chain, &fhe, ALICE, racing);
    s.connect().await.unwrap();
    s.create_policy(PolicyDraft::new("Commute", 80, 1_000)).await.unwrap();

    assert_eq!(s.request_decryption(ALICE).await.unwrap(), None);
    let policy = &s.policies()[0];
    assert!(policy.is_verified);
    assert_eq!(policy.settlement_method, Some(SettlementMethod::Computed));
    assert_eq!(s.status().unwrap().level, StatusLevel::Success);
}

#[tokio::test]
async fn missing_profile_fails_decryption() {
    let (chain, fhe) = deployment();
    let s = session(chain, &fhe, ALICE, fhe.clone());
    s.connect().await.unwrap();

    let err = s.request_decryption(BOB).await.unwrap_err();
    assert_eq!(
        err,
        ClientError::Chain(ChainError::Reverted(RegistryError::ProfileNotFound { driver: BOB }))
    );
    assert!(s.status().unwrap().text.starts_with("Decryption failed: "));
}

// ── On-chain computation ─────────────────────────────────────────────

#[tokio::test]
async fn onchain_computation_settles_with_formula_value() {
    let (chain, fhe) = deployment();
    let s = session(chain, &fhe, ALICE, fhe.clone());
    s.connect().await.unwrap();
    s.create_policy(
        PolicyDraft::new("Family car", 10_000, 1_000)
            .with_age(35)
            .with_vehicle_value(25_000)
            .with_speeding_events(3),
    )
    .await
    .unwrap();

    assert_eq!(s.request_onchain_computation().await.unwrap(), 52);
    let policy = &s.policies()[0];
    assert_eq!(policy.decrypted_score, Some(52));
    assert_eq!(policy.settlement_method, Some(SettlementMethod::Computed));

    let err = s.request_onchain_computation().await.unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::AlreadyVerified));
}
