//! # Mock Coprocessor
//!
//! A deterministic, transparent stand-in for the encryption library. Handles
//! are SHA-256 derived identifiers pointing at plaintexts in a shared table;
//! "encryption" registers a plaintext and "decryption" reads it back.
//!
//! ## Security Notice
//!
//! This implementation provides NO confidentiality. Input proofs are keyed
//! hashes and the KMS is a single in-process Ed25519 key. Use it for tests
//! and local runs only.
//!
//! One `MockFhe` value plays every role: clones share the same table, so the
//! registry (as `FheExecutor`) and the client session (as `InputEncryptor`
//! and `PublicDecryptor`) observe the same ciphertexts.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use ed25519_dalek::{SigningKey, VerifyingKey};
use parking_lot::RwLock;
use sha2::{Digest, Sha256};
use ubi_core::{CiphertextHandle, ContractAddress, DriverAddress};

use crate::abi;
use crate::error::FheError;
use crate::input::{EncryptedInput, InputProof};
use crate::proof::{decryption_digest, DecryptionBundle, DecryptionProof, KmsSignature, KmsVerifier};
use crate::traits::{FheExecutor, InputEncryptor, PublicDecryptor};

#[derive(Debug, Default)]
struct MockState {
    values: HashMap<CiphertextHandle, u32>,
    allowed: HashMap<CiphertextHandle, HashSet<ContractAddress>>,
    public: HashSet<CiphertextHandle>,
    next_id: u64,
}

/// Transparent mock coprocessor. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct MockFhe {
    state: Arc<RwLock<MockState>>,
    kms: Arc<SigningKey>,
    input_secret: [u8; 32],
    initialized: Arc<AtomicBool>,
    init_calls: Arc<AtomicUsize>,
}

impl std::fmt::Debug for MockFhe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockFhe")
            .field("ciphertexts", &self.state.read().values.len())
            .field("initialized", &self.initialized.load(Ordering::SeqCst))
            .finish()
    }
}

impl Default for MockFhe {
    fn default() -> Self {
        Self::new()
    }
}

impl MockFhe {
    /// Create a coprocessor with a random KMS key.
    pub fn new() -> Self {
        let kms = SigningKey::generate(&mut rand::rngs::OsRng);
        let input_secret: [u8; 32] = Sha256::digest(kms.to_bytes()).into();
        Self::with_key(kms, input_secret)
    }

    /// Create a coprocessor with a KMS key derived from `seed`.
    pub fn from_seed(seed: [u8; 32]) -> Self {
        let kms = SigningKey::from_bytes(&seed);
        let input_secret: [u8; 32] = Sha256::digest(seed).into();
        Self::with_key(kms, input_secret)
    }

    fn with_key(kms: SigningKey, input_secret: [u8; 32]) -> Self {
        Self {
            state: Arc::new(RwLock::new(MockState::default())),
            kms: Arc::new(kms),
            input_secret,
            initialized: Arc::new(AtomicBool::new(false)),
            init_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// The KMS public key a verifier must trust.
    pub fn kms_verifying_key(&self) -> VerifyingKey {
        self.kms.verifying_key()
    }

    /// How many times `initialize()` ran.
    pub fn initialize_count(&self) -> usize {
        self.init_calls.load(Ordering::SeqCst)
    }

    /// Read the plaintext behind a handle. Transparent by construction.
    pub fn plaintext(&self, handle: &CiphertextHandle) -> Option<u32> {
        self.state.read().values.get(handle).copied()
    }

    /// Whether `contract` was granted access to `handle`.
    pub fn is_allowed(&self, handle: &CiphertextHandle, contract: &ContractAddress) -> bool {
        self.state
            .read()
            .allowed
            .get(handle)
            .is_some_and(|set| set.contains(contract))
    }

    /// Whether `handle` was marked publicly decryptable.
    pub fn is_publicly_decryptable(&self, handle: &CiphertextHandle) -> bool {
        self.state.read().public.contains(handle)
    }

    fn input_proof(
        &self,
        handle: &CiphertextHandle,
        contract: &ContractAddress,
        user: &DriverAddress,
    ) -> InputProof {
        let mut hasher = Sha256::new();
        hasher.update(b"ubi-mock-input");
        hasher.update(handle.as_bytes());
        hasher.update(contract.as_bytes());
        hasher.update(user.as_bytes());
        hasher.update(self.input_secret);
        InputProof(hasher.finalize().to_vec())
    }

    fn store(&self, value: u32) -> CiphertextHandle {
        let mut state = self.state.write();
        state.next_id += 1;
        let mut hasher = Sha256::new();
        hasher.update(b"ubi-mock-handle");
        hasher.update(state.next_id.to_be_bytes());
        hasher.update(self.input_secret);
        let handle = CiphertextHandle::from_bytes(hasher.finalize().into());
        state.values.insert(handle, value);
        handle
    }

    fn load(&self, handle: &CiphertextHandle) -> Result<u32, FheError> {
        self.plaintext(handle).ok_or(FheError::UnknownHandle(*handle))
    }

    fn unary(
        &self,
        a: &CiphertextHandle,
        op: impl FnOnce(u32) -> Result<u32, FheError>,
    ) -> Result<CiphertextHandle, FheError> {
        let v = op(self.load(a)?)?;
        Ok(self.store(v))
    }
}

impl FheExecutor for MockFhe {
    fn verify_input(
        &self,
        input: &EncryptedInput,
        contract: &ContractAddress,
        user: &DriverAddress,
    ) -> Result<CiphertextHandle, FheError> {
        self.load(&input.handle)
            .map_err(|_| FheError::InvalidInputProof(format!("unknown handle {}", input.handle)))?;
        if self.input_proof(&input.handle, contract, user) != input.input_proof {
            return Err(FheError::InvalidInputProof(format!(
                "proof does not bind {} to contract {contract} and user {user}",
                input.handle
            )));
        }
        Ok(input.handle)
    }

    fn add(&self, a: &CiphertextHandle, b: &CiphertextHandle) -> Result<CiphertextHandle, FheError> {
        let rhs = self.load(b)?;
        self.unary(a, |v| Ok(v.wrapping_add(rhs)))
    }

    fn sub(&self, a: &CiphertextHandle, b: &CiphertextHandle) -> Result<CiphertextHandle, FheError> {
        let rhs = self.load(b)?;
        self.unary(a, |v| Ok(v.wrapping_sub(rhs)))
    }

    fn add_scalar(&self, a: &CiphertextHandle, rhs: u32) -> Result<CiphertextHandle, FheError> {
        self.unary(a, |v| Ok(v.wrapping_add(rhs)))
    }

    fn mul_scalar(&self, a: &CiphertextHandle, rhs: u32) -> Result<CiphertextHandle, FheError> {
        self.unary(a, |v| Ok(v.wrapping_mul(rhs)))
    }

    fn div_scalar(&self, a: &CiphertextHandle, rhs: u32) -> Result<CiphertextHandle, FheError> {
        self.unary(a, |v| v.checked_div(rhs).ok_or(FheError::DivisionByZero))
    }

    fn allow_this(&self, handle: &CiphertextHandle, contract: &ContractAddress) -> Result<(), FheError> {
        let mut state = self.state.write();
        if !state.values.contains_key(handle) {
            return Err(FheError::UnknownHandle(*handle));
        }
        state.allowed.entry(*handle).or_default().insert(*contract);
        Ok(())
    }

    fn make_publicly_decryptable(&self, handle: &CiphertextHandle) -> Result<(), FheError> {
        let mut state = self.state.write();
        if !state.values.contains_key(handle) {
            return Err(FheError::UnknownHandle(*handle));
        }
        state.public.insert(*handle);
        Ok(())
    }

    fn decrypt(&self, handle: &CiphertextHandle) -> Result<u32, FheError> {
        self.load(handle)
    }

    fn check_signatures(
        &self,
        handles: &[CiphertextHandle],
        abi_encoded_clear_values: &[u8],
        proof: &DecryptionProof,
    ) -> Result<(), FheError> {
        KmsVerifier::new(vec![self.kms_verifying_key()], 1).verify(
            handles,
            abi_encoded_clear_values,
            proof,
        )
    }
}

impl InputEncryptor for MockFhe {
    async fn initialize(&self) -> Result<(), FheError> {
        self.init_calls.fetch_add(1, Ordering::SeqCst);
        // Let concurrent callers interleave, as a real key download would.
        tokio::task::yield_now().await;
        self.initialized.store(true, Ordering::SeqCst);
        tracing::debug!("mock encryption context initialized");
        Ok(())
    }

    async fn encrypt_u32(
        &self,
        contract: &ContractAddress,
        user: &DriverAddress,
        value: u32,
    ) -> Result<EncryptedInput, FheError> {
        if !self.initialized.load(Ordering::SeqCst) {
            return Err(FheError::NotInitialized);
        }
        let handle = self.store(value);
        Ok(EncryptedInput {
            handle,
            input_proof: self.input_proof(&handle, contract, user),
        })
    }
}

impl PublicDecryptor for MockFhe {
    async fn public_decrypt(
        &self,
        handles: &[CiphertextHandle],
        _contract: &ContractAddress,
    ) -> Result<DecryptionBundle, FheError> {
        let mut clear = Vec::with_capacity(handles.len());
        {
            let state = self.state.read();
            for h in handles {
                let v = state.values.get(h).copied().ok_or(FheError::UnknownHandle(*h))?;
                if !state.public.contains(h) {
                    return Err(FheError::NotPubliclyDecryptable(*h));
                }
                clear.push(v);
            }
        }
        let abi_encoded_clear_values = abi::encode_u32s(&clear);
        let digest = decryption_digest(handles, &abi_encoded_clear_values);
        tracing::debug!(handles = handles.len(), "mock public decryption signed");
        Ok(DecryptionBundle {
            clear_values: handles.iter().copied().zip(clear).collect::<BTreeMap<_, _>>(),
            abi_encoded_clear_values,
            decryption_proof: DecryptionProof {
                signatures: vec![KmsSignature::sign(&self.kms, &digest)],
            },
        })
    }
}
