//! # Encryption Capability Traits
//!
//! Three seams into the encryption library:
//!
//! - [`FheExecutor`]: called by the registry contract while executing a
//!   transaction. Synchronous: a contract call is straight-line code.
//! - [`InputEncryptor`]: called by the client to initialize the library
//!   context and encrypt plaintext inputs for a given contract and user.
//! - [`PublicDecryptor`]: called by the client to obtain clear values plus
//!   a KMS proof for publicly decryptable handles.
//!
//! The client-side traits use `async fn`; they are consumed through
//! generics, never as trait objects.

use ubi_core::{CiphertextHandle, ContractAddress, DriverAddress};

use crate::error::FheError;
use crate::input::EncryptedInput;
use crate::proof::{DecryptionBundle, DecryptionProof};

/// Contract-side access to encrypted `u32` values.
pub trait FheExecutor {
    /// Validate an encrypted input against its proof for `contract` and
    /// `user`, returning the handle the contract may use.
    fn verify_input(
        &self,
        input: &EncryptedInput,
        contract: &ContractAddress,
        user: &DriverAddress,
    ) -> Result<CiphertextHandle, FheError>;

    /// `a + b`, wrapping.
    fn add(&self, a: &CiphertextHandle, b: &CiphertextHandle) -> Result<CiphertextHandle, FheError>;

    /// `a - b`, wrapping.
    fn sub(&self, a: &CiphertextHandle, b: &CiphertextHandle) -> Result<CiphertextHandle, FheError>;

    /// `a + rhs` with a plaintext right operand, wrapping.
    fn add_scalar(&self, a: &CiphertextHandle, rhs: u32) -> Result<CiphertextHandle, FheError>;

    /// `a * rhs` with a plaintext right operand, wrapping.
    fn mul_scalar(&self, a: &CiphertextHandle, rhs: u32) -> Result<CiphertextHandle, FheError>;

    /// `a / rhs` with a plaintext divisor, truncating.
    fn div_scalar(&self, a: &CiphertextHandle, rhs: u32) -> Result<CiphertextHandle, FheError>;

    /// Grant `contract` persistent access to `handle`.
    fn allow_this(&self, handle: &CiphertextHandle, contract: &ContractAddress) -> Result<(), FheError>;

    /// Allow anyone to request a public decryption of `handle`.
    fn make_publicly_decryptable(&self, handle: &CiphertextHandle) -> Result<(), FheError>;

    /// Decrypt through the library's decryption request path.
    fn decrypt(&self, handle: &CiphertextHandle) -> Result<u32, FheError>;

    /// Check a KMS decryption proof over `handles` and the ABI-encoded
    /// clear values.
    fn check_signatures(
        &self,
        handles: &[CiphertextHandle],
        abi_encoded_clear_values: &[u8],
        proof: &DecryptionProof,
    ) -> Result<(), FheError>;
}

/// Client-side input encryption.
#[allow(async_fn_in_trait)]
pub trait InputEncryptor {
    /// Load keys and prepare the library context.
    async fn initialize(&self) -> Result<(), FheError>;

    /// Encrypt `value` so that only `contract`, on behalf of `user`, can
    /// consume it.
    async fn encrypt_u32(
        &self,
        contract: &ContractAddress,
        user: &DriverAddress,
        value: u32,
    ) -> Result<EncryptedInput, FheError>;
}

/// Client-side public decryption with a verifiable proof.
#[allow(async_fn_in_trait)]
pub trait PublicDecryptor {
    /// Decrypt `handles`, returning clear values, their ABI encoding in
    /// request order, and the KMS proof.
    async fn public_decrypt(
        &self,
        handles: &[CiphertextHandle],
        contract: &ContractAddress,
    ) -> Result<DecryptionBundle, FheError>;
}
