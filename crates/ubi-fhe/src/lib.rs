//! # ubi-fhe: Delegated Homomorphic Encryption
//!
//! The registry never implements cryptography. Everything it needs from the
//! encryption library goes through the capability traits defined here, so a
//! real coprocessor binding and the mock are interchangeable.
//!
//! ## Architecture
//!
//! - **Traits** (`traits.rs`): `FheExecutor` is what the contract calls
//!   (input validation, ciphertext arithmetic, access grants, decryption,
//!   signature checks). `InputEncryptor` and `PublicDecryptor` are what the
//!   client session calls.
//!
//! - **ABI** (`abi.rs`): clear values travel as 32-byte big-endian words,
//!   the layout the contract decodes after a signature check.
//!
//! - **Proofs** (`proof.rs`): a decryption proof is a set of Ed25519 KMS
//!   signatures over the handle list and the ABI-encoded clear values.
//!
//! - **Mock** (`mock.rs`): `MockFhe` is a transparent coprocessor. Handles
//!   map to plaintexts in a shared table. It provides NO confidentiality and
//!   exists for tests and local runs.
//!
//! ## Arithmetic semantics
//!
//! Encrypted integers are `u32`. Addition, subtraction and scalar
//! multiplication wrap modulo 2^32. Scalar division truncates; dividing by a
//! plaintext zero is rejected.

pub mod abi;
pub mod error;
pub mod input;
#[cfg(feature = "mock")]
pub mod mock;
pub mod proof;
pub mod traits;

pub use error::FheError;
pub use input::{EncryptedInput, InputProof};
#[cfg(feature = "mock")]
pub use mock::MockFhe;
pub use proof::{DecryptionBundle, DecryptionProof, KmsSignature, KmsVerifier};
pub use traits::{FheExecutor, InputEncryptor, PublicDecryptor};
