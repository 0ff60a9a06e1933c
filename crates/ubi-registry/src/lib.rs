//! # ubi-registry: Driver Profile Registry Contract
//!
//! Holds one profile per driver address. Mileage and speeding events are
//! stored as ciphertext handles; age, vehicle value and base premium are
//! plaintext. A profile is settled exactly once, by one of two paths:
//!
//! ```text
//!            compute_discount ──▶ Verified (Settlement::Computed)
//! Created ──┤
//!            verify_decryption ─▶ Verified (Settlement::ExternallyVerified)
//! ```
//!
//! Both paths converge on the same `is_verified` flag; the settlement
//! variant records which one ran.
//!
//! ## Execution model
//!
//! Every mutating operation validates completely before it writes, so a
//! failed call leaves the registry untouched, mirroring a reverted
//! transaction. `CallContext` supplies the caller and block time.
//!
//! ## Privacy note
//!
//! `compute_discount` evaluates the formula over ciphertexts but then
//! decrypts and stores the final value in the clear. That is the observed
//! behavior of the deployed contract and is kept as is.

pub mod discount;
pub mod error;
pub mod events;
pub mod profile;
pub mod registry;

pub use error::RegistryError;
pub use events::RegistryEvent;
pub use profile::{DriverProfile, EncryptedData, ProfileState, ProfileView, Settlement, SettlementMethod};
pub use registry::{CallContext, CreateProfile, DriverRegistry};
