//! # ubi-core: Foundational Types for the Insurance Registry
//!
//! Leaf crate of the workspace. Every other `ubi-*` crate depends on it; it
//! depends on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for identifiers.** `DriverAddress`, `ContractAddress`
//!    and `CiphertextHandle` are distinct types. A handle cannot be passed
//!    where an address is expected, and a contract address cannot stand in
//!    for a driver.
//!
//! 2. **One error taxonomy.** `ErrorKind` enumerates the failure kinds every
//!    layer reports to the user. Crate-local error enums map onto it through
//!    a `kind()` method so the client can branch on kind, not on strings.
//!
//! 3. **UTC-only timestamps.** `Timestamp` carries block time at seconds
//!    precision.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `ubi-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod error;
pub mod hex;
pub mod identity;
pub mod temporal;

pub use error::{ErrorKind, UbiError};
pub use identity::{CiphertextHandle, ContractAddress, DriverAddress};
pub use temporal::Timestamp;
