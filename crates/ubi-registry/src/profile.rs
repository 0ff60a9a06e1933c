//! # Driver Profile Lifecycle
//!
//! ## States
//!
//! ```text
//! Created ──▶ Verified (terminal)
//! ```
//!
//! The state is not stored separately: it is derived from `settlement`, so
//! `is_verified` and `decrypted_discount` can never disagree with the
//! recorded settlement.

use serde::{Deserialize, Serialize};
use ubi_core::{CiphertextHandle, DriverAddress, Timestamp};

use crate::error::RegistryError;

// ─── Profile State ───────────────────────────────────────────────────

/// The lifecycle state of a driver profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProfileState {
    /// Registered, discount not yet settled.
    Created,
    /// Discount settled (terminal).
    Verified,
}

impl ProfileState {
    /// Whether this state is terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Verified)
    }
}

impl std::fmt::Display for ProfileState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Created => "CREATED",
            Self::Verified => "VERIFIED",
        };
        f.write_str(s)
    }
}

// ─── Settlement ──────────────────────────────────────────────────────

/// Which path settled a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettlementMethod {
    /// `compute_discount`.
    Computed,
    /// `verify_decryption`.
    ExternallyVerified,
}

/// How a profile's discount was finalized, with provenance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum Settlement {
    /// Evaluated homomorphically, then decrypted by the contract.
    Computed {
        /// The decrypted discount.
        discount: u32,
        /// Block time of settlement.
        settled_at: Timestamp,
    },
    /// Supplied by the driver with a KMS decryption proof.
    ExternallyVerified {
        /// The proven clear value.
        discount: u32,
        /// Block time of settlement.
        settled_at: Timestamp,
        /// Digest of the accepted proof.
        proof_digest: String,
        /// Number of signatures carried by the proof.
        signer_count: usize,
    },
}

impl Settlement {
    /// The settled value.
    pub fn discount(&self) -> u32 {
        match self {
            Self::Computed { discount, .. } | Self::ExternallyVerified { discount, .. } => *discount,
        }
    }

    /// When the settlement happened.
    pub fn settled_at(&self) -> Timestamp {
        match self {
            Self::Computed { settled_at, .. } | Self::ExternallyVerified { settled_at, .. } => {
                *settled_at
            }
        }
    }

    /// Which path produced it.
    pub fn method(&self) -> SettlementMethod {
        match self {
            Self::Computed { .. } => SettlementMethod::Computed,
            Self::ExternallyVerified { .. } => SettlementMethod::ExternallyVerified,
        }
    }
}

// ─── Profile ─────────────────────────────────────────────────────────

/// Contract-owned record for one driver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverProfile {
    /// Identity key.
    pub driver: DriverAddress,
    /// Encrypted mileage.
    pub encrypted_mileage: CiphertextHandle,
    /// Encrypted count of speeding events.
    pub encrypted_speeding_events: CiphertextHandle,
    /// Driver age, plaintext.
    pub age: u32,
    /// Vehicle value, plaintext.
    pub vehicle_value: u32,
    /// Premium before discount, plaintext.
    pub base_premium: u32,
    /// Block time of creation.
    pub created_at: Timestamp,
    settlement: Option<Settlement>,
}

impl DriverProfile {
    /// A fresh, unsettled profile.
    pub fn new(
        driver: DriverAddress,
        encrypted_mileage: CiphertextHandle,
        encrypted_speeding_events: CiphertextHandle,
        age: u32,
        vehicle_value: u32,
        base_premium: u32,
        created_at: Timestamp,
    ) -> Self {
        Self {
            driver,
            encrypted_mileage,
            encrypted_speeding_events,
            age,
            vehicle_value,
            base_premium,
            created_at,
            settlement: None,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ProfileState {
        if self.settlement.is_some() {
            ProfileState::Verified
        } else {
            ProfileState::Created
        }
    }

    /// Whether the discount has been settled.
    pub fn is_verified(&self) -> bool {
        self.settlement.is_some()
    }

    /// The settled discount, or zero while unsettled.
    pub fn decrypted_discount(&self) -> u32 {
        self.settlement.as_ref().map_or(0, Settlement::discount)
    }

    /// The settlement record, if any.
    pub fn settlement(&self) -> Option<&Settlement> {
        self.settlement.as_ref()
    }

    /// Fail with `AlreadyVerified` unless the profile is still `Created`.
    pub fn require_unsettled(&self) -> Result<(), RegistryError> {
        if self.state().is_terminal() {
            return Err(RegistryError::AlreadyVerified {
                driver: self.driver,
            });
        }
        Ok(())
    }

    /// Settle the profile (CREATED → VERIFIED).
    pub fn settle(&mut self, settlement: Settlement) -> Result<(), RegistryError> {
        self.require_unsettled()?;
        self.settlement = Some(settlement);
        Ok(())
    }

    /// Public projection returned by the read operation.
    pub fn view(&self) -> ProfileView {
        ProfileView {
            driver: self.driver,
            age: self.age,
            vehicle_value: self.vehicle_value,
            base_premium: self.base_premium,
            created_at: self.created_at,
            decrypted_discount: self.decrypted_discount(),
            is_verified: self.is_verified(),
            settlement: self.settlement.clone(),
        }
    }

    /// The stored ciphertext handles.
    pub fn encrypted_data(&self) -> EncryptedData {
        EncryptedData {
            mileage: self.encrypted_mileage,
            speeding_events: self.encrypted_speeding_events,
        }
    }
}

/// Profile fields as returned by `get_profile`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileView {
    pub driver: DriverAddress,
    pub age: u32,
    pub vehicle_value: u32,
    pub base_premium: u32,
    pub created_at: Timestamp,
    pub decrypted_discount: u32,
    pub is_verified: bool,
    pub settlement: Option<Settlement>,
}

/// Ciphertext handles as returned by `get_encrypted_data`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedData {
    pub mileage: CiphertextHandle,
    pub speeding_events: CiphertextHandle,
}

// ─── Tests ───────────────────────────────────────────────────────────
