//! Client-side policy records.
//!
//! A policy is the session's rendering of one on-chain driver profile, plus
//! a display name that only lives in the session that created it.

use serde::{Deserialize, Serialize};
use ubi_core::{DriverAddress, Timestamp};
use ubi_registry::{ProfileView, SettlementMethod};

/// A driver profile as the session presents it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Policy {
    /// The owning driver; also the policy's identifier.
    pub id: DriverAddress,
    /// Display name.
    pub name: String,
    pub base_premium: u32,
    pub age: u32,
    pub vehicle_value: u32,
    pub created_at: Timestamp,
    pub is_verified: bool,
    /// The settled discount score, once verified.
    pub decrypted_score: Option<u32>,
    /// Which path settled the profile, once verified.
    pub settlement_method: Option<SettlementMethod>,
}

impl Policy {
    /// Build from a profile read off the chain. Without a locally stored
    /// label the name falls back to the owner's short address.
    pub fn from_view(view: &ProfileView, label: Option<&str>) -> Self {
        let name = match label {
            Some(label) => label.to_string(),
            None => format!("Policy {}", view.driver.short()),
        };
        Self {
            id: view.driver,
            name,
            base_premium: view.base_premium,
            age: view.age,
            vehicle_value: view.vehicle_value,
            created_at: view.created_at,
            is_verified: view.is_verified,
            decrypted_score: view.is_verified.then_some(view.decrypted_discount),
            settlement_method: view.settlement.as_ref().map(|s| s.method()),
        }
    }
}

/// Input to [`ClientSession::create_policy`](crate::ClientSession::create_policy).
///
/// `raw_score` is encrypted into the profile's mileage slot and
/// `speeding_events` into its speeding slot; the rest travels in the clear.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyDraft {
    pub name: String,
    pub raw_score: u32,
    pub base_premium: u32,
    pub age: u32,
    pub vehicle_value: u32,
    pub speeding_events: u32,
}

impl PolicyDraft {
    /// A draft with no age, vehicle or speeding data.
    pub fn new(name: impl Into<String>, raw_score: u32, base_premium: u32) -> Self {
        Self {
            name: name.into(),
            raw_score,
            base_premium,
            age: 0,
            vehicle_value: 0,
            speeding_events: 0,
        }
    }

    pub fn with_age(mut self, age: u32) -> Self {
        self.age = age;
        self
    }

    pub fn with_vehicle_value(mut self, vehicle_value: u32) -> Self {
        self.vehicle_value = vehicle_value;
        self
    }

    pub fn with_speeding_events(mut self, speeding_events: u32) -> Self {
        self.speeding_events = speeding_events;
        self
    }
}
