//! Events emitted by the registry, in emission order.

use serde::{Deserialize, Serialize};
use ubi_core::{DriverAddress, Timestamp};

/// A registry log entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "PascalCase")]
pub enum RegistryEvent {
    /// A driver registered a profile.
    ProfileCreated {
        /// The new profile's owner.
        driver: DriverAddress,
        /// Block time of creation.
        timestamp: Timestamp,
    },
    /// The on-chain computation settled a profile.
    DiscountComputed {
        /// The profile's owner.
        driver: DriverAddress,
        /// The decrypted discount.
        discount: u32,
    },
    /// A KMS-proven decryption settled a profile.
    DecryptionVerified {
        /// The profile's owner.
        driver: DriverAddress,
        /// The proven clear value.
        discount: u32,
    },
}

impl RegistryEvent {
    /// The driver the event concerns.
    pub fn driver(&self) -> &DriverAddress {
        match self {
            Self::ProfileCreated { driver, .. }
            | Self::DiscountComputed { driver, .. }
            | Self::DecryptionVerified { driver, .. } => driver,
        }
    }

    /// Whether the event records a settlement.
    pub fn is_settlement(&self) -> bool {
        !matches!(self, Self::ProfileCreated { .. })
    }
}
