//! # Identity Newtypes
//!
//! Newtype wrappers for the identifiers flowing between the client, the
//! registry contract and the encryption library. They prevent identifier
//! confusion: a `CiphertextHandle` cannot be passed where a `DriverAddress`
//! is expected, and the contract's own address cannot be mistaken for a
//! driver.
//!
//! All three serialize as `0x`-prefixed lowercase hex strings.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::UbiError;
use crate::hex;

macro_rules! hex_newtype {
    ($(#[$meta:meta])* $name:ident, $len:expr) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(pub [u8; $len]);

        impl $name {
            /// Width of the identifier in bytes.
            pub const LEN: usize = $len;

            /// Wrap raw bytes.
            pub const fn from_bytes(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }

            /// Borrow the raw bytes.
            pub fn as_bytes(&self) -> &[u8; $len] {
                &self.0
            }

            /// Parse from hex, with or without the `0x` prefix.
            pub fn from_hex(s: &str) -> Result<Self, UbiError> {
                hex::decode_fixed::<$len>(s).map(Self)
            }

            /// Render as `0x`-prefixed lowercase hex.
            pub fn to_hex(&self) -> String {
                hex::encode_prefixed(&self.0)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.to_hex())
            }
        }

        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}({})", stringify!($name), self.to_hex())
            }
        }

        impl std::str::FromStr for $name {
            type Err = UbiError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::from_hex(s)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_hex())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                Self::from_hex(&s).map_err(serde::de::Error::custom)
            }
        }
    };
}

hex_newtype!(
    /// Address of a driver account (20 bytes). Keys one profile in the registry.
    DriverAddress,
    20
);

hex_newtype!(
    /// Address of a deployed registry contract (20 bytes).
    ContractAddress,
    20
);

hex_newtype!(
    /// Opaque reference to an encrypted value held by the encryption
    /// library (32 bytes). Never the plaintext itself.
    CiphertextHandle,
    32
);

impl DriverAddress {
    /// Abbreviated form for labels, e.g. `0x1234…abcd`.
    pub fn short(&self) -> String {
        let full = self.to_hex();
        format!("{}…{}", &full[..6], &full[full.len() - 4..])
    }
}
