//! Encrypted inputs as produced by client-side encryption.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use ubi_core::{hex, CiphertextHandle};

/// Attestation that a ciphertext was produced for a given contract and user.
///
/// Opaque to the registry; only the library can check it.
#[derive(Clone, PartialEq, Eq)]
pub struct InputProof(pub Vec<u8>);

impl InputProof {
    /// Borrow the proof bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Debug for InputProof {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "InputProof({} bytes)", self.0.len())
    }
}

impl Serialize for InputProof {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode_prefixed(&self.0))
    }
}

impl<'de> Deserialize<'de> for InputProof {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(&s).map(Self).map_err(serde::de::Error::custom)
    }
}

/// A ciphertext handle together with its input proof, ready to be submitted
/// to the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedInput {
    /// Handle registered with the coprocessor.
    pub handle: CiphertextHandle,
    /// Proof binding the handle to contract and user.
    pub input_proof: InputProof,
}
