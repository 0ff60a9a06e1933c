//! # Decryption Proofs
//!
//! A public decryption is attested by the key-management service (KMS):
//! each KMS signer signs
//! `SHA-256(DOMAIN ‖ handle_0 ‖ … ‖ handle_n ‖ abi_encoded_clear_values)`
//! with Ed25519. The contract accepts the clear values only when at least
//! `threshold` distinct known signers produced a valid signature.
//!
//! Signer keys and signatures serialize as lowercase hex strings.

use std::collections::{BTreeMap, HashSet};

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use ubi_core::{hex, CiphertextHandle};

use crate::error::FheError;

const DOMAIN: &[u8] = b"ubi-public-decrypt-v1";

/// Digest signed by the KMS for one public decryption.
pub fn decryption_digest(handles: &[CiphertextHandle], abi_encoded_clear_values: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(DOMAIN);
    for h in handles {
        hasher.update(h.as_bytes());
    }
    hasher.update(abi_encoded_clear_values);
    hasher.finalize().into()
}

/// One KMS signer's Ed25519 signature over a decryption digest.
#[derive(Clone, PartialEq, Eq)]
pub struct KmsSignature {
    /// The signer's Ed25519 public key.
    pub signer: [u8; 32],
    /// The signature bytes.
    pub signature: [u8; 64],
}

impl KmsSignature {
    /// Sign a decryption digest.
    pub fn sign(key: &SigningKey, digest: &[u8; 32]) -> Self {
        Self {
            signer: key.verifying_key().to_bytes(),
            signature: key.sign(digest).to_bytes(),
        }
    }
}

impl std::fmt::Debug for KmsSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "KmsSignature(signer={}...)", &hex::encode(&self.signer)[..16])
    }
}

#[derive(Serialize, Deserialize)]
struct KmsSignatureRepr {
    signer: String,
    signature: String,
}

impl Serialize for KmsSignature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        KmsSignatureRepr {
            signer: hex::encode(&self.signer),
            signature: hex::encode(&self.signature),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for KmsSignature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let repr = KmsSignatureRepr::deserialize(deserializer)?;
        Ok(Self {
            signer: hex::decode_fixed::<32>(&repr.signer).map_err(serde::de::Error::custom)?,
            signature: hex::decode_fixed::<64>(&repr.signature).map_err(serde::de::Error::custom)?,
        })
    }
}

/// Proof accompanying publicly decrypted clear values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecryptionProof {
    /// KMS signatures, in any order.
    pub signatures: Vec<KmsSignature>,
}

impl DecryptionProof {
    /// Content digest of the proof, recorded as settlement provenance.
    pub fn digest_hex(&self) -> String {
        let mut hasher = Sha256::new();
        for s in &self.signatures {
            hasher.update(s.signer);
            hasher.update(s.signature);
        }
        hex::encode_prefixed(&hasher.finalize())
    }
}

/// Result of a public decryption request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecryptionBundle {
    /// Clear value per requested handle.
    pub clear_values: BTreeMap<CiphertextHandle, u32>,
    /// The same values as ABI words, in request order.
    #[serde(with = "hex_bytes")]
    pub abi_encoded_clear_values: Vec<u8>,
    /// KMS attestation over handles and clear values.
    pub decryption_proof: DecryptionProof,
}

/// Checks decryption proofs against a fixed KMS signer set.
#[derive(Debug, Clone)]
pub struct KmsVerifier {
    signers: Vec<VerifyingKey>,
    threshold: usize,
}

impl KmsVerifier {
    /// Build a verifier. A threshold of zero is raised to one.
    pub fn new(signers: Vec<VerifyingKey>, threshold: usize) -> Self {
        Self {
            signers,
            threshold: threshold.max(1),
        }
    }

    /// Number of distinct valid signatures required.
    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Verify `proof` over `handles` and `abi_encoded_clear_values`.
    pub fn verify(
        &self,
        handles: &[CiphertextHandle],
        abi_encoded_clear_values: &[u8],
        proof: &DecryptionProof,
    ) -> Result<(), FheError> {
        let digest = decryption_digest(handles, abi_encoded_clear_values);
        let mut counted: HashSet<[u8; 32]> = HashSet::new();
        for sig in &proof.signatures {
            if counted.contains(&sig.signer) {
                continue;
            }
            let Some(key) = self.signers.iter().find(|k| k.to_bytes() == sig.signer) else {
                continue;
            };
            if key.verify(&digest, &Signature::from_bytes(&sig.signature)).is_ok() {
                counted.insert(sig.signer);
            }
        }
        if counted.len() < self.threshold {
            return Err(FheError::SignatureCheck(format!(
                "{} valid KMS signatures, {} required",
                counted.len(),
                self.threshold
            )));
        }
        Ok(())
    }
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};
    use ubi_core::hex;

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode_prefixed(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(&s).map_err(serde::de::Error::custom)
    }
}
