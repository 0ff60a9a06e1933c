//! # Driver Registry
//!
//! The contract itself: a map from driver address to profile, the
//! append-only list of registered drivers, and the event log.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use ubi_core::{ContractAddress, DriverAddress, Timestamp};
use ubi_fhe::{abi, DecryptionProof, EncryptedInput, FheExecutor};

use crate::discount;
use crate::error::RegistryError;
use crate::events::RegistryEvent;
use crate::profile::{DriverProfile, EncryptedData, ProfileView, Settlement};

/// Transaction context: who is calling and at what block time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallContext {
    /// The transaction sender.
    pub caller: DriverAddress,
    /// Timestamp of the including block.
    pub block_timestamp: Timestamp,
}

/// Arguments of `create_profile`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProfile {
    pub encrypted_mileage: EncryptedInput,
    pub encrypted_speeding_events: EncryptedInput,
    pub age: u32,
    pub vehicle_value: u32,
    pub base_premium: u32,
}

/// The registry contract, generic over the encryption library binding.
#[derive(Debug)]
pub struct DriverRegistry<F> {
    address: ContractAddress,
    fhe: F,
    profiles: HashMap<DriverAddress, DriverProfile>,
    drivers: Vec<DriverAddress>,
    events: Vec<RegistryEvent>,
}

impl<F: FheExecutor> DriverRegistry<F> {
    /// Deploy an empty registry at `address`.
    pub fn new(address: ContractAddress, fhe: F) -> Self {
        Self {
            address,
            fhe,
            profiles: HashMap::new(),
            drivers: Vec::new(),
            events: Vec::new(),
        }
    }

    /// The contract's own address.
    pub fn address(&self) -> &ContractAddress {
        &self.address
    }

    /// The encryption library binding.
    pub fn fhe(&self) -> &F {
        &self.fhe
    }

    // ── Mutating operations ──────────────────────────────────────────

    /// Register the caller's profile.
    pub fn create_profile(
        &mut self,
        ctx: &CallContext,
        req: CreateProfile,
    ) -> Result<(), RegistryError> {
        if self.profiles.contains_key(&ctx.caller) {
            return Err(RegistryError::ProfileAlreadyExists { driver: ctx.caller });
        }

        let mileage = self
            .fhe
            .verify_input(&req.encrypted_mileage, &self.address, &ctx.caller)
            .map_err(|e| RegistryError::InvalidCiphertext {
                field: "encrypted_mileage",
                reason: e.to_string(),
            })?;
        let speeding = self
            .fhe
            .verify_input(&req.encrypted_speeding_events, &self.address, &ctx.caller)
            .map_err(|e| RegistryError::InvalidCiphertext {
                field: "encrypted_speeding_events",
                reason: e.to_string(),
            })?;

        for handle in [&mileage, &speeding] {
            self.fhe.allow_this(handle, &self.address)?;
            self.fhe.make_publicly_decryptable(handle)?;
        }

        self.profiles.insert(
            ctx.caller,
            DriverProfile::new(
                ctx.caller,
                mileage,
                speeding,
                req.age,
                req.vehicle_value,
                req.base_premium,
                ctx.block_timestamp,
            ),
        );
        self.drivers.push(ctx.caller);
        self.events.push(RegistryEvent::ProfileCreated {
            driver: ctx.caller,
            timestamp: ctx.block_timestamp,
        });
        tracing::info!(driver = %ctx.caller, "driver profile created");
        Ok(())
    }

    /// Evaluate the discount over the caller's ciphertexts, decrypt it and
    /// settle the profile with the result.
    pub fn compute_discount(&mut self, ctx: &CallContext) -> Result<u32, RegistryError> {
        let profile = self.profile(&ctx.caller)?;
        profile.require_unsettled()?;

        let total = discount::encrypted_discount(&self.fhe, profile)?;
        let value = self.fhe.decrypt(&total)?;

        self.settle(
            &ctx.caller,
            Settlement::Computed {
                discount: value,
                settled_at: ctx.block_timestamp,
            },
        )?;
        self.events.push(RegistryEvent::DiscountComputed {
            driver: ctx.caller,
            discount: value,
        });
        tracing::info!(driver = %ctx.caller, discount = value, "discount computed on-chain");
        Ok(value)
    }

    /// Settle the caller's profile with an externally decrypted value and
    /// its KMS proof. The proof must cover the mileage handle.
    pub fn verify_decryption(
        &mut self,
        ctx: &CallContext,
        abi_encoded_clear_values: &[u8],
        decryption_proof: &DecryptionProof,
    ) -> Result<u32, RegistryError> {
        let profile = self.profile(&ctx.caller)?;
        profile.require_unsettled()?;

        let handles = [profile.encrypted_mileage];
        self.fhe
            .check_signatures(&handles, abi_encoded_clear_values, decryption_proof)
            .map_err(|e| RegistryError::SignatureCheckFailed(e.to_string()))?;
        let value = abi::decode_single_u32(abi_encoded_clear_values)
            .map_err(|e| RegistryError::MalformedClearValues(e.to_string()))?;

        self.settle(
            &ctx.caller,
            Settlement::ExternallyVerified {
                discount: value,
                settled_at: ctx.block_timestamp,
                proof_digest: decryption_proof.digest_hex(),
                signer_count: decryption_proof.signatures.len(),
            },
        )?;
        self.events.push(RegistryEvent::DecryptionVerified {
            driver: ctx.caller,
            discount: value,
        });
        tracing::info!(driver = %ctx.caller, discount = value, "decryption proof verified");
        Ok(value)
    }

    // ── Read operations ──────────────────────────────────────────────

    /// Public fields of a driver's profile.
    pub fn get_profile(&self, driver: &DriverAddress) -> Result<ProfileView, RegistryError> {
        self.profile(driver).map(DriverProfile::view)
    }

    /// Ciphertext handles of a driver's profile.
    pub fn get_encrypted_data(&self, driver: &DriverAddress) -> Result<EncryptedData, RegistryError> {
        self.profile(driver).map(DriverProfile::encrypted_data)
    }

    /// Every registered driver, in registration order.
    pub fn list_drivers(&self) -> &[DriverAddress] {
        &self.drivers
    }

    /// Whether `driver` has a profile.
    pub fn has_profile(&self, driver: &DriverAddress) -> bool {
        self.profiles.contains_key(driver)
    }

    /// Number of registered drivers.
    pub fn driver_count(&self) -> usize {
        self.drivers.len()
    }

    /// The event log, oldest first.
    pub fn events(&self) -> &[RegistryEvent] {
        &self.events
    }

    fn profile(&self, driver: &DriverAddress) -> Result<&DriverProfile, RegistryError> {
        self.profiles
            .get(driver)
            .ok_or(RegistryError::ProfileNotFound { driver: *driver })
    }

    fn settle(&mut self, driver: &DriverAddress, settlement: Settlement) -> Result<(), RegistryError> {
        self.profiles
            .get_mut(driver)
            .ok_or(RegistryError::ProfileNotFound { driver: *driver })?
            .settle(settlement)
    }
}

// ─── Tests ───────────────────────────────────────────────────────────
