//! # Discount Formula
//!
//! ```text
//! mileage_discount = mileage * 5 / 1000
//! speeding_penalty = speeding_events * 2
//! net              = mileage_discount - speeding_penalty
//! total            = net + bonus(age, vehicle_value)
//! ```
//!
//! The first three lines run over ciphertexts with the encryption library's
//! `u32` semantics: wrapping subtraction, truncating division. A penalty
//! larger than the mileage discount therefore wraps around rather than
//! clamping at zero. The bonus is computed in the clear and added
//! homomorphically.

use ubi_core::CiphertextHandle;
use ubi_fhe::{FheError, FheExecutor};

use crate::profile::DriverProfile;

/// Numerator of the per-mile discount rate.
pub const MILEAGE_RATE_NUMERATOR: u32 = 5;
/// Denominator of the per-mile discount rate.
pub const MILEAGE_RATE_DENOMINATOR: u32 = 1000;
/// Penalty per recorded speeding event.
pub const SPEEDING_PENALTY_PER_EVENT: u32 = 2;
/// Drivers strictly older than this earn the age bonus.
pub const AGE_BONUS_THRESHOLD: u32 = 30;
/// Age bonus.
pub const AGE_BONUS: u32 = 5;
/// Vehicles valued strictly above this earn the vehicle bonus.
pub const VEHICLE_BONUS_THRESHOLD: u32 = 20_000;
/// Vehicle bonus.
pub const VEHICLE_BONUS: u32 = 3;

/// Plaintext part of the discount.
pub fn plaintext_bonus(age: u32, vehicle_value: u32) -> u32 {
    let mut bonus = 0;
    if age > AGE_BONUS_THRESHOLD {
        bonus += AGE_BONUS;
    }
    if vehicle_value > VEHICLE_BONUS_THRESHOLD {
        bonus += VEHICLE_BONUS;
    }
    bonus
}

/// Evaluate the full formula for `profile`, returning the handle of the
/// encrypted total.
pub fn encrypted_discount<F: FheExecutor>(
    fhe: &F,
    profile: &DriverProfile,
) -> Result<CiphertextHandle, FheError> {
    let scaled = fhe.mul_scalar(&profile.encrypted_mileage, MILEAGE_RATE_NUMERATOR)?;
    let mileage_discount = fhe.div_scalar(&scaled, MILEAGE_RATE_DENOMINATOR)?;
    let speeding_penalty =
        fhe.mul_scalar(&profile.encrypted_speeding_events, SPEEDING_PENALTY_PER_EVENT)?;
    let net = fhe.sub(&mileage_discount, &speeding_penalty)?;
    fhe.add_scalar(&net, plaintext_bonus(profile.age, profile.vehicle_value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ubi_core::{ContractAddress, DriverAddress, Timestamp};
    use ubi_fhe::{InputEncryptor, MockFhe};

    /// The same formula over plaintexts.
    fn reference(mileage: u32, speeding: u32, age: u32, vehicle_value: u32) -> u32 {
        (mileage.wrapping_mul(5) / 1000)
            .wrapping_sub(speeding.wrapping_mul(2))
            .wrapping_add(plaintext_bonus(age, vehicle_value))
    }

    async fn evaluate(mileage: u32, speeding: u32, age: u32, vehicle_value: u32) -> u32 {
        let fhe = MockFhe::from_seed([1u8; 32]);
        fhe.initialize().await.unwrap();
        let contract = ContractAddress::from_bytes([0xc0; 20]);
        let driver = DriverAddress::from_bytes([0xd0; 20]);
        let m = fhe.encrypt_u32(&contract, &driver, mileage).await.unwrap().handle;
        let s = fhe.encrypt_u32(&contract, &driver, speeding).await.unwrap().handle;
        let profile = DriverProfile::new(
            driver,
            m,
            s,
            age,
            vehicle_value,
            1_000,
            Timestamp::from_epoch_secs(0).unwrap(),
        );
        let h = encrypted_discount(&fhe, &profile).unwrap();
        fhe.decrypt(&h).unwrap()
    }

    #[test]
    fn bonus_thresholds_are_strict() {
        assert_eq!(plaintext_bonus(30, 20_000), 0);
        assert_eq!(plaintext_bonus(31, 20_000), 5);
        assert_eq!(plaintext_bonus(30, 20_001), 3);
        assert_eq!(plaintext_bonus(45, 50_000), 8);
    }

    #[tokio::test]
    async fn typical_driver() {
        // 10000 * 5 / 1000 = 50; 50 - 3*2 = 44; + 5 + 3 = 52
        assert_eq!(evaluate(10_000, 3, 35, 25_000).await, 52);
    }

    #[tokio::test]
    async fn division_truncates() {
        // 1999 * 5 / 1000 = 9.995 -> 9
        assert_eq!(evaluate(1_999, 0, 20, 0).await, 9);
    }

    #[tokio::test]
    async fn penalty_exceeding_discount_wraps() {
        let got = evaluate(100, 5, 20, 0).await;
        assert_eq!(got, 0u32.wrapping_sub(10));
        assert_eq!(got, reference(100, 5, 20, 0));
    }

    #[tokio::test]
    async fn matches_plaintext_reference() {
        for (m, s, a, v) in [(0, 0, 0, 0), (250_000, 12, 31, 20_001), (7_777, 1, 65, 19_999)] {
            assert_eq!(evaluate(m, s, a, v).await, reference(m, s, a, v));
        }
    }
}
