//! Illustrative premium figures.
//!
//! Derived locally from a policy and a score for display. Nothing here is
//! stored on-chain or verified, and none of it is authoritative pricing.
//!
//! ```text
//! discount_rate  = clamp(0, 50, (score - 50) * 1.5)       percent
//! final_discount = round(base_premium * discount_rate / 100)
//! risk_level     = clamp(1, 10, round((100 - score) / 10))
//! safety_score   = clamp(0, 100, score)
//! ```
//!
//! Rounding is half-up.

use serde::{Deserialize, Serialize};

use crate::policy::Policy;

/// Upper bound of the discount rate, in percent.
pub const MAX_DISCOUNT_RATE: f64 = 50.0;

/// Display figures for one policy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PremiumView {
    pub base_premium: u32,
    /// Percent, in `[0, 50]`.
    pub discount_rate: f64,
    pub final_discount: u32,
    pub premium_after_discount: u32,
    /// In `[1, 10]`; higher is riskier.
    pub risk_level: u8,
    /// In `[0, 100]`.
    pub safety_score: u8,
}

/// Derive the display figures for `policy`.
///
/// With no explicit `score`, a verified policy uses its settled discount
/// and an unverified one scores 0.
pub fn derive_premium_view(policy: &Policy, score: Option<i64>) -> PremiumView {
    let score = score.unwrap_or_else(|| i64::from(policy.decrypted_score.unwrap_or(0)));
    let base = f64::from(policy.base_premium);

    let discount_rate = ((score as f64 - 50.0) * 1.5).clamp(0.0, MAX_DISCOUNT_RATE);
    // At most half of a u32, so the cast cannot saturate.
    let final_discount = round_half_up(base * discount_rate / 100.0) as u32;
    let risk_level = round_half_up((100.0 - score as f64) / 10.0).clamp(1.0, 10.0) as u8;
    let safety_score = score.clamp(0, 100) as u8;

    PremiumView {
        base_premium: policy.base_premium,
        discount_rate,
        final_discount,
        premium_after_discount: policy.base_premium.saturating_sub(final_discount),
        risk_level,
        safety_score,
    }
}

fn round_half_up(x: f64) -> f64 {
    (x + 0.5).floor()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use ubi_core::{DriverAddress, Timestamp};

    fn policy(base_premium: u32, decrypted_score: Option<u32>) -> Policy {
        Policy {
            id: DriverAddress::from_bytes([0x22; 20]),
            name: "Test".into(),
            base_premium,
            age: 0,
            vehicle_value: 0,
            created_at: Timestamp::from_epoch_secs(0).unwrap(),
            is_verified: decrypted_score.is_some(),
            decrypted_score,
            settlement_method: None,
        }
    }

    #[test]
    fn good_driver() {
        let view = derive_premium_view(&policy(1_000, None), Some(80));
        assert_eq!(view.discount_rate, 45.0);
        assert_eq!(view.final_discount, 450);
        assert_eq!(view.premium_after_discount, 550);
        assert_eq!(view.risk_level, 2);
        assert_eq!(view.safety_score, 80);
    }

    #[test]
    fn poor_driver() {
        let view = derive_premium_view(&policy(1_000, None), Some(20));
        assert_eq!(view.discount_rate, 0.0);
        assert_eq!(view.final_discount, 0);
        assert_eq!(view.risk_level, 8);
        assert_eq!(view.safety_score, 20);
    }

    #[test]
    fn halves_round_up() {
        // (100 - 55) / 10 = 4.5
        assert_eq!(derive_premium_view(&policy(1_000, None), Some(55)).risk_level, 5);
        // 3 * 7.5 / 100 = 0.225 -> 0; 7 * 7.5 / 100 = 0.525 -> 1
        assert_eq!(derive_premium_view(&policy(3, None), Some(55)).final_discount, 0);
        assert_eq!(derive_premium_view(&policy(7, None), Some(55)).final_discount, 1);
    }

    #[test]
    fn missing_score_falls_back_to_settled_value() {
        let verified = derive_premium_view(&policy(1_000, Some(80)), None);
        assert_eq!(verified.final_discount, 450);

        let unverified = derive_premium_view(&policy(1_000, None), None);
        assert_eq!(unverified.safety_score, 0);
        assert_eq!(unverified.risk_level, 10);
        assert_eq!(unverified.final_discount, 0);
    }

    proptest! {
        #[test]
        fn outputs_stay_in_range(base in any::<u32>(), score in -1_000_000i64..1_000_000) {
            let view = derive_premium_view(&policy(base, None), Some(score));
            prop_assert!((0.0..=MAX_DISCOUNT_RATE).contains(&view.discount_rate));
            prop_assert!((1..=10).contains(&view.risk_level));
            prop_assert!(view.safety_score <= 100);
            prop_assert!(view.final_discount <= base);
            prop_assert_eq!(view.premium_after_discount, base - view.final_discount);
        }

        #[test]
        fn is_pure(base in any::<u32>(), score in any::<i64>()) {
            let p = policy(base, None);
            prop_assert_eq!(derive_premium_view(&p, Some(score)), derive_premium_view(&p, Some(score)));
        }
    }
}
