use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::models::Follower;

/// Scaled replication quantity for one follower.
///
/// floor(master × scaling_factor), capped at the follower's
/// `max_quantity` when one is set, then floored at 1 so a registered
/// follower always participates with at least a single unit. Flooring
/// (never rounding) keeps the replicated exposure at or below the
/// configured proportion. Never errors: products too large for
/// `Decimal` or `i64` saturate and fall to the cap like any other
/// oversized result.
pub fn follower_quantity(master_quantity: i64, follower: &Follower) -> i64 {
    // products beyond Decimal or i64 range saturate; the cap below reins them in
    let scaled = match Decimal::from(master_quantity).checked_mul(follower.scaling_factor) {
        Some(product) => product.floor().to_i64().unwrap_or(i64::MAX),
        None => i64::MAX,
    };
    let capped = match follower.max_quantity {
        Some(cap) => scaled.min(cap),
        None => scaled,
    };
    capped.max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn follower(scaling_factor: Decimal, max_quantity: Option<i64>) -> Follower {
        Follower {
            id: "f1".into(),
            display_name: "Follower".into(),
            scaling_factor,
            max_quantity,
            max_order_value: None,
            max_daily_loss: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn proportional_scaling() {
        let f = follower(Decimal::new(5, 1), Some(1_000)); // 0.5
        assert_eq!(follower_quantity(100, &f), 50);
    }

    #[test]
    fn tiny_scale_floors_to_minimum_of_one() {
        let f = follower(Decimal::new(5, 2), Some(1_000)); // 0.05
        assert_eq!(follower_quantity(10, &f), 1); // 0.5 floors to 0, bumped to 1
    }

    #[test]
    fn cap_applies_after_scaling() {
        let f = follower(Decimal::new(15, 1), Some(100)); // 1.5
        assert_eq!(follower_quantity(1_000, &f), 100);
    }

    #[test]
    fn uncapped_follower_scales_freely() {
        let f = follower(Decimal::from(3), None);
        assert_eq!(follower_quantity(1_000, &f), 3_000);
    }

    #[test]
    fn fractions_floor_rather_than_round() {
        let f = follower(Decimal::new(5, 1), Some(1_000)); // 0.5
        assert_eq!(follower_quantity(7, &f), 3); // 3.5 floors to 3
    }

    #[test]
    fn unit_factor_copies_verbatim() {
        let f = follower(Decimal::ONE, None);
        assert_eq!(follower_quantity(42, &f), 42);
    }

    #[test]
    fn amplification_above_one() {
        let f = follower(Decimal::from(2), Some(1_000));
        assert_eq!(follower_quantity(14, &f), 28);
    }

    #[test]
    fn oversized_products_saturate_rather_than_overflow() {
        // registration only requires a positive factor, so the math has
        // to absorb any magnitude without erroring
        let f = follower(Decimal::MAX, Some(500));
        assert_eq!(follower_quantity(1_000_000_000, &f), 500);

        // past i64 but still within Decimal: same saturation
        let f = follower(Decimal::from(1_000_000_000_000_i64), None);
        assert_eq!(follower_quantity(1_000_000_000, &f), i64::MAX);
    }
}
