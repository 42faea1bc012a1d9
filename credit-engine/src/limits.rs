//! Recommended credit limit policy

use crate::config::LimitPolicy;
use crate::types::RiskCategory;
use crate::{Error, Result};
use rust_decimal::{Decimal, RoundingStrategy};

/// Share of recent order volume offered to a category
///
/// Customers without history have no volume to share, so `Unknown` is
/// always zero.
pub fn fraction_for(category: RiskCategory, policy: &LimitPolicy) -> Decimal {
    match category {
        RiskCategory::Low => policy.low_fraction,
        RiskCategory::Medium => policy.medium_fraction,
        RiskCategory::High => policy.high_fraction,
        RiskCategory::Unknown => Decimal::ZERO,
    }
}

/// Recommended limit for a category and 6-month order volume
///
/// Zero volume always yields zero. Otherwise the category's share of volume
/// is rounded to the nearest increment and kept within floor and ceiling.
pub fn recommend_limit(
    category: RiskCategory,
    total_last_6_months: Decimal,
    policy: &LimitPolicy,
) -> Decimal {
    if total_last_6_months <= Decimal::ZERO {
        return Decimal::ZERO;
    }

    let raw = total_last_6_months * fraction_for(category, policy);
    let mut limit = round_to_increment(raw, policy.rounding_increment).max(policy.floor);

    if let Some(ceiling) = policy.ceiling {
        limit = limit.min(ceiling);
    }

    limit.max(Decimal::ZERO)
}

/// Round to the nearest multiple of `increment`, midpoint away from zero
pub fn round_to_increment(value: Decimal, increment: Decimal) -> Decimal {
    if increment <= Decimal::ZERO {
        return value;
    }

    (value / increment).round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        * increment
}

/// Reject limits that cannot be applied to a customer record
pub fn validate_limit(new_limit: Decimal) -> Result<()> {
    if new_limit < Decimal::ZERO {
        return Err(Error::Validation(format!(
            "Credit limit must not be negative, got {}",
            new_limit
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_zero_volume_yields_zero() {
        let policy = LimitPolicy {
            floor: dec!(5000),
            ..LimitPolicy::default()
        };
        assert_eq!(recommend_limit(RiskCategory::Medium, dec!(0), &policy), dec!(0));
        assert_eq!(recommend_limit(RiskCategory::Low, dec!(-10), &policy), dec!(0));
    }

    #[test]
    fn test_fraction_by_category() {
        let policy = LimitPolicy::default();
        assert_eq!(recommend_limit(RiskCategory::Low, dec!(100000), &policy), dec!(40000));
        assert_eq!(recommend_limit(RiskCategory::Medium, dec!(100000), &policy), dec!(25000));
        assert_eq!(recommend_limit(RiskCategory::High, dec!(100000), &policy), dec!(10000));
        assert_eq!(recommend_limit(RiskCategory::Unknown, dec!(100000), &policy), dec!(0));
    }

    #[test]
    fn test_unknown_category_has_no_share() {
        let policy = LimitPolicy {
            floor: dec!(5000),
            ..LimitPolicy::default()
        };
        assert_eq!(fraction_for(RiskCategory::Unknown, &policy), dec!(0));
        assert_eq!(recommend_limit(RiskCategory::Unknown, dec!(0), &policy), dec!(0));
    }

    #[test]
    fn test_rounding_to_increment() {
        assert_eq!(round_to_increment(dec!(12499.99), dec!(1000)), dec!(12000));
        assert_eq!(round_to_increment(dec!(12500), dec!(1000)), dec!(13000));
        assert_eq!(round_to_increment(dec!(487.5), dec!(1000)), dec!(0));
        assert_eq!(round_to_increment(dec!(1234.5), dec!(0)), dec!(1234.5));
    }

    #[test]
    fn test_floor_and_ceiling() {
        let policy = LimitPolicy {
            floor: dec!(2000),
            ceiling: Some(dec!(50000)),
            ..LimitPolicy::default()
        };
        assert_eq!(recommend_limit(RiskCategory::High, dec!(4000), &policy), dec!(2000));
        assert_eq!(recommend_limit(RiskCategory::Low, dec!(1000000), &policy), dec!(50000));
    }

    #[test]
    fn test_validate_limit() {
        assert!(validate_limit(dec!(0)).is_ok());
        assert!(validate_limit(dec!(25000)).is_ok());
        assert!(matches!(validate_limit(dec!(-1)), Err(Error::Validation(_))));
    }
}
