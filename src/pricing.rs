//! Cart pricing engine.
//!
//! All arithmetic is done with `Decimal` internally; `f64` only appears at
//! the storage/serialization edges, rounded to 2 decimal places (half-up).

use rust_decimal::prelude::*;
use serde::Serialize;
use utoipa::ToSchema;

/// Rounding for monetary values (2 decimal places, half-up)
const DECIMAL_PLACES: u32 = 2;

/// Tolerance for monetary comparisons (0.01)
pub const MONEY_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Maximum allowed price per line unit
const MAX_UNIT_PRICE: f64 = 1_000_000.0;
/// Maximum allowed quantity per line
const MAX_QUANTITY: i32 = 9999;

/// Delivery-fee threshold, flat fee and tax rate. These are configuration,
/// not business invariants; see `Config::from_env`.
#[derive(Debug, Clone)]
pub struct PricingConfig {
    pub free_delivery_threshold: Decimal,
    pub delivery_fee: Decimal,
    pub tax_rate: Decimal,
}

/// A cart line reduced to what pricing needs. The unit price already includes
/// the net effect of the line's customizations.
#[derive(Debug, Clone)]
pub struct PricedLine {
    pub unit_price: f64,
    pub quantity: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Totals {
    pub subtotal: f64,
    pub delivery_fee: f64,
    pub tax: f64,
    pub discount: f64,
    pub grand_total: f64,
}

#[derive(thiserror::Error, Debug, PartialEq)]
#[error("{0}")]
pub struct PricingError(pub String);

/// Convert f64 to Decimal for calculation
#[inline]
pub fn to_decimal(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or_default()
}

/// Convert Decimal back to f64 for storage, rounded to 2 decimal places
#[inline]
pub fn to_f64(value: Decimal) -> f64 {
    value
        .round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
        .to_f64()
        .unwrap_or_default()
}

/// Validate a priced line before it enters a totals computation.
pub fn validate_line(line: &PricedLine) -> Result<(), PricingError> {
    if !line.unit_price.is_finite() {
        return Err(PricingError(format!(
            "unit_price must be a finite number, got {}",
            line.unit_price
        )));
    }
    if line.unit_price < 0.0 {
        return Err(PricingError(format!(
            "unit_price must be non-negative, got {}",
            line.unit_price
        )));
    }
    if line.unit_price > MAX_UNIT_PRICE {
        return Err(PricingError(format!(
            "unit_price exceeds maximum allowed ({MAX_UNIT_PRICE}), got {}",
            line.unit_price
        )));
    }
    if line.quantity <= 0 {
        return Err(PricingError(format!(
            "quantity must be positive, got {}",
            line.quantity
        )));
    }
    if line.quantity > MAX_QUANTITY {
        return Err(PricingError(format!(
            "quantity exceeds maximum allowed ({MAX_QUANTITY}), got {}",
            line.quantity
        )));
    }
    Ok(())
}

/// Pre-discount cart subtotal.
pub fn subtotal(lines: &[PricedLine]) -> Decimal {
    lines
        .iter()
        .map(|line| to_decimal(line.unit_price) * Decimal::from(line.quantity))
        .sum()
}

/// Compute the full set of cart totals. Pure and deterministic.
///
/// The delivery-fee threshold is applied to the pre-discount subtotal. The
/// discount is clamped to `[0, subtotal]` and the grand total to `>= 0`.
pub fn compute_totals(lines: &[PricedLine], discount: Decimal, config: &PricingConfig) -> Totals {
    let subtotal = subtotal(lines);

    let delivery_fee = if subtotal >= config.free_delivery_threshold {
        Decimal::ZERO
    } else {
        config.delivery_fee
    };

    let tax = (subtotal * config.tax_rate)
        .round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero);

    let discount = discount.clamp(Decimal::ZERO, subtotal);

    let grand_total = (subtotal + delivery_fee + tax - discount).max(Decimal::ZERO);

    Totals {
        subtotal: to_f64(subtotal),
        delivery_fee: to_f64(delivery_fee),
        tax: to_f64(tax),
        discount: to_f64(discount),
        grand_total: to_f64(grand_total),
    }
}

/// Whether two monetary amounts agree within [`MONEY_TOLERANCE`]. Used to
/// cross-check client-submitted totals against the server computation.
pub fn amounts_match(a: f64, b: f64) -> bool {
    (to_decimal(a) - to_decimal(b)).abs() <= MONEY_TOLERANCE
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn config() -> PricingConfig {
        PricingConfig {
            free_delivery_threshold: dec!(200),
            delivery_fee: dec!(30),
            tax_rate: dec!(0.05),
        }
    }

    fn line(unit_price: f64, quantity: i32) -> PricedLine {
        PricedLine {
            unit_price,
            quantity,
        }
    }

    #[test]
    fn totals_are_deterministic() {
        let lines = vec![line(89.0, 2), line(35.0, 1)];
        let first = compute_totals(&lines, dec!(10), &config());
        let second = compute_totals(&lines, dec!(10), &config());
        assert_eq!(first, second);
    }

    #[test]
    fn delivery_fee_waived_at_threshold() {
        let below = compute_totals(&[line(199.99, 1)], Decimal::ZERO, &config());
        assert_eq!(below.delivery_fee, 30.0);
        let at = compute_totals(&[line(200.0, 1)], Decimal::ZERO, &config());
        assert_eq!(at.delivery_fee, 0.0);
        let above = compute_totals(&[line(120.0, 2)], Decimal::ZERO, &config());
        assert_eq!(above.delivery_fee, 0.0);
    }

    #[test]
    fn delivery_fee_uses_pre_discount_subtotal() {
        // Subtotal 250 with a 100 discount still qualifies for free delivery.
        let totals = compute_totals(&[line(250.0, 1)], dec!(100), &config());
        assert_eq!(totals.delivery_fee, 0.0);
    }

    #[test]
    fn tax_is_five_percent_rounded_half_up() {
        let totals = compute_totals(&[line(150.0, 1)], Decimal::ZERO, &config());
        assert_eq!(totals.tax, 7.50);
        // 0.05 * 30.1 = 1.505 rounds half-up to 1.51
        let totals = compute_totals(&[line(30.1, 1)], Decimal::ZERO, &config());
        assert_eq!(totals.tax, 1.51);
        assert!(totals.tax >= 0.0);
    }

    #[test]
    fn discount_clamped_to_subtotal() {
        let totals = compute_totals(&[line(50.0, 1)], dec!(500), &config());
        assert_eq!(totals.discount, 50.0);
        // subtotal 50 + fee 30 + tax 2.50 - discount 50
        assert_eq!(totals.grand_total, 32.50);
    }

    #[test]
    fn negative_discount_clamped_to_zero() {
        let totals = compute_totals(&[line(50.0, 1)], dec!(-10), &config());
        assert_eq!(totals.discount, 0.0);
    }

    #[test]
    fn grand_total_never_negative() {
        let totals = compute_totals(&[], dec!(100), &config());
        assert_eq!(totals.grand_total, 0.0);
    }

    #[test]
    fn worked_example_percentage_coupon() {
        // Subtotal 150, 20% coupon (discount 30): fee 30, tax 7.50, total 157.50
        let totals = compute_totals(&[line(150.0, 1)], dec!(30), &config());
        assert_eq!(totals.subtotal, 150.0);
        assert_eq!(totals.delivery_fee, 30.0);
        assert_eq!(totals.tax, 7.50);
        assert_eq!(totals.discount, 30.0);
        assert_eq!(totals.grand_total, 157.50);
    }

    #[test]
    fn worked_example_fixed_coupon() {
        // Subtotal 250, fixed 100 coupon: free delivery, tax 12.50, total 162.50
        let totals = compute_totals(&[line(250.0, 1)], dec!(100), &config());
        assert_eq!(totals.delivery_fee, 0.0);
        assert_eq!(totals.tax, 12.50);
        assert_eq!(totals.grand_total, 162.50);
    }

    #[test]
    fn line_validation_rejects_bad_input() {
        assert!(validate_line(&line(89.0, 1)).is_ok());
        assert!(validate_line(&line(-1.0, 1)).is_err());
        assert!(validate_line(&line(f64::NAN, 1)).is_err());
        assert!(validate_line(&line(f64::INFINITY, 1)).is_err());
        assert!(validate_line(&line(89.0, 0)).is_err());
        assert!(validate_line(&line(89.0, -2)).is_err());
        assert!(validate_line(&line(89.0, 10_000)).is_err());
        assert!(validate_line(&line(2_000_000.0, 1)).is_err());
    }

    #[test]
    fn amounts_match_within_tolerance() {
        assert!(amounts_match(157.50, 157.50));
        assert!(amounts_match(157.50, 157.51));
        assert!(!amounts_match(157.50, 157.52));
    }
}
