//! Read-only coupon evaluation. Checks run in a fixed order and short-circuit
//! on the first failure, each with its own user-facing message. Usage counts
//! are only incremented after payment confirmation, never here.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use crate::models::CouponEntity;
use crate::pricing::to_decimal;

pub const DISCOUNT_KIND_PERCENTAGE: &str = "PERCENTAGE";
pub const DISCOUNT_KIND_FIXED: &str = "FIXED";

/// Why a coupon was rejected. `message` is shown verbatim to the customer.
#[derive(Debug, Clone, PartialEq)]
pub enum CouponRejection {
    UnknownCode,
    Inactive,
    NotYetValid,
    Expired,
    UsageLimitReached,
    MinimumOrderNotMet { minimum: f64 },
}

impl CouponRejection {
    pub fn message(&self) -> String {
        match self {
            CouponRejection::UnknownCode => "Invalid coupon code".into(),
            CouponRejection::Inactive => "This coupon is no longer active".into(),
            CouponRejection::NotYetValid => "This coupon is not yet valid".into(),
            CouponRejection::Expired => "This coupon has expired".into(),
            CouponRejection::UsageLimitReached => {
                "This coupon has reached its usage limit".into()
            }
            CouponRejection::MinimumOrderNotMet { minimum } => {
                format!("Minimum order of ₹{minimum} required for this coupon")
            }
        }
    }
}

/// Evaluate a coupon against a cart subtotal at a given instant.
///
/// Returns the discount amount (`0 <= discount <= cart_subtotal`) or the
/// first failing check. Deterministic for identical inputs.
pub fn evaluate(
    coupon: Option<&CouponEntity>,
    cart_subtotal: Decimal,
    now: DateTime<Utc>,
) -> Result<Decimal, CouponRejection> {
    let Some(coupon) = coupon else {
        return Err(CouponRejection::UnknownCode);
    };

    if !coupon.is_active {
        return Err(CouponRejection::Inactive);
    }

    if let Some(valid_from) = coupon.valid_from {
        if now < valid_from {
            return Err(CouponRejection::NotYetValid);
        }
    }

    if let Some(valid_until) = coupon.valid_until {
        if now > valid_until {
            return Err(CouponRejection::Expired);
        }
    }

    if let Some(limit) = coupon.usage_limit {
        if coupon.usage_count >= limit {
            return Err(CouponRejection::UsageLimitReached);
        }
    }

    let minimum = to_decimal(coupon.min_order_amount);
    if cart_subtotal < minimum {
        return Err(CouponRejection::MinimumOrderNotMet {
            minimum: coupon.min_order_amount,
        });
    }

    let raw = if coupon.discount_kind == DISCOUNT_KIND_PERCENTAGE {
        let mut amount = cart_subtotal * to_decimal(coupon.discount_value) / Decimal::ONE_HUNDRED;
        if let Some(cap) = coupon.max_discount {
            amount = amount.min(to_decimal(cap));
        }
        amount
    } else {
        to_decimal(coupon.discount_value)
    };

    Ok(raw.min(cart_subtotal).max(Decimal::ZERO))
}

/// f64 view of [`evaluate`] for response payloads.
pub fn evaluate_amount(
    coupon: Option<&CouponEntity>,
    cart_subtotal: f64,
    now: DateTime<Utc>,
) -> Result<f64, CouponRejection> {
    evaluate(coupon, to_decimal(cart_subtotal), now)
        .map(|d| d.to_f64().unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn coupon() -> CouponEntity {
        let now = Utc::now();
        CouponEntity {
            id: Uuid::new_v4(),
            code: "SAVE20".into(),
            discount_kind: DISCOUNT_KIND_PERCENTAGE.into(),
            discount_value: 20.0,
            min_order_amount: 0.0,
            max_discount: None,
            valid_from: None,
            valid_until: None,
            usage_limit: None,
            usage_count: 0,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn unknown_code_rejected() {
        let result = evaluate(None, dec!(150), Utc::now());
        assert_eq!(result, Err(CouponRejection::UnknownCode));
    }

    #[test]
    fn inactive_rejected() {
        let mut c = coupon();
        c.is_active = false;
        assert_eq!(
            evaluate(Some(&c), dec!(150), Utc::now()),
            Err(CouponRejection::Inactive)
        );
    }

    #[test]
    fn validity_window_enforced() {
        let now = Utc::now();
        let mut c = coupon();
        c.valid_from = Some(now + Duration::hours(1));
        assert_eq!(
            evaluate(Some(&c), dec!(150), now),
            Err(CouponRejection::NotYetValid)
        );

        let mut c = coupon();
        c.valid_until = Some(now - Duration::hours(1));
        assert_eq!(
            evaluate(Some(&c), dec!(150), now),
            Err(CouponRejection::Expired)
        );
    }

    #[test]
    fn usage_limit_reached_rejected() {
        let mut c = coupon();
        c.usage_limit = Some(5);
        c.usage_count = 5;
        assert_eq!(
            evaluate(Some(&c), dec!(150), Utc::now()),
            Err(CouponRejection::UsageLimitReached)
        );
    }

    #[test]
    fn minimum_order_message_names_threshold() {
        let mut c = coupon();
        c.min_order_amount = 200.0;
        let err = evaluate(Some(&c), dec!(150), Utc::now()).unwrap_err();
        assert_eq!(err, CouponRejection::MinimumOrderNotMet { minimum: 200.0 });
        assert!(err.message().contains("200"));
    }

    #[test]
    fn percentage_discount_computed() {
        let c = coupon();
        assert_eq!(evaluate(Some(&c), dec!(150), Utc::now()), Ok(dec!(30)));
    }

    #[test]
    fn percentage_discount_capped_by_max_discount() {
        let mut c = coupon();
        c.max_discount = Some(25.0);
        assert_eq!(evaluate(Some(&c), dec!(150), Utc::now()), Ok(dec!(25)));
    }

    #[test]
    fn fixed_discount_verbatim_and_min_order_honored() {
        let mut c = coupon();
        c.discount_kind = DISCOUNT_KIND_FIXED.into();
        c.discount_value = 100.0;
        c.min_order_amount = 200.0;
        assert_eq!(evaluate(Some(&c), dec!(250), Utc::now()), Ok(dec!(100)));
    }

    #[test]
    fn discount_never_exceeds_subtotal() {
        let mut c = coupon();
        c.discount_kind = DISCOUNT_KIND_FIXED.into();
        c.discount_value = 500.0;
        assert_eq!(evaluate(Some(&c), dec!(150), Utc::now()), Ok(dec!(150)));
    }

    #[test]
    fn evaluation_is_deterministic() {
        let c = coupon();
        let now = Utc::now();
        assert_eq!(
            evaluate(Some(&c), dec!(150), now),
            evaluate(Some(&c), dec!(150), now)
        );
    }
}
