//! Order lifecycle state machine. Every mutation path consults the
//! transition table here; transitions outside the table are rejected.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Preparing,
    OutForDelivery,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Confirmed => "CONFIRMED",
            OrderStatus::Preparing => "PREPARING",
            OrderStatus::OutForDelivery => "OUT_FOR_DELIVERY",
            OrderStatus::Delivered => "DELIVERED",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "PENDING" => Some(OrderStatus::Pending),
            "CONFIRMED" => Some(OrderStatus::Confirmed),
            "PREPARING" => Some(OrderStatus::Preparing),
            "OUT_FOR_DELIVERY" => Some(OrderStatus::OutForDelivery),
            "DELIVERED" => Some(OrderStatus::Delivered),
            "CANCELLED" => Some(OrderStatus::Cancelled),
            _ => None,
        }
    }

    /// The full transition table. Forward-only through the delivery
    /// pipeline; CANCELLED is reachable from PENDING only; DELIVERED and
    /// CANCELLED are terminal.
    pub fn can_transition(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed)
                | (Pending, Preparing)
                | (Pending, Cancelled)
                | (Confirmed, Preparing)
                | (Preparing, OutForDelivery)
                | (OutForDelivery, Delivered)
        )
    }

    /// DELIVERED reconciles cash-on-delivery orders as paid.
    pub fn forces_paid(self) -> bool {
        self == OrderStatus::Delivered
    }

    /// Terminal states admit no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }
}

/// How a verified payment applies to an order in its current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentDecision {
    /// This payment reference was already applied; acknowledge without
    /// side effects.
    AlreadyApplied,
    /// The order moves to (CONFIRMED, PAID).
    Confirm,
    /// The order already finished its lifecycle; acknowledge the redelivery
    /// without touching it, or the gateway will retry forever.
    Settled,
    /// Anything else is a conflict.
    Rejected,
}

/// Decide what a verified payment does to an order. Pure; the caller applies
/// the decision inside its transaction.
pub fn decide_payment(
    status: OrderStatus,
    payment_status: PaymentStatus,
    applied_payment_ref: Option<&str>,
    payment_ref: &str,
) -> PaymentDecision {
    if payment_status == PaymentStatus::Paid && applied_payment_ref == Some(payment_ref) {
        return PaymentDecision::AlreadyApplied;
    }
    if status.can_transition(OrderStatus::Confirmed) {
        return PaymentDecision::Confirm;
    }
    if status.is_terminal() {
        return PaymentDecision::Settled;
    }
    PaymentDecision::Rejected
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Paid => "PAID",
            PaymentStatus::Failed => "FAILED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "PENDING" => Some(PaymentStatus::Pending),
            "PAID" => Some(PaymentStatus::Paid),
            "FAILED" => Some(PaymentStatus::Failed),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use OrderStatus::*;

    #[test]
    fn delivery_pipeline_is_forward_only() {
        assert!(Pending.can_transition(Preparing));
        assert!(Confirmed.can_transition(Preparing));
        assert!(Preparing.can_transition(OutForDelivery));
        assert!(OutForDelivery.can_transition(Delivered));

        assert!(!Delivered.can_transition(Preparing));
        assert!(!OutForDelivery.can_transition(Preparing));
        assert!(!Preparing.can_transition(Pending));
        assert!(!Preparing.can_transition(Confirmed));
    }

    #[test]
    fn payment_confirms_only_pending_orders() {
        assert!(Pending.can_transition(Confirmed));
        assert!(!Preparing.can_transition(Confirmed));
        assert!(!Cancelled.can_transition(Confirmed));
    }

    #[test]
    fn cancel_only_from_pending() {
        assert!(Pending.can_transition(Cancelled));
        assert!(!Confirmed.can_transition(Cancelled));
        assert!(!Preparing.can_transition(Cancelled));
        assert!(!Delivered.can_transition(Cancelled));
    }

    #[test]
    fn terminal_states_admit_nothing() {
        for next in [Pending, Confirmed, Preparing, OutForDelivery, Delivered, Cancelled] {
            assert!(!Delivered.can_transition(next));
            assert!(!Cancelled.can_transition(next));
        }
    }

    #[test]
    fn delivered_forces_paid() {
        assert!(Delivered.forces_paid());
        assert!(!OutForDelivery.forces_paid());
    }

    #[test]
    fn duplicate_payment_ref_is_a_no_op() {
        // A redelivered webhook carrying the already-applied reference must
        // not confirm, bump coupons, or email again.
        let decision =
            decide_payment(Confirmed, PaymentStatus::Paid, Some("pay_1"), "pay_1");
        assert_eq!(decision, PaymentDecision::AlreadyApplied);
    }

    #[test]
    fn paid_order_rejects_a_different_payment_ref() {
        let decision =
            decide_payment(Confirmed, PaymentStatus::Paid, Some("pay_1"), "pay_2");
        assert_eq!(decision, PaymentDecision::Rejected);
    }

    #[test]
    fn pending_order_confirms_on_first_payment() {
        let decision = decide_payment(Pending, PaymentStatus::Pending, None, "pay_1");
        assert_eq!(decision, PaymentDecision::Confirm);
    }

    #[test]
    fn settled_orders_acknowledge_redelivery() {
        // COD order marked DELIVERED/PAID with no gateway ref: a late webhook
        // is acknowledged, never retried into a conflict.
        let decision = decide_payment(Delivered, PaymentStatus::Paid, None, "pay_1");
        assert_eq!(decision, PaymentDecision::Settled);

        let decision =
            decide_payment(Cancelled, PaymentStatus::Failed, None, "pay_1");
        assert_eq!(decision, PaymentDecision::Settled);
    }

    #[test]
    fn mid_pipeline_payment_is_a_conflict() {
        let decision = decide_payment(Preparing, PaymentStatus::Paid, Some("pay_1"), "pay_2");
        assert_eq!(decision, PaymentDecision::Rejected);
    }

    #[test]
    fn status_round_trips_through_strings() {
        for status in [Pending, Confirmed, Preparing, OutForDelivery, Delivered, Cancelled] {
            assert_eq!(OrderStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(OrderStatus::parse("REJECTED"), None);

        for status in [PaymentStatus::Pending, PaymentStatus::Paid, PaymentStatus::Failed] {
            assert_eq!(PaymentStatus::parse(status.as_str()), Some(status));
        }
    }
}
