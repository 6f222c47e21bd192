use std::time::Duration;

use serde::Serialize;
use tokio::time::timeout;
use tracing::{info, warn};

use crate::services::aggregate::OrderAggregate;

/// Receipt delivery is abandoned after this deadline; the order is durably
/// created either way.
const RECEIPT_DEADLINE: Duration = Duration::from_secs(6);

/// Outcome of a best-effort notification attempt, reported back to the
/// caller but never allowed to fail the operation that triggered it.
#[derive(Debug, Clone, Serialize)]
pub struct DeliveryOutcome {
    pub requested: bool,
    pub sent: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl DeliveryOutcome {
    fn not_requested(reason: &str) -> DeliveryOutcome {
        DeliveryOutcome {
            requested: false,
            sent: false,
            reason: Some(reason.to_owned()),
        }
    }

    fn failed(reason: &str) -> DeliveryOutcome {
        DeliveryOutcome {
            requested: true,
            sent: false,
            reason: Some(reason.to_owned()),
        }
    }
}

/// Hands the order receipt to the mail collaborator, bounded by
/// `RECEIPT_DEADLINE`. Orders without a customer email skip delivery.
pub async fn deliver_receipt(order: &OrderAggregate) -> DeliveryOutcome {
    let Some(email) = order.customer_email.as_deref() else {
        return DeliveryOutcome::not_requested("no_email");
    };

    match timeout(RECEIPT_DEADLINE, send_receipt(order, email)).await {
        Ok(outcome) => outcome,
        Err(_) => {
            warn!(order_id = order.id, "receipt delivery timed out");
            DeliveryOutcome::failed("timeout")
        }
    }
}

/// Tells the customer their order is ready. Fire-and-forget: failures are
/// logged and swallowed.
pub async fn notify_ready(order: &OrderAggregate) {
    let Some(email) = order.customer_email.as_deref() else {
        return;
    };

    match timeout(RECEIPT_DEADLINE, send_ready_notice(order, email)).await {
        Ok(outcome) if outcome.sent => {
            info!(order_id = order.id, order_number = %order.order_number, "ready notice sent");
        }
        Ok(outcome) => {
            warn!(order_id = order.id, reason = ?outcome.reason, "ready notice not sent");
        }
        Err(_) => {
            warn!(order_id = order.id, "ready notice timed out");
        }
    }
}

// The mail transport is an external collaborator this service does not ship;
// every dispatch reports an honest not-sent outcome.
async fn send_receipt(order: &OrderAggregate, email: &str) -> DeliveryOutcome {
    info!(order_id = order.id, email, "no mail transport configured, receipt not sent");
    DeliveryOutcome::failed("not_configured")
}

async fn send_ready_notice(order: &OrderAggregate, email: &str) -> DeliveryOutcome {
    info!(order_id = order.id, email, "no mail transport configured, ready notice not sent");
    DeliveryOutcome::failed("not_configured")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};

    fn order_without_email() -> OrderAggregate {
        OrderAggregate {
            id: 1,
            order_number: "01".into(),
            cafe_slug: "raysdiner".into(),
            customer_name: "Ada".into(),
            customer_email: None,
            table_number: None,
            order_date: NaiveDate::from_ymd_opt(2026, 8, 28).unwrap(),
            order_sequence: 1,
            status: "Pending".into(),
            created_at: Utc::now(),
            items: vec![],
        }
    }

    #[tokio::test]
    async fn orders_without_email_skip_delivery() {
        let outcome = deliver_receipt(&order_without_email()).await;
        assert!(!outcome.requested);
        assert!(!outcome.sent);
        assert_eq!(outcome.reason.as_deref(), Some("no_email"));
    }

    #[tokio::test]
    async fn unconfigured_transport_reports_not_sent_without_failing() {
        let mut order = order_without_email();
        order.customer_email = Some("guest@example.com".into());

        let outcome = deliver_receipt(&order).await;
        assert!(outcome.requested);
        assert!(!outcome.sent);
        assert_eq!(outcome.reason.as_deref(), Some("not_configured"));
    }
}
