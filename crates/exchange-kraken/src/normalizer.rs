//! Maps raw exchange order responses to canonical order statuses. This is
//! the single seam between internal order semantics and the Kraken wire
//! format; no other component may interpret raw exchange payloads.

use crate::types::RawOrderResponse;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Accepted with a confirmed transaction id.
    Submitted,
    /// Accepted but unconfirmed: no transaction id came back, the caller
    /// must reconcile before treating this as success.
    PendingConfirmation,
    /// Refused by the exchange.
    Rejected,
    Canceled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedOrder {
    pub exchange_order_id: Option<String>,
    pub status: OrderStatus,
}

impl NormalizedOrder {
    /// Normalizes an untyped payload. Malformed or unexpected shapes degrade
    /// to `PendingConfirmation` with no id rather than failing.
    #[must_use]
    pub fn from_value(value: &serde_json::Value) -> Self {
        let raw: RawOrderResponse = serde_json::from_value(value.clone()).unwrap_or_default();
        normalize(&raw)
    }
}

/// Maps a raw order-submission response to a canonical order.
#[must_use]
pub fn normalize(response: &RawOrderResponse) -> NormalizedOrder {
    if !response.error.is_empty() {
        return NormalizedOrder {
            exchange_order_id: None,
            status: OrderStatus::Rejected,
        };
    }

    let first_txid = response
        .result
        .as_ref()
        .and_then(|r| r.txid.first())
        .cloned();

    match first_txid {
        Some(id) => NormalizedOrder {
            exchange_order_id: Some(id),
            status: OrderStatus::Submitted,
        },
        None => NormalizedOrder {
            exchange_order_id: None,
            status: OrderStatus::PendingConfirmation,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn first_txid_maps_to_submitted() {
        let value = json!({"error": [], "result": {"txid": ["ABC123", "DEF456"]}});
        let order = NormalizedOrder::from_value(&value);
        assert_eq!(order.exchange_order_id.as_deref(), Some("ABC123"));
        assert_eq!(order.status, OrderStatus::Submitted);
    }

    #[test]
    fn empty_object_is_pending_confirmation() {
        let order = NormalizedOrder::from_value(&json!({}));
        assert!(order.exchange_order_id.is_none());
        assert_eq!(order.status, OrderStatus::PendingConfirmation);
    }

    #[test]
    fn empty_txid_array_is_pending_confirmation() {
        let value = json!({"error": [], "result": {"txid": []}});
        let order = NormalizedOrder::from_value(&value);
        assert!(order.exchange_order_id.is_none());
        assert_eq!(order.status, OrderStatus::PendingConfirmation);
    }

    #[test]
    fn exchange_error_maps_to_rejected() {
        let value = json!({"error": ["EGeneral:Invalid arguments"]});
        let order = NormalizedOrder::from_value(&value);
        assert!(order.exchange_order_id.is_none());
        assert_eq!(order.status, OrderStatus::Rejected);
    }

    #[test]
    fn malformed_payload_degrades_without_panic() {
        for value in [
            json!("not an object"),
            json!(42),
            json!({"error": "not-a-list"}),
            json!({"result": {"txid": "not-a-list"}}),
            serde_json::Value::Null,
        ] {
            let order = NormalizedOrder::from_value(&value);
            assert!(order.exchange_order_id.is_none());
            assert_eq!(order.status, OrderStatus::PendingConfirmation);
        }
    }

    #[test]
    fn status_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&OrderStatus::PendingConfirmation).unwrap(),
            "\"pending_confirmation\""
        );
        assert_eq!(
            serde_json::to_string(&OrderStatus::Submitted).unwrap(),
            "\"submitted\""
        );
    }
}
