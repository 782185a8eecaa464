//! Raw Kraken wire shapes. Every field is tolerant of absence so that a bare
//! `{}` response still deserializes; interpretation happens only in the
//! normalizer.

use serde::{Deserialize, Serialize};

/// Envelope returned by Kraken's private order endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawOrderResponse {
    #[serde(default)]
    pub error: Vec<String>,
    #[serde(default)]
    pub result: Option<AddOrderResult>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddOrderResult {
    /// Transaction ids for the accepted order; the first is canonical.
    #[serde(default)]
    pub txid: Vec<String>,
    #[serde(default)]
    pub descr: Option<OrderDescription>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDescription {
    #[serde(default)]
    pub order: String,
}
