use serde::{Deserialize, Serialize};

use super::Status;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Transaction {
    pub id: i64,
    pub payment_id: i64,
    pub status: Status,
    pub timestamp: String, // RFC 3339, UTC
}

impl Transaction {
    /// Timestamp for a transaction recorded right now.
    pub fn timestamp_now() -> String {
        chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
    }
}

/// Payload accepted when a transaction is posted against a payment.
///
/// `status` is accepted for compatibility but never trusted: the ledger
/// decides the stored status from the processor outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTransaction {
    #[serde(default)]
    pub status: Option<String>,
}
