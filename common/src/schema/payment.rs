use serde::{Deserialize, Serialize};

use super::Status;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Payment {
    pub id: i64,
    pub amount: f64,
    pub sender_id: i64,
    pub receiver_id: i64,
    pub status: Status, // "pending" until the first transaction, then "completed"
}

/// Payload accepted when a payment is created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPayment {
    pub amount: f64,
    pub sender_id: i64,
    pub receiver_id: i64,
}
