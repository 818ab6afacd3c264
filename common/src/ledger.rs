use std::sync::Arc;

use async_trait::async_trait;

use crate::db::Database;
use crate::error::{ServiceError, ServiceResult};
use crate::schema::{Payment, Status, Transaction};

/// Result of asking a processor to move money for a payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    Settled,
    Declined { reason: String },
}

/// Seam for the external party that actually settles payments.
#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    async fn process(&self, payment_id: i64, amount: f64) -> ProcessOutcome;
}

/// Processor used until a real integration exists: every payment settles.
pub struct AlwaysSettles;

#[async_trait]
impl PaymentProcessor for AlwaysSettles {
    async fn process(&self, payment_id: i64, amount: f64) -> ProcessOutcome {
        log::debug!("Settling payment {} for amount {}", payment_id, amount);
        ProcessOutcome::Settled
    }
}

/// Holds payments and the transactions recorded against them.
#[derive(Clone)]
pub struct PaymentLedger {
    db: Database,
    processor: Arc<dyn PaymentProcessor>,
}

impl PaymentLedger {
    pub fn new(db: Database, processor: Arc<dyn PaymentProcessor>) -> Self {
        Self { db, processor }
    }

    /// Stores a new pending payment between two existing users.
    pub async fn create_payment(
        &self,
        amount: f64,
        sender_id: i64,
        receiver_id: i64,
    ) -> ServiceResult<Payment> {
        if self.db.get_user(sender_id).await?.is_none() {
            log::warn!("Payment rejected, unknown sender {}", sender_id);
            return Err(ServiceError::NotFound("Sender not found".to_string()));
        }
        if self.db.get_user(receiver_id).await?.is_none() {
            log::warn!("Payment rejected, unknown receiver {}", receiver_id);
            return Err(ServiceError::NotFound("Receiver not found".to_string()));
        }

        let payment = self.db.save_payment(amount, sender_id, receiver_id).await?;
        log::info!(
            "Created payment id={} amount={} sender={} receiver={}",
            payment.id,
            payment.amount,
            payment.sender_id,
            payment.receiver_id
        );
        Ok(payment)
    }

    pub async fn get_payment(&self, payment_id: i64) -> ServiceResult<Option<Payment>> {
        Ok(self.db.get_payment(payment_id).await?)
    }

    /// Records a settlement attempt for a pending payment.
    ///
    /// The caller's `requested_status` has no effect: the stored status comes
    /// from the processor. A payment accepts exactly one transaction; the
    /// pending → completed flip is a conditional update, so concurrent callers
    /// cannot both succeed.
    pub async fn record_transaction(
        &self,
        payment_id: i64,
        requested_status: Option<&str>,
    ) -> ServiceResult<Transaction> {
        let payment = self
            .db
            .get_payment(payment_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Payment not found".to_string()))?;

        if payment.status == Status::Completed {
            log::warn!("Transaction rejected, payment {} already completed", payment_id);
            return Err(ServiceError::Conflict("Payment already completed".to_string()));
        }

        if let Some(requested) = requested_status {
            log::debug!(
                "Ignoring requested status `{}` for payment {}",
                requested,
                payment_id
            );
        }

        if let ProcessOutcome::Declined { reason } =
            self.processor.process(payment.id, payment.amount).await
        {
            log::warn!("Payment {} declined: {}", payment_id, reason);
            return Err(ServiceError::Declined(reason));
        }

        let transaction = self
            .db
            .settle_payment(payment_id, &Transaction::timestamp_now())
            .await?
            .ok_or_else(|| {
                log::warn!("Payment {} completed concurrently", payment_id);
                ServiceError::Conflict("Payment already completed".to_string())
            })?;

        log::info!(
            "Recorded transaction id={} for payment {}",
            transaction.id,
            payment_id
        );
        Ok(transaction)
    }

    /// All transactions on payments the user sent or received.
    pub async fn list_transactions_for_user(&self, user_id: i64) -> ServiceResult<Vec<Transaction>> {
        if self.db.get_user(user_id).await?.is_none() {
            return Err(ServiceError::NotFound("User not found".to_string()));
        }
        Ok(self.db.get_transactions_by_user(user_id).await?)
    }

    pub async fn transactions_for_payment(
        &self,
        payment_id: i64,
    ) -> ServiceResult<Vec<Transaction>> {
        if self.db.get_payment(payment_id).await?.is_none() {
            return Err(ServiceError::NotFound("Payment not found".to_string()));
        }
        Ok(self.db.get_transactions_by_payment(payment_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Declines;

    #[async_trait]
    impl PaymentProcessor for Declines {
        async fn process(&self, _payment_id: i64, _amount: f64) -> ProcessOutcome {
            ProcessOutcome::Declined {
                reason: "insufficient funds".to_string(),
            }
        }
    }

    async fn setup(processor: Arc<dyn PaymentProcessor>) -> (PaymentLedger, i64, i64) {
        let db = Database::in_memory().await.unwrap();
        let alice = db.save_user("Alice", "a@x.com", "hash").await.unwrap();
        let bob = db.save_user("Bob", "b@x.com", "hash").await.unwrap();
        (PaymentLedger::new(db, processor), alice.id, bob.id)
    }

    #[tokio::test]
    async fn new_payments_are_pending_with_distinct_ids() {
        let (ledger, alice, bob) = setup(Arc::new(AlwaysSettles)).await;

        let first = ledger.create_payment(10.0, alice, bob).await.unwrap();
        let second = ledger.create_payment(2.5, bob, alice).await.unwrap();

        assert_eq!(first.status, Status::Pending);
        assert_eq!(second.status, Status::Pending);
        assert_ne!(first.id, second.id);
        assert_eq!(ledger.get_payment(first.id).await.unwrap(), Some(first));
    }

    #[tokio::test]
    async fn payment_requires_known_parties() {
        let (ledger, alice, _) = setup(Arc::new(AlwaysSettles)).await;

        assert!(matches!(
            ledger.create_payment(1.0, 999, alice).await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(
            ledger.create_payment(1.0, alice, 999).await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn first_transaction_completes_payment_and_second_conflicts() {
        let (ledger, alice, bob) = setup(Arc::new(AlwaysSettles)).await;
        let payment = ledger.create_payment(10.0, alice, bob).await.unwrap();

        let transaction = ledger
            .record_transaction(payment.id, Some("pending"))
            .await
            .unwrap();
        assert_eq!(transaction.payment_id, payment.id);
        assert_eq!(transaction.status, Status::Completed);
        assert!(chrono::DateTime::parse_from_rfc3339(&transaction.timestamp).is_ok());

        let stored = ledger.get_payment(payment.id).await.unwrap().unwrap();
        assert_eq!(stored.status, Status::Completed);

        let err = ledger
            .record_transaction(payment.id, Some("pending"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
        assert_eq!(
            ledger.transactions_for_payment(payment.id).await.unwrap(),
            vec![transaction]
        );
    }

    #[tokio::test]
    async fn unknown_payment_is_not_found() {
        let (ledger, _, _) = setup(Arc::new(AlwaysSettles)).await;
        assert!(matches!(
            ledger.record_transaction(77, None).await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn concurrent_settlements_let_exactly_one_through() {
        let (ledger, alice, bob) = setup(Arc::new(AlwaysSettles)).await;
        let payment = ledger.create_payment(10.0, alice, bob).await.unwrap();

        let (first, second) = tokio::join!(
            ledger.record_transaction(payment.id, None),
            ledger.record_transaction(payment.id, None)
        );

        let successes = [&first, &second].iter().filter(|r| r.is_ok()).count();
        assert_eq!(successes, 1);
        assert!(
            matches!(first, Err(ServiceError::Conflict(_)))
                || matches!(second, Err(ServiceError::Conflict(_)))
        );
        assert_eq!(
            ledger.transactions_for_payment(payment.id).await.unwrap().len(),
            1
        );
    }

    #[tokio::test]
    async fn declined_payment_writes_nothing() {
        let (ledger, alice, bob) = setup(Arc::new(Declines)).await;
        let payment = ledger.create_payment(10.0, alice, bob).await.unwrap();

        let err = ledger.record_transaction(payment.id, None).await.unwrap_err();
        assert!(matches!(err, ServiceError::Declined(ref reason) if reason == "insufficient funds"));

        let stored = ledger.get_payment(payment.id).await.unwrap().unwrap();
        assert_eq!(stored.status, Status::Pending);
        assert!(ledger.transactions_for_payment(payment.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn lists_transactions_for_sender_and_receiver() {
        let (ledger, alice, bob) = setup(Arc::new(AlwaysSettles)).await;
        let to_bob = ledger.create_payment(10.0, alice, bob).await.unwrap();
        let to_alice = ledger.create_payment(3.0, bob, alice).await.unwrap();
        let first = ledger.record_transaction(to_bob.id, None).await.unwrap();
        let second = ledger.record_transaction(to_alice.id, None).await.unwrap();

        assert_eq!(
            ledger.list_transactions_for_user(alice).await.unwrap(),
            vec![first.clone(), second.clone()]
        );
        assert_eq!(
            ledger.list_transactions_for_user(bob).await.unwrap(),
            vec![first, second]
        );
    }

    #[tokio::test]
    async fn user_without_payments_has_empty_history() {
        let (ledger, alice, _) = setup(Arc::new(AlwaysSettles)).await;
        assert!(ledger.list_transactions_for_user(alice).await.unwrap().is_empty());
        assert!(matches!(
            ledger.list_transactions_for_user(999).await,
            Err(ServiceError::NotFound(_))
        ));
    }
}
