use std::str::FromStr;

use anyhow::Context;
use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};

use crate::schema::{Payment, Status, Transaction, User, UserCredentials};

/// Database opened when `DATABASE_URL` is not set.
pub const DEFAULT_DATABASE_URL: &str = "sqlite://payments.sqlite";

#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}
impl Database {
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .context("Failed to create SQLite connect options")?
            .create_if_missing(true)
            .foreign_keys(true);

        // Every connection to `:memory:` opens a fresh database, so keep exactly one alive.
        let pool = if database_url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await
        } else {
            SqlitePool::connect_with(options).await
        }
        .with_context(|| format!("Failed to connect to database `{}`", database_url))?;

        //Apply migrations
        sqlx::migrate!()
            .run(&pool)
            .await
            .context("Database migration error")?;
        Ok(Self { pool })
    }

    pub async fn in_memory() -> anyhow::Result<Self> {
        Self::new("sqlite::memory:").await
    }

    pub async fn save_user(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
    ) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (name, email, password_hash)
            VALUES (?, ?, ?)
            RETURNING id, name, email;
            "#,
        )
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await
        .context("Failed to save user to database")?;
        log::debug!("Saved user to database: {:?}", user);
        Ok(user)
    }

    pub async fn get_user(&self, user_id: i64) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email FROM users WHERE id = ?
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .context(format!("Failed to get user with id {}", user_id))?;
        Ok(user)
    }

    pub async fn get_user_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email FROM users WHERE email = ?
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .context(format!("Failed to get user with email {}", email))?;
        Ok(user)
    }

    pub async fn get_credentials(&self, email: &str) -> anyhow::Result<Option<UserCredentials>> {
        let credentials = sqlx::query_as::<_, UserCredentials>(
            r#"
            SELECT id, name, email, password_hash FROM users WHERE email = ?
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to get user credentials")?;
        Ok(credentials)
    }

    pub async fn save_payment(
        &self,
        amount: f64,
        sender_id: i64,
        receiver_id: i64,
    ) -> anyhow::Result<Payment> {
        let payment = sqlx::query_as::<_, Payment>(
            r#"
            INSERT INTO payments (amount, sender_id, receiver_id, status)
            VALUES (?, ?, ?, ?)
            RETURNING *;
            "#,
        )
        .bind(amount)
        .bind(sender_id)
        .bind(receiver_id)
        .bind(Status::Pending)
        .fetch_one(&self.pool)
        .await
        .context("Failed to save payment to database")?;
        log::debug!("Saved payment to database: {:?}", payment);
        Ok(payment)
    }

    pub async fn get_payment(&self, payment_id: i64) -> anyhow::Result<Option<Payment>> {
        let payment = sqlx::query_as::<_, Payment>(
            r#"
            SELECT * FROM payments WHERE id = ?
            "#,
        )
        .bind(payment_id)
        .fetch_optional(&self.pool)
        .await
        .context(format!("Failed to get payment with id {}", payment_id))?;
        Ok(payment)
    }

    /// Flips a pending payment to completed and records its transaction in one
    /// database transaction.
    ///
    /// Returns `None` when the payment was not pending at update time, in which
    /// case nothing is written.
    pub async fn settle_payment(
        &self,
        payment_id: i64,
        timestamp: &str,
    ) -> anyhow::Result<Option<Transaction>> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin settlement transaction")?;

        let updated = sqlx::query(
            r#"
            UPDATE payments
            SET status = ?
            WHERE id = ? AND status = ?
            "#,
        )
        .bind(Status::Completed)
        .bind(payment_id)
        .bind(Status::Pending)
        .execute(&mut *tx)
        .await
        .context(format!("Failed to update status of payment {}", payment_id))?;

        if updated.rows_affected() == 0 {
            tx.rollback()
                .await
                .context("Failed to roll back settlement transaction")?;
            return Ok(None);
        }

        let transaction = sqlx::query_as::<_, Transaction>(
            r#"
            INSERT INTO transactions (payment_id, status, timestamp)
            VALUES (?, ?, ?)
            RETURNING *;
            "#,
        )
        .bind(payment_id)
        .bind(Status::Completed)
        .bind(timestamp)
        .fetch_one(&mut *tx)
        .await
        .context("Failed to save transaction")?;

        tx.commit()
            .await
            .context("Failed to commit settlement transaction")?;

        log::debug!("Saved transaction to database: {:?}", transaction);
        Ok(Some(transaction))
    }

    pub async fn get_transactions_by_payment(
        &self,
        payment_id: i64,
    ) -> anyhow::Result<Vec<Transaction>> {
        let transactions = sqlx::query_as::<_, Transaction>(
            r#"
            SELECT * FROM transactions WHERE payment_id = ? ORDER BY id
            "#,
        )
        .bind(payment_id)
        .fetch_all(&self.pool)
        .await
        .context(format!(
            "Failed to get transactions for payment {}",
            payment_id
        ))?;
        Ok(transactions)
    }

    pub async fn get_transactions_by_user(&self, user_id: i64) -> anyhow::Result<Vec<Transaction>> {
        let transactions = sqlx::query_as::<_, Transaction>(
            r#"
            SELECT t.id, t.payment_id, t.status, t.timestamp
            FROM transactions t
            JOIN payments p ON p.id = t.payment_id
            WHERE p.sender_id = ? OR p.receiver_id = ?
            ORDER BY t.id
            "#,
        )
        .bind(user_id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .context(format!("Failed to get transactions for user {}", user_id))?;
        Ok(transactions)
    }
}
