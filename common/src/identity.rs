use std::sync::Arc;

use anyhow::Context;

use crate::db::Database;
use crate::error::{ServiceError, ServiceResult};
use crate::hashing::CredentialHasher;
use crate::schema::User;

const EMAIL_TAKEN: &str = "Email already registered";

/// Holds user records and checks credentials.
#[derive(Clone)]
pub struct IdentityStore {
    db: Database,
    hasher: Arc<dyn CredentialHasher>,
}

impl IdentityStore {
    pub fn new(db: Database, hasher: Arc<dyn CredentialHasher>) -> Self {
        Self { db, hasher }
    }

    /// Creates a user. The password is hashed here and nowhere else.
    ///
    /// `name` and `email` are stored exactly as given.
    pub async fn register(&self, name: &str, email: &str, password: &str) -> ServiceResult<User> {
        if self.db.get_user_by_email(email).await?.is_some() {
            log::warn!("Registration rejected, email already registered: {}", email);
            return Err(ServiceError::Conflict(EMAIL_TAKEN.to_string()));
        }

        let password_hash = self.hash_password(password).await?;

        // A concurrent registration can still win the race; the UNIQUE index decides.
        let user = self
            .db
            .save_user(name, email, &password_hash)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    log::warn!("Registration lost race for email: {}", email);
                    ServiceError::Conflict(EMAIL_TAKEN.to_string())
                } else {
                    ServiceError::Internal(e)
                }
            })?;

        log::info!("Registered user id={} email={}", user.id, user.email);
        Ok(user)
    }

    pub async fn find_by_email(&self, email: &str) -> ServiceResult<Option<User>> {
        Ok(self.db.get_user_by_email(email).await?)
    }

    pub async fn find_by_id(&self, user_id: i64) -> ServiceResult<Option<User>> {
        Ok(self.db.get_user(user_id).await?)
    }

    /// Returns the user when `password` matches, `None` otherwise.
    ///
    /// An unknown email still pays for one hash verification so both failure
    /// paths take the same time.
    pub async fn verify_credentials(
        &self,
        email: &str,
        password: &str,
    ) -> ServiceResult<Option<User>> {
        let credentials = self.db.get_credentials(email).await?;
        let stored_hash = credentials.as_ref().map(|c| c.password_hash.clone());
        let matches = self.verify_password(password, stored_hash).await?;

        match credentials {
            Some(credentials) if matches => Ok(Some(credentials.into_user())),
            Some(_) => {
                log::warn!("Invalid password for user {}", email);
                Ok(None)
            }
            None => {
                log::warn!("Failed to get User with email: {}", email);
                Ok(None)
            }
        }
    }

    // Argon2 is CPU-bound; keep it off the async worker threads.
    async fn hash_password(&self, password: &str) -> ServiceResult<String> {
        let hasher = Arc::clone(&self.hasher);
        let password = password.to_string();
        let hash = tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .context("Password hashing task failed")??;
        Ok(hash)
    }

    /// Verifies against `stored_hash`, or the dummy hash when there is none.
    async fn verify_password(
        &self,
        password: &str,
        stored_hash: Option<String>,
    ) -> ServiceResult<bool> {
        let hasher = Arc::clone(&self.hasher);
        let password = password.to_string();
        let matches = tokio::task::spawn_blocking(move || match stored_hash {
            Some(hash) => hasher.verify(&password, &hash),
            None => {
                let _ = hasher.verify(&password, hasher.dummy_hash());
                false
            }
        })
        .await
        .context("Password verification task failed")?;
        Ok(matches)
    }
}

fn is_unique_violation(err: &anyhow::Error) -> bool {
    match err.downcast_ref::<sqlx::Error>() {
        Some(sqlx::Error::Database(db_err)) => db_err.is_unique_violation(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::thread::{self, ThreadId};

    use super::*;
    use crate::hashing::Argon2Hasher;

    async fn store() -> IdentityStore {
        let db = Database::in_memory().await.unwrap();
        let hasher = Argon2Hasher::with_costs(256, 1, 1).unwrap();
        IdentityStore::new(db, Arc::new(hasher))
    }

    #[tokio::test]
    async fn register_returns_user_with_assigned_id() {
        let store = store().await;
        let alice = store.register("Alice", "a@x.com", "pw1").await.unwrap();
        let bob = store.register("Bob", "b@x.com", "pw2").await.unwrap();

        assert_eq!(alice.name, "Alice");
        assert_eq!(alice.email, "a@x.com");
        assert_ne!(alice.id, bob.id);
        assert_eq!(store.find_by_id(bob.id).await.unwrap(), Some(bob));
    }

    #[tokio::test]
    async fn duplicate_email_is_a_conflict() {
        let store = store().await;
        let first = store.register("Alice", "a@x.com", "pw1").await.unwrap();

        let err = store
            .register("Impostor", "a@x.com", "other")
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(ref msg) if msg == EMAIL_TAKEN));

        assert_eq!(store.find_by_email("a@x.com").await.unwrap(), Some(first));
    }

    #[tokio::test]
    async fn stores_name_and_email_exactly_as_given() {
        let store = store().await;
        let admin = store
            .register("Admin", "admin@localhost", "pw")
            .await
            .unwrap();
        let alice = store.register("  Alice  ", "a@x.com", "pw").await.unwrap();
        let nameless = store.register("", "b@x.com", "pw").await.unwrap();

        assert_eq!(admin.email, "admin@localhost");
        assert_eq!(alice.name, "  Alice  ");
        assert_eq!(nameless.name, "");

        assert_eq!(
            store.find_by_email("admin@localhost").await.unwrap(),
            Some(admin)
        );
        assert_eq!(store.find_by_id(alice.id).await.unwrap(), Some(alice));
    }

    struct RecordsThread {
        inner: Argon2Hasher,
        threads: Mutex<Vec<ThreadId>>,
    }

    impl CredentialHasher for RecordsThread {
        fn hash(&self, password: &str) -> anyhow::Result<String> {
            self.threads.lock().unwrap().push(thread::current().id());
            self.inner.hash(password)
        }

        fn verify(&self, password: &str, password_hash: &str) -> bool {
            self.threads.lock().unwrap().push(thread::current().id());
            self.inner.verify(password, password_hash)
        }

        fn dummy_hash(&self) -> &str {
            self.inner.dummy_hash()
        }
    }

    #[tokio::test]
    async fn hashing_runs_off_the_async_thread() {
        let hasher = Arc::new(RecordsThread {
            inner: Argon2Hasher::with_costs(256, 1, 1).unwrap(),
            threads: Mutex::new(Vec::new()),
        });
        let db = Database::in_memory().await.unwrap();
        let store = IdentityStore::new(db, hasher.clone());

        store.register("Alice", "a@x.com", "pw1").await.unwrap();
        store.verify_credentials("a@x.com", "pw1").await.unwrap();
        store.verify_credentials("nobody@x.com", "pw1").await.unwrap();

        let threads = hasher.threads.lock().unwrap();
        assert_eq!(threads.len(), 3);
        assert!(threads.iter().all(|id| *id != thread::current().id()));
    }

    #[tokio::test]
    async fn verify_credentials_matches_only_the_right_password() {
        let store = store().await;
        let alice = store.register("Alice", "a@x.com", "pw1").await.unwrap();

        assert_eq!(
            store.verify_credentials("a@x.com", "pw1").await.unwrap(),
            Some(alice)
        );
        assert_eq!(store.verify_credentials("a@x.com", "pw2").await.unwrap(), None);
        assert_eq!(store.verify_credentials("nobody@x.com", "pw1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn lookups_of_missing_users_are_none() {
        let store = store().await;
        assert_eq!(store.find_by_id(42).await.unwrap(), None);
        assert_eq!(store.find_by_email("ghost@x.com").await.unwrap(), None);
    }
}
