use std::sync::Arc;

use common::{CredentialHasher, Database, IdentityStore, PaymentLedger, PaymentProcessor};

use crate::auth::TokenIssuer;

pub struct AppState {
    pub identity: IdentityStore,
    pub ledger: PaymentLedger,
    pub tokens: TokenIssuer,
}
impl AppState {
    pub fn new(
        db: Database,
        hasher: Arc<dyn CredentialHasher>,
        processor: Arc<dyn PaymentProcessor>,
        tokens: TokenIssuer,
    ) -> Self {
        AppState {
            identity: IdentityStore::new(db.clone(), hasher),
            ledger: PaymentLedger::new(db, processor),
            tokens,
        }
    }
}
