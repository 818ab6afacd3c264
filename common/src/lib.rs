mod db;
mod error;
mod hashing;
mod identity;
mod ledger;
mod schema;

pub use db::*;
pub use error::*;
pub use hashing::*;
pub use identity::*;
pub use ledger::*;
pub use schema::*;
