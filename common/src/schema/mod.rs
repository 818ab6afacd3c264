mod payment;
mod status;
mod transaction;
mod users;

pub use payment::*;
pub use status::*;
pub use transaction::*;
pub use users::*;
