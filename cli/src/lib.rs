mod args;

use std::sync::Arc;

pub use args::{Args, Commands, CreateUserArgs};
use clap::Parser;
use common::{Argon2Hasher, DEFAULT_DATABASE_URL, Database, IdentityStore};

/// Runs the CLI command parser and executes the selected command.
/// Returns true if a CLI command was handled, false otherwise.
pub async fn run_cli() -> bool {
    let args = Args::parse();
    match &args.command {
        Some(Commands::CreateUser(user_args)) => {
            match create_user(&user_args.name, &user_args.email, &user_args.password).await {
                Ok(id) => println!("User '{}' created with id {}.", user_args.email, id),
                Err(e) => eprintln!("Failed to create user: {e:#}"),
            }
            true
        }
        None => false,
    }
}

/// Registers a user through the identity store and returns its id.
async fn create_user(name: &str, email: &str, password: &str) -> anyhow::Result<i64> {
    let database_url = database_url(std::env::var("DATABASE_URL").ok());
    let db = Database::new(&database_url).await?;

    let hasher = Argon2Hasher::with_default_costs()?;
    let identity = IdentityStore::new(db, Arc::new(hasher));

    let user = identity.register(name, email, password).await?;
    Ok(user.id)
}

/// Same fallback as the server, so both open the same database.
fn database_url(configured: Option<String>) -> String {
    configured.unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string())
}
