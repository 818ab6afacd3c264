use anyhow::anyhow;
use argon2::password_hash::{SaltString, rand_core::OsRng};
use argon2::{Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version};

pub use argon2::Params as Argon2Params;

/// Hashes and checks passwords on behalf of the identity store.
pub trait CredentialHasher: Send + Sync {
    /// Produces a salted PHC-format hash of `password`.
    fn hash(&self, password: &str) -> anyhow::Result<String>;

    /// Checks `password` against a stored hash. Malformed hashes never match.
    fn verify(&self, password: &str, password_hash: &str) -> bool;

    /// A well-formed hash that no real account uses. Verifying against it
    /// costs the same as a real check.
    fn dummy_hash(&self) -> &str;
}

pub struct Argon2Hasher {
    argon2: Argon2<'static>,
    dummy_hash: String,
}

impl Argon2Hasher {
    pub fn new(params: Params) -> anyhow::Result<Self> {
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
        let dummy_hash = hash_with(&argon2, "dummy-password-never-issued")?;
        Ok(Self { argon2, dummy_hash })
    }

    /// Builds a hasher from explicit costs: memory in KiB, passes, lanes.
    pub fn with_costs(memory_kib: u32, iterations: u32, parallelism: u32) -> anyhow::Result<Self> {
        let params = Params::new(memory_kib, iterations, parallelism, None)
            .map_err(|e| anyhow!("Invalid Argon2 parameters: {e}"))?;
        Self::new(params)
    }

    pub fn with_default_costs() -> anyhow::Result<Self> {
        Self::new(Params::default())
    }
}

impl CredentialHasher for Argon2Hasher {
    fn hash(&self, password: &str) -> anyhow::Result<String> {
        hash_with(&self.argon2, password)
    }

    fn verify(&self, password: &str, password_hash: &str) -> bool {
        let hash = match PasswordHash::new(password_hash) {
            Ok(hash) => hash,
            Err(e) => {
                log::error!("Stored password hash is malformed: {}", e);
                return false;
            }
        };
        self.argon2
            .verify_password(password.as_bytes(), &hash)
            .is_ok()
    }

    fn dummy_hash(&self) -> &str {
        &self.dummy_hash
    }
}

fn hash_with(argon2: &Argon2<'_>, password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow!("Failed to hash password: {e}"))?
        .to_string();
    Ok(hash)
}
