//! # rb-auth-simple
//!
//! Argon2-based implementation of `AuthProvider`.
//! Handles password hashing for accounts and the opaque session tokens
//! that identify a logged-in browser.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use rb_core::traits::AuthProvider;
use sha2::{Digest, Sha256};
use uuid::Uuid;

pub struct SimpleAuthProvider {
    params: Params,
}

impl Default for SimpleAuthProvider {
    fn default() -> Self {
        Self { params: Params::default() }
    }
}

impl SimpleAuthProvider {
    /// Argon2id with explicit cost parameters (memory in KiB, iterations, lanes).
    pub fn with_cost(memory_kib: u32, iterations: u32, parallelism: u32) -> anyhow::Result<Self> {
        let params = Params::new(memory_kib, iterations, parallelism, None)
            .map_err(|e| anyhow::anyhow!("invalid argon2 parameters: {e}"))?;
        Ok(Self { params })
    }

    fn hasher(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }
}

impl AuthProvider for SimpleAuthProvider {
    fn hash_password(&self, password: &str) -> anyhow::Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .hasher()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| anyhow::anyhow!("failed to hash password: {e}"))?;
        Ok(hash.to_string())
    }

    /// Verifies if a provided password matches a stored Argon2 hash.
    /// The cost parameters are read from the hash itself.
    fn verify_password(&self, password: &str, hash: &str) -> bool {
        let parsed_hash = match PasswordHash::new(hash) {
            Ok(p) => p,
            Err(_) => return false,
        };
        self.hasher()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok()
    }

    /// Two v4 UUIDs back to back: 244 random bits, hex encoded.
    fn generate_session_token(&self) -> String {
        format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
    }

    fn digest_session_token(&self, token: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(token.as_bytes());
        hex::encode(hasher.finalize())
    }
}
