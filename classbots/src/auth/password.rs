//! Password and PIN hashing and verification.
//!
//! Both teacher passwords and student PINs are stored as Argon2id PHC strings. Hashing is
//! CPU-bound, so async callers go through [`hash_secret`] and [`verify_secret`], which run
//! the work on tokio's blocking pool.

use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use std::sync::Arc;

use tokio::sync::OnceCell;

use crate::config::PasswordConfig;
use crate::errors::Error;

const DECOY_SECRET: &str = "classbots-decoy-secret";

/// Argon2 hashing parameters.
#[derive(Debug, Clone, Copy)]
pub struct Argon2Params {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Argon2Params {
    /// Create Argon2 instance with these parameters.
    fn to_argon2(self) -> Result<Argon2<'static>, Error> {
        let params = Params::new(self.memory_kib, self.iterations, self.parallelism, None).map_err(|e| Error::Internal {
            operation: format!("create argon2 params: {e}"),
        })?;

        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }
}

impl Default for Argon2Params {
    /// Argon2id RFC recommendations
    fn default() -> Self {
        Self {
            memory_kib: 19456, // 19 MB
            iterations: 2,
            parallelism: 1,
        }
    }
}

impl From<&PasswordConfig> for Argon2Params {
    fn from(config: &PasswordConfig) -> Self {
        Self {
            memory_kib: config.argon2_memory_kib,
            iterations: config.argon2_iterations,
            parallelism: config.argon2_parallelism,
        }
    }
}

/// Hash a string using Argon2 with the given parameters, or secure defaults if None.
pub fn hash_string_with_params(input: &str, params: Option<Argon2Params>) -> Result<String, Error> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = params.unwrap_or_default().to_argon2()?;

    let hash = argon2.hash_password(input.as_bytes(), &salt).map_err(|e| Error::Internal {
        operation: format!("hash string: {e}"),
    })?;

    Ok(hash.to_string())
}

/// Hash a string using Argon2 with default secure parameters.
pub fn hash_string(input: &str) -> Result<String, Error> {
    hash_string_with_params(input, None)
}

/// Verify a string against a hash.
///
/// Verification uses the parameters embedded in the hash itself.
pub fn verify_string(input: &str, hash: &str) -> Result<bool, Error> {
    let parsed_hash = PasswordHash::new(hash).map_err(|e| Error::Internal {
        operation: format!("parse hash: {e}"),
    })?;

    let argon2 = Argon2::default();
    Ok(argon2.verify_password(input.as_bytes(), &parsed_hash).is_ok())
}

/// Hash on a blocking thread to avoid stalling the async runtime
pub async fn hash_secret(secret: String, params: Argon2Params) -> Result<String, Error> {
    tokio::task::spawn_blocking(move || hash_string_with_params(&secret, Some(params)))
        .await
        .map_err(|e| Error::Internal {
            operation: format!("spawn hashing task: {e}"),
        })?
}

/// Verify on a blocking thread to avoid stalling the async runtime
pub async fn verify_secret(secret: String, hash: String) -> Result<bool, Error> {
    tokio::task::spawn_blocking(move || verify_string(&secret, &hash))
        .await
        .map_err(|e| Error::Internal {
            operation: format!("spawn verification task: {e}"),
        })?
}

/// A hash verified in place of a missing account's hash, so that an unknown identity costs the
/// same Argon2 work as a wrong secret.
///
/// Built with the configured parameters on first use and shared by every clone.
#[derive(Clone)]
pub struct DecoyHash {
    params: Argon2Params,
    hash: Arc<OnceCell<String>>,
}

impl DecoyHash {
    pub fn new(params: Argon2Params) -> Self {
        Self {
            params,
            hash: Arc::new(OnceCell::new()),
        }
    }

    /// Verify `secret` against the decoy. The outcome is always a rejection.
    pub async fn verify(&self, secret: &str) -> Result<(), Error> {
        let hash = self
            .hash
            .get_or_try_init(|| hash_secret(DECOY_SECRET.to_string(), self.params))
            .await?;
        verify_secret(secret.to_string(), hash.clone()).await?;
        Ok(())
    }

    #[cfg(test)]
    pub fn is_built(&self) -> bool {
        self.hash.initialized()
    }
}

impl From<&PasswordConfig> for DecoyHash {
    fn from(config: &PasswordConfig) -> Self {
        Self::new(Argon2Params::from(config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_params() -> Argon2Params {
        Argon2Params {
            memory_kib: 1024,
            iterations: 1,
            parallelism: 1,
        }
    }

    #[test]
    fn test_string_hashing() {
        let input = "test_password_123";
        let hash = hash_string(input).unwrap();

        assert!(!hash.is_empty());
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_string(input, &hash).unwrap());
        assert!(!verify_string("wrong_password", &hash).unwrap());
    }

    #[test]
    fn test_same_input_different_hashes() {
        let hash1 = hash_string_with_params("1234", Some(fast_params())).unwrap();
        let hash2 = hash_string_with_params("1234", Some(fast_params())).unwrap();

        // Salted
        assert_ne!(hash1, hash2);
        assert!(verify_string("1234", &hash1).unwrap());
        assert!(verify_string("1234", &hash2).unwrap());
    }

    #[test]
    fn test_verify_rejects_malformed_hash() {
        let result = verify_string("1234", "not-a-phc-string");
        assert!(matches!(result, Err(Error::Internal { .. })));
    }

    #[test]
    fn test_invalid_params_rejected() {
        let params = Argon2Params {
            memory_kib: 1,
            iterations: 0,
            parallelism: 1,
        };
        assert!(hash_string_with_params("1234", Some(params)).is_err());
    }

    #[tokio::test]
    async fn test_blocking_helpers() {
        let hash = hash_secret("4321".to_string(), fast_params()).await.unwrap();
        assert!(verify_secret("4321".to_string(), hash.clone()).await.unwrap());
        assert!(!verify_secret("0000".to_string(), hash).await.unwrap());
    }

    #[tokio::test]
    async fn test_decoy_hash_is_built_once() {
        let decoy = DecoyHash::new(fast_params());
        assert!(!decoy.is_built());

        decoy.verify("1234").await.unwrap();
        assert!(decoy.is_built());
        let first = decoy.hash.get().cloned();

        let clone = decoy.clone();
        clone.verify(DECOY_SECRET).await.unwrap();
        assert_eq!(clone.hash.get().cloned(), first);
        assert!(first.is_some_and(|h| h.starts_with("$argon2id$")));
    }
}
