use argon2::{
    password_hash::{
        Error as PasswordHashError, PasswordHash, PasswordHasher as _, PasswordVerifier,
        SaltString,
    },
    Algorithm, Argon2, Params, Version,
};
use async_trait::async_trait;
use rand_core::OsRng;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum HashError {
    #[error("Password hashing failed")]
    HashFailed,

    #[error("Password verification failed")]
    VerifyFailed,

    #[error("Background task failed")]
    TaskFailed,
}

#[async_trait]
pub trait PasswordHasher: Send + Sync {
    async fn hash_password(&self, password: &str) -> Result<String, HashError>;
    async fn verify_password(&self, password: &str, hash: &str) -> Result<bool, HashError>;
}

/// Argon2id hasher. Hashing runs on the blocking pool so request tasks are
/// never stalled by the KDF.
#[derive(Clone)]
pub struct Argon2Hasher {
    params: Params,
}

impl Argon2Hasher {
    /// 19 MiB, 2 iterations, 1 lane.
    pub fn new() -> Self {
        Self {
            params: Params::default(),
        }
    }

    pub fn with_params(memory_kib: u32, iterations: u32, parallelism: u32) -> Result<Self, HashError> {
        let params =
            Params::new(memory_kib, iterations, parallelism, None).map_err(|_| HashError::HashFailed)?;
        Ok(Self { params })
    }
}

impl Default for Argon2Hasher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PasswordHasher for Argon2Hasher {
    async fn hash_password(&self, password: &str) -> Result<String, HashError> {
        let password = password.to_string();
        let params = self.params.clone();

        tokio::task::spawn_blocking(move || {
            let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
            let salt = SaltString::generate(&mut OsRng);
            argon2
                .hash_password(password.as_bytes(), &salt)
                .map(|hash| hash.to_string())
                .map_err(|_| HashError::HashFailed)
        })
        .await
        .map_err(|_| HashError::TaskFailed)?
    }

    async fn verify_password(&self, password: &str, hash: &str) -> Result<bool, HashError> {
        let password = password.to_string();
        let hash = hash.to_string();

        tokio::task::spawn_blocking(move || {
            let parsed_hash = PasswordHash::new(&hash).map_err(|_| HashError::VerifyFailed)?;

            // Parameters are read back from the PHC string.
            match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
                Ok(_) => Ok(true),
                Err(PasswordHashError::Password) => Ok(false),
                Err(_) => Err(HashError::VerifyFailed),
            }
        })
        .await
        .map_err(|_| HashError::TaskFailed)?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_hasher() -> Argon2Hasher {
        Argon2Hasher::with_params(1024, 1, 1).unwrap()
    }

    #[tokio::test]
    async fn test_hash_and_verify_password() {
        let hasher = fast_hasher();
        let hash = hasher.hash_password("SecurePassword123").await.unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(hasher.verify_password("SecurePassword123", &hash).await.unwrap());
        assert!(!hasher.verify_password("WrongPassword", &hash).await.unwrap());
    }

    #[tokio::test]
    async fn test_same_password_gets_distinct_salts() {
        let hasher = fast_hasher();
        let a = hasher.hash_password("pw-123456").await.unwrap();
        let b = hasher.hash_password("pw-123456").await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_malformed_hash_is_an_error() {
        let hasher = fast_hasher();
        let result = hasher.verify_password("anything", "not-a-phc-string").await;
        assert!(matches!(result, Err(HashError::VerifyFailed)));
    }

    #[test]
    fn test_invalid_params_are_rejected() {
        assert!(Argon2Hasher::with_params(1, 0, 0).is_err());
    }
}
