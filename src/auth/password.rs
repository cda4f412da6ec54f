// Password hashing and verification service

use std::sync::Arc;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};

use crate::config::HashingConfig;
use crate::error::ApiError;

/// Password service for hashing and verification (Argon2id, random salt)
///
/// Digests are PHC strings, so the cost parameters travel with each hash and
/// older hashes keep verifying after the configured cost changes.
#[derive(Clone)]
pub struct PasswordService {
    argon2: Argon2<'static>,
    // Verified against when a login names no account
    dummy_hash: Arc<str>,
    #[cfg(test)]
    verifications: Arc<std::sync::atomic::AtomicUsize>,
}

impl std::fmt::Debug for PasswordService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordService").finish_non_exhaustive()
    }
}

impl PasswordService {
    /// Create a PasswordService with the given Argon2id cost parameters
    pub fn new(config: HashingConfig) -> Result<Self, ApiError> {
        let params = Params::new(config.memory_kib, config.iterations, config.parallelism, None)
            .map_err(|e| ApiError::InternalError(format!("Invalid Argon2 parameters: {}", e)))?;
        let mut service = Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
            dummy_hash: Arc::from(""),
            #[cfg(test)]
            verifications: Default::default(),
        };
        service.dummy_hash = Arc::from(service.hash_password("dummy-password-0")?);
        Ok(service)
    }

    /// Hash a password using Argon2id
    pub fn hash_password(&self, password: &str) -> Result<String, ApiError> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| ApiError::InternalError(format!("Password hashing failed: {}", e)))
    }

    /// Verify a password against a hash
    ///
    /// Returns `Ok(false)` only for a genuine mismatch. A digest that cannot be
    /// parsed is an internal error, never a silent rejection.
    pub fn verify_password(&self, password: &str, hash: &str) -> Result<bool, ApiError> {
        #[cfg(test)]
        self.verifications.fetch_add(1, std::sync::atomic::Ordering::SeqCst);

        let parsed = PasswordHash::new(hash)
            .map_err(|e| ApiError::InternalError(format!("Invalid password hash format: {}", e)))?;

        match self.argon2.verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(ApiError::InternalError(format!(
                "Password verification failed: {}",
                e
            ))),
        }
    }

    /// Hash on the blocking pool so the executor is not stalled
    pub async fn hash_password_blocking(&self, password: String) -> Result<String, ApiError> {
        let service = self.clone();
        tokio::task::spawn_blocking(move || service.hash_password(&password))
            .await
            .map_err(|e| ApiError::InternalError(format!("Hashing task failed: {}", e)))?
    }

    /// Verify on the blocking pool so the executor is not stalled
    pub async fn verify_password_blocking(
        &self,
        password: String,
        hash: String,
    ) -> Result<bool, ApiError> {
        let service = self.clone();
        tokio::task::spawn_blocking(move || service.verify_password(&password, &hash))
            .await
            .map_err(|e| ApiError::InternalError(format!("Verification task failed: {}", e)))?
    }

    /// Run a full verification against the built-in dummy digest
    ///
    /// The outcome is discarded; only the elapsed work matters.
    pub async fn verify_dummy_blocking(&self, password: String) -> Result<(), ApiError> {
        self.verify_password_blocking(password, self.dummy_hash.to_string())
            .await
            .map(|_| ())
    }

    #[cfg(test)]
    pub fn verification_count(&self) -> usize {
        self.verifications.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
pub(crate) fn test_password_service() -> PasswordService {
    PasswordService::new(HashingConfig {
        memory_kib: 1024,
        iterations: 1,
        parallelism: 1,
    })
    .expect("valid test parameters")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_then_verify() {
        let service = test_password_service();
        let hash = service.hash_password("Passw0rd").unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(!hash.contains("Passw0rd"));
        assert!(service.verify_password("Passw0rd", &hash).unwrap());
        assert!(!service.verify_password("Passw0rd!", &hash).unwrap());
    }

    #[test]
    fn test_same_password_gets_distinct_salts() {
        let service = test_password_service();
        let first = service.hash_password("Passw0rd").unwrap();
        let second = service.hash_password("Passw0rd").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_corrupt_hash_is_internal_error() {
        let service = test_password_service();
        let result = service.verify_password("Passw0rd", "not-a-phc-string");
        assert!(matches!(result, Err(ApiError::InternalError(_))));
    }

    #[test]
    fn test_invalid_params_rejected() {
        let result = PasswordService::new(HashingConfig {
            memory_kib: 1,
            iterations: 0,
            parallelism: 1,
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_dummy_hash_is_a_real_digest() {
        let service = test_password_service();
        assert!(service.dummy_hash.starts_with("$argon2id$"));
        assert!(!service.verify_password("Passw0rd", &service.dummy_hash).unwrap());
    }

    #[tokio::test]
    async fn test_dummy_verification_runs_argon2() {
        let service = test_password_service();
        let before = service.verification_count();
        service
            .verify_dummy_blocking("Passw0rd".to_string())
            .await
            .unwrap();
        assert_eq!(service.verification_count(), before + 1);
    }

    #[tokio::test]
    async fn test_blocking_helpers() {
        let service = test_password_service();
        let hash = service
            .hash_password_blocking("Passw0rd".to_string())
            .await
            .unwrap();
        assert!(service
            .verify_password_blocking("Passw0rd".to_string(), hash)
            .await
            .unwrap());
    }
}
