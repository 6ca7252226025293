//! Password hashing and verification.
//!
//! bcrypt with a configurable work factor. The salt is randomized per hash and
//! embedded in the digest, so verification needs nothing beyond the digest
//! itself. Hashing runs on the blocking thread pool to keep request workers
//! free during the (intentionally slow) key derivation.

use tracing::error;

/// Default bcrypt work factor.
pub const DEFAULT_COST: u32 = 12;

/// One-way salted password hasher with a fixed cost.
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    /// Hash a plaintext password. Two calls with the same input produce
    /// different digests (random salt).
    pub async fn hash(&self, plaintext: &str) -> Result<String, HashError> {
        let cost = self.cost;
        let plaintext = plaintext.to_string();

        tokio::task::spawn_blocking(move || bcrypt::hash(plaintext, cost))
            .await
            .map_err(|_| HashError::TaskFailed)?
            .map_err(HashError::Bcrypt)
    }

    /// Verify a plaintext password against a stored digest.
    /// Returns false for a wrong password or a malformed digest, never errors.
    pub async fn verify(&self, plaintext: &str, digest: &str) -> bool {
        let plaintext = plaintext.to_string();
        let digest = digest.to_string();

        match tokio::task::spawn_blocking(move || bcrypt::verify(plaintext, &digest)).await {
            Ok(Ok(matches)) => matches,
            Ok(Err(_)) => false,
            Err(e) => {
                error!(error = %e, "Password verification task failed");
                false
            }
        }
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(DEFAULT_COST)
    }
}

/// Errors that can occur while hashing a password.
/// Surfaced as an internal failure, never as an authentication failure.
#[derive(Debug)]
pub enum HashError {
    /// bcrypt rejected the input or ran out of resources
    Bcrypt(bcrypt::BcryptError),
    /// The blocking task was cancelled or panicked
    TaskFailed,
}

impl std::fmt::Display for HashError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HashError::Bcrypt(e) => write!(f, "Failed to hash password: {}", e),
            HashError::TaskFailed => write!(f, "Password hashing task failed"),
        }
    }
}

impl std::error::Error for HashError {}

#[cfg(test)]
mod tests {
    use super::*;

    // Minimum cost keeps tests fast; production default is DEFAULT_COST.
    fn test_hasher() -> PasswordHasher {
        PasswordHasher::new(4)
    }

    #[tokio::test]
    async fn test_hash_and_verify() {
        let hasher = test_hasher();

        let digest = hasher.hash("correct horse battery").await.unwrap();
        assert!(hasher.verify("correct horse battery", &digest).await);
        assert!(!hasher.verify("wrong password", &digest).await);
    }

    #[tokio::test]
    async fn test_digest_never_equals_plaintext() {
        let hasher = test_hasher();

        let digest = hasher.hash("hunter22").await.unwrap();
        assert_ne!(digest, "hunter22");
    }

    #[tokio::test]
    async fn test_salt_randomization() {
        let hasher = test_hasher();

        let first = hasher.hash("same input").await.unwrap();
        let second = hasher.hash("same input").await.unwrap();
        assert_ne!(first, second, "identical inputs must produce distinct digests");

        // Both still verify
        assert!(hasher.verify("same input", &first).await);
        assert!(hasher.verify("same input", &second).await);
    }

    #[tokio::test]
    async fn test_malformed_digest_returns_false() {
        let hasher = test_hasher();

        assert!(!hasher.verify("anything", "not-a-bcrypt-digest").await);
        assert!(!hasher.verify("anything", "").await);
    }
}
