//! Contract of the external credential check that precedes a session

use async_trait::async_trait;
use tracing::warn;

use crate::error::CredentialError;
use crate::session::Identity;

/// Checks an email/password pair and returns who it belongs to. Password
/// storage and hashing live behind this seam.
#[async_trait]
pub trait CredentialValidator: Send + Sync {
    async fn validate(&self, email: &str, password: &str) -> Result<Identity, CredentialError>;
}

/// Stand-in used when no credential service is configured; refuses every login
#[derive(Debug, Default)]
pub struct NoCredentialBackend;

#[async_trait]
impl CredentialValidator for NoCredentialBackend {
    async fn validate(&self, email: &str, _password: &str) -> Result<Identity, CredentialError> {
        warn!("Login attempt for {} refused: no credential validator configured", email);
        Err(CredentialError::Unavailable("no credential validator configured".to_string()))
    }
}
