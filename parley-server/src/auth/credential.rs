use async_trait::async_trait;
use parley_core::Identity;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Credential required")]
    Missing,

    #[error("Invalid credential")]
    Invalid,

    #[error("Credential expired")]
    Expired,

    #[error("Failed to issue credential: {0}")]
    Issue(String),
}

/// The signaling boundary's only view of the credential service: turn an
/// opaque bearer credential into the identity it was issued for.
#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    async fn verify(&self, credential: &str) -> Result<Identity, AuthError>;
}

/// Verifies a credential presented at connection time. An absent or empty
/// credential is rejected without consulting the verifier.
pub async fn authenticate(
    verifier: &dyn CredentialVerifier,
    credential: Option<&str>,
) -> Result<Identity, AuthError> {
    let credential = credential
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .ok_or(AuthError::Missing)?;
    verifier.verify(credential).await
}
