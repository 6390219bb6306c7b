//! HS256 bearer credentials.
//!
//! The identity bound to a connection is `"{sub}-{session_id}"`, so the same
//! user logged in twice gets two distinct identities.

use crate::auth::{AuthError, CredentialVerifier};
use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use parley_core::Identity;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

/// Tokens larger than this are rejected before any decoding.
pub const MAX_CREDENTIAL_SIZE_BYTES: usize = 8192;

pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    pub sub: String,
    #[serde(default)]
    pub session_id: String,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn identity(&self) -> Identity {
        if self.session_id.is_empty() {
            Identity::new(self.sub.clone())
        } else {
            Identity::new(format!("{}-{}", self.sub, self.session_id))
        }
    }
}

#[derive(Clone)]
pub struct JwtCredentials {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl JwtCredentials {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl,
        }
    }

    /// Issues a credential for `subject` with a fresh session id.
    pub fn issue(&self, subject: &str) -> Result<String, AuthError> {
        if subject.trim().is_empty() {
            return Err(AuthError::Issue("subject must not be empty".into()));
        }

        let now = Utc::now();
        let ttl = chrono::Duration::from_std(self.ttl)
            .map_err(|e| AuthError::Issue(e.to_string()))?;
        let claims = Claims {
            sub: subject.to_owned(),
            session_id: Uuid::new_v4().simple().to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Issue(e.to_string()))
    }

    pub fn claims(&self, token: &str) -> Result<Claims, AuthError> {
        if token.len() > MAX_CREDENTIAL_SIZE_BYTES {
            debug!(size = token.len(), "Credential exceeds size limit");
            return Err(AuthError::Invalid);
        }

        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            debug!(error = %e, "Credential rejected");
            match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::Expired,
                _ => AuthError::Invalid,
            }
        })?;

        if data.claims.sub.trim().is_empty() {
            return Err(AuthError::Invalid);
        }
        Ok(data.claims)
    }
}

#[async_trait]
impl CredentialVerifier for JwtCredentials {
    async fn verify(&self, credential: &str) -> Result<Identity, AuthError> {
        self.claims(credential).map(|claims| claims.identity())
    }
}
