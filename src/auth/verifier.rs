//! Credential verification capability.

use async_trait::async_trait;
use std::collections::HashMap;

use crate::config::Config;
use crate::error::{GatewayError, Result};
use crate::types::Claims;

/// Verifies an opaque bearer credential against an identity provider and
/// derives the caller's claims.
///
/// Real deployments implement this against an external provider; the
/// gateway only depends on this surface.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    /// Identifying name of the verification mechanism.
    fn name(&self) -> &str;

    /// Verify `credential`, returning the derived claims or
    /// [`GatewayError::Unauthorized`].
    async fn verify(&self, credential: &str) -> Result<Claims>;
}

/// Token-table verifier backed by configuration.
///
/// Maps known bearer tokens to subjects. Useful for development and tests;
/// production deployments plug in a provider-backed implementation.
pub struct StaticTokenVerifier {
    tokens: HashMap<String, String>,
}

impl StaticTokenVerifier {
    pub fn new(tokens: HashMap<String, String>) -> Self {
        Self { tokens }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.auth_tokens.clone())
    }
}

#[async_trait]
impl TokenVerifier for StaticTokenVerifier {
    fn name(&self) -> &str {
        "static"
    }

    async fn verify(&self, credential: &str) -> Result<Claims> {
        let token = credential.strip_prefix("Bearer ").unwrap_or(credential);
        match self.tokens.get(token) {
            Some(subject) => Ok(Claims::for_subject(subject.clone())),
            None => Err(GatewayError::Unauthorized),
        }
    }
}
