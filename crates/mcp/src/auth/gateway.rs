use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, warn};

use super::{Credentials, CredentialValidator, HttpCredentialValidator, TokenCipher};
use crate::config::MeshConfig;
use crate::types::GatewayError;

const TOKEN_MISSING: &str = "Token is missing.";
const INVALID_CREDENTIALS: &str = "Invalid or missing credentials.";
const AUTHENTICATION_FAILED: &str = "Authentication failed.";

/// Gatekeeper run before every list and call.
///
/// When disabled, every request is admitted without looking at the token.
#[derive(Clone)]
pub struct AuthGateway {
    inner: Option<EnabledAuth>,
}

#[derive(Clone)]
struct EnabledAuth {
    cipher: TokenCipher,
    validator: Arc<dyn CredentialValidator>,
}

impl std::fmt::Debug for AuthGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthGateway").field("enabled", &self.is_enabled()).finish()
    }
}

impl AuthGateway {
    /// Admit every request.
    pub fn disabled() -> Self {
        Self { inner: None }
    }

    /// Require a token that decrypts with `cipher` and passes `validator`.
    pub fn enabled(cipher: TokenCipher, validator: Arc<dyn CredentialValidator>) -> Self {
        Self {
            inner: Some(EnabledAuth { cipher, validator }),
        }
    }

    /// Build from the `authentication` and `encryption` sections.
    pub fn from_config(config: &MeshConfig) -> Result<Self> {
        if !config.authentication.enabled {
            return Ok(Self::disabled());
        }

        let encryption = config
            .encryption
            .as_ref()
            .context("authentication is enabled but 'encryption' is missing")?;
        let template = config
            .authentication
            .login_request
            .clone()
            .context("authentication is enabled but 'loginRequest' is missing")?;

        let cipher = TokenCipher::from_config(encryption)?;
        let validator = HttpCredentialValidator::new(template)?;
        Ok(Self::enabled(cipher, Arc::new(validator)))
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.is_some()
    }

    /// Admit or reject a request carrying `token`.
    pub async fn authenticate(&self, token: Option<&str>) -> Result<(), GatewayError> {
        let Some(auth) = &self.inner else {
            return Ok(());
        };

        let token = token.map(str::trim).filter(|token| !token.is_empty());
        let Some(token) = token else {
            return Err(GatewayError::unauthorized(TOKEN_MISSING));
        };

        let credentials: Credentials = match auth.cipher.decrypt(token) {
            Ok(credentials) => credentials,
            Err(error) => {
                debug!("token rejected: {}", error);
                return Err(GatewayError::unauthorized(INVALID_CREDENTIALS));
            }
        };
        if !credentials.is_complete() {
            return Err(GatewayError::unauthorized(INVALID_CREDENTIALS));
        }

        match auth.validator.validate(&credentials.username, &credentials.password).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(GatewayError::unauthorized(AUTHENTICATION_FAILED)),
            Err(error) => {
                warn!("credential validation failed: {}", error);
                Err(GatewayError::unauthorized(AUTHENTICATION_FAILED))
            }
        }
    }
}
