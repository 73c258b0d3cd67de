//! Configuration interpolation for environment variables.

use crate::config::{MeshConfig, ServerConfig};
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;
use tracing::{debug, warn};

static ENV_PLACEHOLDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$\{env:([\w+-]*)}").expect("env placeholder regex should compile"));

/// Interpolate `${env:NAME}` placeholders across the configuration.
///
/// A server whose values cannot be resolved is disabled and keeps the error in
/// `err`; failures in the global authentication/encryption sections abort the load.
pub fn interpolate_config(config: &mut MeshConfig) -> Result<(), InterpolationError> {
    for server in config.servers.iter_mut() {
        if let Err(error) = interpolate_server(server) {
            warn!(server_id = %server.id, "disabling server: {}", error);
            server.err = Some(error.to_string());
            server.enabled = false;
        }
        debug!("Interpolated configuration for server: {}", server.id);
    }

    if let Some(encryption) = config.encryption.as_mut() {
        encryption.key = interpolate_string(&encryption.key)?;
        encryption.iv = interpolate_string(&encryption.iv)?;
    }

    if let Some(login) = config.authentication.login_request.as_mut() {
        login.url = interpolate_string(&login.url)?;
        interpolate_map(&mut login.headers)?;
    }

    Ok(())
}

fn interpolate_server(server: &mut ServerConfig) -> Result<(), InterpolationError> {
    interpolate_map(&mut server.env)?;
    interpolate_map(&mut server.headers)?;
    Ok(())
}

fn interpolate_map(values: &mut IndexMap<String, String>) -> Result<(), InterpolationError> {
    for value in values.values_mut() {
        *value = interpolate_string(value)?;
    }
    Ok(())
}

/// Interpolate a string value, replacing `${env:NAME}` patterns.
pub fn interpolate_string(value: &str) -> Result<String, InterpolationError> {
    let mut result = value.to_string();
    for cap in ENV_PLACEHOLDER.captures_iter(value) {
        let var_name = cap[1].to_string();
        let env_value = std::env::var(&var_name).map_err(|_| InterpolationError::MissingEnvVar { name: var_name.clone() })?;
        debug!("Interpolated env var: {} -> [REDACTED]", var_name);
        result = result.replace(&cap[0], &env_value);
    }
    Ok(result)
}

/// Errors that can occur during interpolation.
#[derive(Debug, Error)]
pub enum InterpolationError {
    #[error("Missing environment variable: {name}")]
    MissingEnvVar { name: String },
}
