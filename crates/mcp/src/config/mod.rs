//! Configuration management for the mesh gateway.
//! This module handles parsing, interpolation and validation of the
//! gateway configuration file.

mod interpolation;
mod io;
mod model;
mod validation;

pub use interpolation::{InterpolationError, interpolate_config, interpolate_string};
pub use io::{default_config_path, load_config_from_path};
pub use model::{
    AuthenticationConfig, ConfigError, EncryptionConfig, HttpServerConfig, LoginRequestTemplate, MeshConfig, NamingPolicy, PackageConfig,
    ServerConfig, TransportType,
};
pub use validation::{ValidationError, validate_config, validate_id, validate_server};
