//! Configuration IO helpers.

use crate::config::{ConfigError, MeshConfig, interpolate_config, validate_config};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_CONFIG_FILE: &str = "mesh.json";

/// Returns the default path for the mesh configuration file.
///
/// `MESH_CONFIG_PATH` wins when set and non-blank; otherwise `./mesh.json`.
pub fn default_config_path() -> PathBuf {
    if let Ok(path) = env::var("MESH_CONFIG_PATH")
        && !path.trim().is_empty()
    {
        return PathBuf::from(path);
    }

    PathBuf::from(DEFAULT_CONFIG_FILE)
}

/// Loads, interpolates and validates configuration from a specific path.
///
/// Files ending in `.yaml` / `.yml` are parsed as YAML, everything else as JSON.
pub fn load_config_from_path(path: &Path) -> Result<MeshConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound { path: path.to_path_buf() });
    }

    let content = fs::read_to_string(path)?;
    let mut config = parse_config(&content, is_yaml(path))?;
    interpolate_config(&mut config)?;
    validate_config(&config)?;
    Ok(config)
}

fn parse_config(content: &str, yaml: bool) -> Result<MeshConfig, ConfigError> {
    if yaml {
        Ok(serde_yaml::from_str(content)?)
    } else {
        Ok(serde_json::from_str(content)?)
    }
}

fn is_yaml(path: &Path) -> bool {
    path.extension()
        .and_then(|extension| extension.to_str())
        .is_some_and(|extension| extension.eq_ignore_ascii_case("yaml") || extension.eq_ignore_ascii_case("yml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_path_honors_environment_override() {
        temp_env::with_var("MESH_CONFIG_PATH", Some("/etc/mesh/gateway.yaml"), || {
            assert_eq!(default_config_path(), PathBuf::from("/etc/mesh/gateway.yaml"));
        });
        temp_env::with_var("MESH_CONFIG_PATH", Some("  "), || {
            assert_eq!(default_config_path(), PathBuf::from("mesh.json"));
        });
    }

    #[test]
    fn loads_json_file() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(
            file,
            r#"{{ "servers": [{{ "id": "fs", "command": "node" }}], "packages": [{{ "id": "default", "servers": ["fs"] }}] }}"#
        )
        .unwrap();

        let config = load_config_from_path(file.path()).unwrap();
        assert_eq!(config.servers[0].id, "fs");
        assert_eq!(config.packages[0].id, "default");
    }

    #[test]
    fn loads_yaml_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "servers:\n  - id: fs\n    command: node\n    toolPrefix: fs\npackages:\n  - id: search\n    servers: [fs]").unwrap();

        let config = load_config_from_path(file.path()).unwrap();
        assert_eq!(config.servers[0].naming.tool_prefix, "fs");
        assert_eq!(config.packages[0].servers, vec!["fs"]);
    }

    #[test]
    fn missing_file_is_reported() {
        let result = load_config_from_path(Path::new("/definitely/not/here/mesh.json"));
        assert!(matches!(result, Err(ConfigError::NotFound { .. })));
    }

    #[test]
    fn invalid_config_fails_validation() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"{{ "servers": [{{ "id": "fs" }}] }}"#).unwrap();
        assert!(matches!(load_config_from_path(file.path()), Err(ConfigError::Validation(_))));
    }
}
