use std::path::Path;

use peerlink_p2p::TransportConfig;

use crate::infrastructure::error::{CliError, Result};

/// Load a transport config from a JSON file, or the defaults without one
pub fn load_config(path: Option<&Path>) -> Result<TransportConfig> {
    let Some(path) = path else {
        return Ok(TransportConfig::default());
    };

    if !path.exists() {
        return Err(CliError::config_not_found(path.to_path_buf()));
    }

    let json = std::fs::read_to_string(path)?;
    let config =
        TransportConfig::from_json_str(&json).map_err(|e| CliError::InvalidConfig(e.to_string()))?;

    tracing::debug!("Loaded config from {}", path.display());
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_no_path_gives_defaults() {
        assert_eq!(load_config(None).unwrap(), TransportConfig::default());
    }

    #[test]
    fn test_missing_file() {
        let path = PathBuf::from("/definitely/not/here/peerlink.json");
        assert!(matches!(
            load_config(Some(&path)),
            Err(CliError::ConfigFileNotFound { .. })
        ));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let path = std::env::temp_dir().join(format!("peerlink-config-{}.json", std::process::id()));
        std::fs::write(&path, r#"{ "max_connections": 3 }"#).unwrap();

        let config = load_config(Some(&path)).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(config.max_connections, 3);
        assert_eq!(config.timeout_ms, 15_000);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let path = std::env::temp_dir().join(format!("peerlink-bad-{}.json", std::process::id()));
        std::fs::write(&path, r#"{ "tick_rate_ms": 0 }"#).unwrap();

        let result = load_config(Some(&path));
        std::fs::remove_file(&path).unwrap();

        assert!(matches!(result, Err(CliError::InvalidConfig(_))));
    }
}
