use crate::model::ConfigError;
use crate::parser::DEFAULT_DESCRIPTION_MAX_LEN;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database_path: String,
    pub description_max_len: usize,
    /// JSON dictionary file replacing some or all built-in tables.
    pub dictionary_path: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_path: "axis.db".to_string(),
            description_max_len: DEFAULT_DESCRIPTION_MAX_LEN,
            dictionary_path: None,
        }
    }
}

pub fn load_config(path: impl AsRef<Path>) -> Result<AppConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: AppConfig = serde_json::from_str(&content)?;
    Ok(config)
}

/// Like `load_config`, but a missing file means defaults.
pub fn load_or_default(path: impl AsRef<Path>) -> Result<AppConfig, ConfigError> {
    let path = path.as_ref();
    if !path.exists() {
        info!("No config at {}, using defaults", path.display());
        return Ok(AppConfig::default());
    }
    load_config(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn partial_config_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "database_path": "/tmp/x.db" }}"#).unwrap();
        let cfg = load_config(file.path()).unwrap();
        assert_eq!(cfg.database_path, "/tmp/x.db");
        assert_eq!(cfg.description_max_len, DEFAULT_DESCRIPTION_MAX_LEN);
        assert!(cfg.dictionary_path.is_none());
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_or_default(dir.path().join("config.json")).unwrap();
        assert_eq!(cfg.database_path, "axis.db");
    }

    #[test]
    fn malformed_config_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        assert!(matches!(load_config(file.path()), Err(ConfigError::Json(_))));
    }
}
