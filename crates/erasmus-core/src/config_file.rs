use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// On-disk TOML configuration structure.
/// All fields are optional so partial configs work (merge with defaults).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    pub model: Option<ModelConfig>,
    pub storage: Option<StorageConfig>,
    pub sessions: Option<SessionsConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelConfig {
    pub api_key: Option<String>,
    pub model_name: Option<String>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    pub database_path: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionsConfig {
    pub ttl_secs: Option<u64>,
}

/// Platform config directory path: `<config_dir>/erasmus-advisor/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("erasmus-advisor").join("config.toml"))
}

/// Load config by cascading CWD `.erasmus-advisor.toml` over platform config.
/// CWD values override platform values.
pub fn load_config() -> ConfigFile {
    let platform = config_path().and_then(|p| load_from_path(&p));
    let cwd = load_from_path(&PathBuf::from(".erasmus-advisor.toml"));

    match (platform, cwd) {
        (None, None) => ConfigFile::default(),
        (Some(p), None) => p,
        (None, Some(c)) => c,
        (Some(p), Some(c)) => merge(p, c),
    }
}

/// Load a config from a specific path. Returns `None` if the file doesn't
/// exist or can't be parsed.
pub fn load_from_path(path: &PathBuf) -> Option<ConfigFile> {
    let content = std::fs::read_to_string(path).ok()?;
    toml::from_str(&content).ok()
}

/// Merge two configs: `overlay` values take precedence over `base`.
pub fn merge(base: ConfigFile, overlay: ConfigFile) -> ConfigFile {
    ConfigFile {
        model: Some(ModelConfig {
            api_key: overlay
                .model
                .as_ref()
                .and_then(|m| m.api_key.clone())
                .or_else(|| base.model.as_ref().and_then(|m| m.api_key.clone())),
            model_name: overlay
                .model
                .as_ref()
                .and_then(|m| m.model_name.clone())
                .or_else(|| base.model.as_ref().and_then(|m| m.model_name.clone())),
            timeout_secs: overlay
                .model
                .as_ref()
                .and_then(|m| m.timeout_secs)
                .or_else(|| base.model.as_ref().and_then(|m| m.timeout_secs)),
        }),
        storage: Some(StorageConfig {
            database_path: overlay
                .storage
                .as_ref()
                .and_then(|s| s.database_path.clone())
                .or_else(|| base.storage.as_ref().and_then(|s| s.database_path.clone())),
        }),
        sessions: Some(SessionsConfig {
            ttl_secs: overlay
                .sessions
                .as_ref()
                .and_then(|s| s.ttl_secs)
                .or_else(|| base.sessions.as_ref().and_then(|s| s.ttl_secs)),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_partial_config() {
        let config: ConfigFile = toml::from_str(
            r#"
            [model]
            model_name = "gemini-2.0-flash"
            "#,
        )
        .unwrap();
        assert_eq!(
            config.model.as_ref().and_then(|m| m.model_name.as_deref()),
            Some("gemini-2.0-flash")
        );
        assert!(config.storage.is_none());
    }

    #[test]
    fn overlay_wins_where_set() {
        let base: ConfigFile = toml::from_str(
            r#"
            [model]
            api_key = "base-key"
            model_name = "base-model"

            [sessions]
            ttl_secs = 600
            "#,
        )
        .unwrap();
        let overlay: ConfigFile = toml::from_str(
            r#"
            [model]
            model_name = "overlay-model"
            "#,
        )
        .unwrap();

        let merged = merge(base, overlay);
        let model = merged.model.unwrap();
        assert_eq!(model.api_key.as_deref(), Some("base-key"));
        assert_eq!(model.model_name.as_deref(), Some("overlay-model"));
        assert_eq!(merged.sessions.unwrap().ttl_secs, Some(600));
    }

    #[test]
    fn missing_file_is_none() {
        assert!(load_from_path(&PathBuf::from("/nonexistent/config.toml")).is_none());
    }
}
