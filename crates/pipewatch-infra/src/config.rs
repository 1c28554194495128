//! Engine configuration loader.
//!
//! Reads `config.toml` from the data directory (`~/.pipewatch/` in production)
//! and deserializes it into [`EngineConfig`]. Falls back to defaults when the
//! file is missing or malformed.

use std::path::Path;

use pipewatch_types::config::EngineConfig;

use crate::filesystem::config_path;

/// Load the engine configuration from `{data_dir}/config.toml`.
///
/// - Missing file: [`EngineConfig::default()`].
/// - Unreadable or unparseable file: logs a warning and returns the default.
pub async fn load_engine_config(data_dir: &Path) -> EngineConfig {
    let config_path = config_path(data_dir);

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            return EngineConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return EngineConfig::default();
        }
    };

    match toml::from_str::<EngineConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            EngineConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipewatch_types::config::ConditionScope;
    use tempfile::TempDir;

    #[tokio::test]
    async fn load_engine_config_missing_file_returns_default() {
        let tmp = TempDir::new().unwrap();
        let config = load_engine_config(tmp.path()).await;
        assert_eq!(config, EngineConfig::default());
    }

    #[tokio::test]
    async fn load_engine_config_valid_toml_returns_parsed() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(
            tmp.path().join("config.toml"),
            r#"
[engine]
condition_scope = "outputs"
recover_on_start = true

[server]
port = 8080

[agents.http]
timeout_secs = 5
"#,
        )
        .await
        .unwrap();

        let config = load_engine_config(tmp.path()).await;
        assert_eq!(config.engine.condition_scope, ConditionScope::Outputs);
        assert!(config.engine.recover_on_start);
        assert_eq!(config.engine.default_list_limit, 20);
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.agents.http.timeout_secs, 5);
    }

    #[tokio::test]
    async fn load_engine_config_invalid_toml_returns_default() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(tmp.path().join("config.toml"), "this is not { valid toml !!!")
            .await
            .unwrap();

        let config = load_engine_config(tmp.path()).await;
        assert_eq!(config, EngineConfig::default());
    }
}
