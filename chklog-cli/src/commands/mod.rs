//! Command handlers -- one module per subcommand, plus the shared setup they need

pub mod canon;
pub mod config;
pub mod rules;
pub mod status;

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use chklog_canon::{RuleRegistry, packs};
use chklog_core::config::ChklogConfig;

use crate::cli::DEFAULT_CONFIG_PATH;
use crate::error::CliError;

/// Where the effective configuration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Loaded from this file.
    File(PathBuf),
    /// No file; defaults plus environment overrides.
    Defaults,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Defaults => f.write_str("(defaults)"),
        }
    }
}

/// Load the effective configuration.
///
/// An explicit `-c` path must exist. Without one, `./chklog.toml` is used when present,
/// otherwise defaults with environment overrides.
pub async fn load_config(explicit: Option<&Path>) -> Result<(ChklogConfig, ConfigSource), CliError> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => {
            let default = PathBuf::from(DEFAULT_CONFIG_PATH);
            if !tokio::fs::try_exists(&default).await.unwrap_or(false) {
                debug!("no config file, using defaults");
                let mut config = ChklogConfig::default();
                config.apply_env_overrides();
                config.validate()?;
                return Ok((config, ConfigSource::Defaults));
            }
            default
        }
    };

    let config = ChklogConfig::load(&path).await?;
    Ok((config, ConfigSource::File(path)))
}

/// Build the rule registry described by the configuration.
///
/// Builtin packs first, then the YAML rule directory, so YAML rules run after builtin ones.
pub async fn build_registry(config: &ChklogConfig) -> Result<RuleRegistry, CliError> {
    let mut registry = RuleRegistry::new();

    if config.canon.builtin_rules {
        packs::install_builtin_with(&mut registry, &config.mark)?;
    }

    if !config.canon.rules_dir.is_empty() {
        let loaded = registry
            .load_rules_from_dir(&config.canon.rules_dir)
            .await?;
        info!(dir = %config.canon.rules_dir, loaded, "loaded rule directory");
    }

    debug!(rules = registry.rule_count(), "rule registry ready");
    Ok(registry)
}

/// Read a build log. Invalid UTF-8 is replaced rather than rejected.
pub async fn read_log(path: &Path) -> Result<String, CliError> {
    let bytes = tokio::fs::read(path).await?;
    Ok(match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => {
            debug!(path = %path.display(), "log is not valid UTF-8, replacing invalid bytes");
            String::from_utf8_lossy(e.as_bytes()).into_owned()
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn build_registry_without_builtin_rules_is_empty() {
        let mut config = ChklogConfig::default();
        config.canon.builtin_rules = false;
        let registry = build_registry(&config).await.expect("registry");
        assert_eq!(registry.rule_count(), 0);
    }

    #[tokio::test]
    async fn build_registry_installs_builtin_packs() {
        let registry = build_registry(&ChklogConfig::default())
            .await
            .expect("registry");
        assert!(registry.rule_count() > 0);
        assert_eq!(registry.projects(), vec!["", "ruby"]);
    }

    #[tokio::test]
    async fn build_registry_missing_rules_dir_is_rule_error() {
        let mut config = ChklogConfig::default();
        config.canon.rules_dir = "/nonexistent/chklog-rules".to_owned();
        let err = build_registry(&config).await.expect_err("missing dir");
        assert!(matches!(err, CliError::Rule(_)));
    }

    #[tokio::test]
    async fn explicit_missing_config_is_config_error() {
        let err = load_config(Some(Path::new("/nonexistent/chklog.toml")))
            .await
            .expect_err("missing file");
        assert_eq!(err.exit_code(), 2);
    }

    #[tokio::test]
    async fn read_log_replaces_invalid_utf8() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("build.log");
        std::fs::write(&path, b"ok \xff\n").expect("write log");
        let text = read_log(&path).await.expect("read");
        assert_eq!(text, "ok \u{fffd}\n");
    }

    #[tokio::test]
    async fn read_log_missing_file_is_io_error() {
        let err = read_log(Path::new("/nonexistent/build.log"))
            .await
            .expect_err("missing log");
        assert_eq!(err.exit_code(), 10);
    }
}
