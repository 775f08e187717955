//! CLI-specific error types and exit code mapping

use chklog_canon::CanonError;
use chklog_core::error::ChklogError;

/// CLI-specific error type.
///
/// Each variant carries enough context for a user-friendly message.
/// The `exit_code()` method maps errors to standard Unix exit codes.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration loading or validation failure.
    #[error("configuration error: {0}")]
    Config(String),

    /// A subcommand-specific operation failed.
    #[error("{0}")]
    Command(String),

    /// JSON serialisation failed during output rendering.
    #[error("json output error: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    /// IO error (log read, stdout write, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapped domain error from chklog-core.
    #[error("{0}")]
    Core(#[from] ChklogError),

    /// Rule registration or loading error.
    #[error("rule error: {0}")]
    Rule(String),
}

impl CliError {
    /// Map the error to a process exit code.
    ///
    /// | Code | Meaning                |
    /// |------|------------------------|
    /// | 0    | Success                |
    /// | 1    | General / command error |
    /// | 2    | Configuration error    |
    /// | 10   | IO error               |
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Core(ChklogError::Config(_)) => 2,
            Self::Io(_) | Self::Core(ChklogError::Io(_)) => 10,
            Self::JsonSerialize(_) | Self::Command(_) | Self::Core(_) | Self::Rule(_) => 1,
        }
    }
}

impl From<CanonError> for CliError {
    fn from(e: CanonError) -> Self {
        Self::Rule(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chklog_core::error::{ConfigError, RuleError};

    #[test]
    fn test_exit_code_config_error() {
        let err = CliError::Config("test error".to_owned());
        assert_eq!(err.exit_code(), 2, "config error should return exit code 2");
    }

    #[test]
    fn test_exit_code_core_config_error() {
        let err = CliError::Core(ChklogError::Config(ConfigError::FileNotFound {
            path: "chklog.toml".to_owned(),
        }));
        assert_eq!(err.exit_code(), 2, "core config error should return exit code 2");
    }

    #[test]
    fn test_exit_code_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        assert_eq!(CliError::Io(io_err).exit_code(), 10);

        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        assert_eq!(CliError::Core(ChklogError::Io(io_err)).exit_code(), 10);
    }

    #[test]
    fn test_exit_code_command_error() {
        let err = CliError::Command("test error".to_owned());
        assert_eq!(err.exit_code(), 1, "command error should return exit code 1");
    }

    #[test]
    fn test_exit_code_rule_errors() {
        assert_eq!(CliError::Rule("invalid rule".to_owned()).exit_code(), 1);
        let core = ChklogError::Rule(RuleError::Load("bad".to_owned()));
        assert_eq!(CliError::Core(core).exit_code(), 1);
    }

    #[test]
    fn test_exit_code_json_serialize_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("{invalid json")
            .expect_err("should fail parsing");
        assert_eq!(CliError::JsonSerialize(json_err).exit_code(), 1);
    }

    #[test]
    fn test_from_canon_error() {
        let err: CliError = CanonError::DuplicateFailureHook {
            project: "ruby".to_owned(),
            section: "btest".to_owned(),
        }
        .into();
        match &err {
            CliError::Rule(msg) => assert!(msg.contains("btest")),
            _ => panic!("expected Rule error variant"),
        }
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_error_display_config() {
        let err = CliError::Config("invalid TOML syntax".to_owned());
        let display_str = err.to_string();
        assert!(display_str.contains("configuration error"));
        assert!(display_str.contains("invalid TOML syntax"));
    }

    #[test]
    fn test_error_display_command() {
        let err = CliError::Command("execution failed".to_owned());
        assert_eq!(err.to_string(), "execution failed");
    }
}
