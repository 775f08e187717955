//! 에러 타입: 도메인별 에러 정의

/// chklog 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum ChklogError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 규칙 등록/로딩 에러
    #[error("rule error: {0}")]
    Rule(#[from] RuleError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 규칙 관련 에러
///
/// 규칙 엔진 크레이트의 상세 에러는 이 타입으로 변환되어 상위 레이어로 전파됩니다.
#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    /// 정규식 패턴 컴파일 실패
    #[error("invalid pattern: {0}")]
    InvalidPattern(String),

    /// 규칙 등록 실패 (중복 failure hook 등)
    #[error("registration failed: {0}")]
    Registration(String),

    /// 규칙 파일 로딩 실패
    #[error("load failed: {0}")]
    Load(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_display() {
        let err = ConfigError::InvalidValue {
            field: "canon.project".to_owned(),
            reason: "must not be empty".to_owned(),
        };
        let msg = err.to_string();
        assert!(msg.contains("canon.project"));
        assert!(msg.contains("must not be empty"));
    }

    #[test]
    fn config_error_converts_to_chklog_error() {
        let err: ChklogError = ConfigError::FileNotFound {
            path: "/etc/chklog.toml".to_owned(),
        }
        .into();
        assert!(matches!(err, ChklogError::Config(_)));
        assert!(err.to_string().contains("/etc/chklog.toml"));
    }

    #[test]
    fn rule_error_converts_to_chklog_error() {
        let err: ChklogError = RuleError::InvalidPattern("unclosed group".to_owned()).into();
        assert!(matches!(err, ChklogError::Rule(RuleError::InvalidPattern(_))));
    }

    #[test]
    fn io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: ChklogError = io.into();
        assert!(err.to_string().starts_with("io error"));
    }
}
