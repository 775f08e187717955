//! 정규화 크레이트 에러 타입
//!
//! [`CanonError`]는 규칙 등록과 로딩 중 발생하는 구성(configuration) 에러를 표현합니다.
//! 로그 처리 자체에는 에러 경로가 없습니다. 규칙 액션 실패는 해당 규칙 적용만 건너뜁니다.
//! `From<CanonError> for ChklogError` 변환이 구현되어 있어
//! 상위 레이어에서 `?` 연산자로 전파할 수 있습니다.

use chklog_core::error::{ChklogError, RuleError};

/// 규칙 등록/로딩 에러
#[derive(Debug, thiserror::Error)]
pub enum CanonError {
    /// 정규식 패턴 컴파일 실패
    #[error("invalid pattern '{pattern}': {reason}")]
    InvalidPattern {
        /// 문제가 된 패턴
        pattern: String,
        /// 컴파일 실패 사유
        reason: String,
    },

    /// 같은 (project, section)에 failure hook 중복 등록
    #[error("duplicate failure hook for project '{project}', section '{section}'")]
    DuplicateFailureHook {
        /// 프로젝트 이름
        project: String,
        /// 섹션 이름
        section: String,
    },

    /// 규칙 파일 로딩 실패
    #[error("rule load error: {path}: {reason}")]
    RuleLoad {
        /// 규칙 파일 경로
        path: String,
        /// 로딩 실패 사유
        reason: String,
    },

    /// 규칙 유효성 검증 실패
    #[error("rule validation error: rule '{rule_id}': {reason}")]
    RuleValidation {
        /// 문제가 된 규칙 ID
        rule_id: String,
        /// 검증 실패 사유
        reason: String,
    },

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl CanonError {
    /// 정규식 컴파일 에러를 변환합니다.
    pub(crate) fn invalid_pattern(pattern: &str, err: regex::Error) -> Self {
        Self::InvalidPattern {
            pattern: pattern.to_owned(),
            reason: err.to_string(),
        }
    }
}

impl From<CanonError> for ChklogError {
    fn from(err: CanonError) -> Self {
        match err {
            CanonError::InvalidPattern { .. } => {
                ChklogError::Rule(RuleError::InvalidPattern(err.to_string()))
            }
            CanonError::DuplicateFailureHook { .. } => {
                ChklogError::Rule(RuleError::Registration(err.to_string()))
            }
            CanonError::RuleLoad { .. } | CanonError::RuleValidation { .. } => {
                ChklogError::Rule(RuleError::Load(err.to_string()))
            }
            CanonError::Io(io) => ChklogError::Io(io),
        }
    }
}
