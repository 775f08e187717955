//! 설정 관리: chklog.toml 파싱 및 런타임 설정
//!
//! [`ChklogConfig`]는 모든 모듈의 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`CHKLOG_CANON_PROJECT=ruby` 형식)
//! 3. 설정 파일 (`chklog.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), chklog_core::error::ChklogError> {
//! use chklog_core::config::ChklogConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = ChklogConfig::load("chklog.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = ChklogConfig::parse("[canon]\nproject = \"ruby\"")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ChklogError, ConfigError};

/// chklog 통합 설정
///
/// `chklog.toml` 파일의 최상위 구조를 나타냅니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChklogConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 정규화 설정
    #[serde(default)]
    pub canon: CanonConfig,
    /// 이상 마크 집계 설정
    #[serde(default)]
    pub mark: MarkConfig,
}

impl ChklogConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ChklogError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, ChklogError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ChklogError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                ChklogError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, ChklogError> {
        toml::from_str(toml_str).map_err(|e| {
            ChklogError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `CHKLOG_{SECTION}_{FIELD}`
    /// 예: `CHKLOG_CANON_PROJECT=ruby`
    ///
    /// `CHKLOG_MARK_ELIDE`는 정규식에 쉼표가 들어갈 수 있으므로 줄바꿈으로 구분합니다.
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "CHKLOG_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "CHKLOG_GENERAL_LOG_FORMAT");

        // Canon
        override_string(&mut self.canon.project, "CHKLOG_CANON_PROJECT");
        override_bool(&mut self.canon.builtin_rules, "CHKLOG_CANON_BUILTIN_RULES");
        override_string(&mut self.canon.rules_dir, "CHKLOG_CANON_RULES_DIR");
        override_string(&mut self.canon.display_name, "CHKLOG_CANON_DISPLAY_NAME");

        // Mark
        override_lines(&mut self.mark.elide, "CHKLOG_MARK_ELIDE");
        override_lines(&mut self.mark.elide_once, "CHKLOG_MARK_ELIDE_ONCE");
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), ChklogError> {
        // log_level 검증
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_level".to_owned(),
                reason: format!("must be one of: {}", valid_levels.join(", ")),
            }
            .into());
        }

        // log_format 검증
        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_format".to_owned(),
                reason: format!("must be one of: {}", valid_formats.join(", ")),
            }
            .into());
        }

        if self.canon.project.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "canon.project".to_owned(),
                reason: "project must not be empty".to_owned(),
            }
            .into());
        }

        // elide 패턴은 설정 로딩 시점에 미리 컴파일해 본다
        for (name, patterns) in [("elide", &self.mark.elide), ("elide_once", &self.mark.elide_once)] {
            for (idx, pattern) in patterns.iter().enumerate() {
                if let Err(e) = Regex::new(pattern) {
                    return Err(ConfigError::InvalidValue {
                        field: format!("mark.{name}[{idx}]"),
                        reason: e.to_string(),
                    }
                    .into());
                }
            }
        }

        Ok(())
    }
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "pretty".to_owned(),
        }
    }
}

/// 정규화 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CanonConfig {
    /// 규칙을 조회할 프로젝트(빌드 대상) 이름
    pub project: String,
    /// 내장 규칙 팩(generic, ruby) 설치 여부
    pub builtin_rules: bool,
    /// 추가 YAML 규칙 디렉토리 (빈 문자열이면 사용하지 않음)
    pub rules_dir: String,
    /// 타이틀 표시 이름 (예: `ruby-trunk-m32`). 비어 있으면 project를 사용
    pub display_name: String,
}

impl Default for CanonConfig {
    fn default() -> Self {
        Self {
            project: "ruby".to_owned(),
            builtin_rules: true,
            rules_dir: String::new(),
            display_name: String::new(),
        }
    }
}

impl CanonConfig {
    /// 실제로 사용할 표시 이름
    pub fn effective_display_name(&self) -> &str {
        if self.display_name.is_empty() {
            &self.project
        } else {
            &self.display_name
        }
    }
}

/// 이상 마크 집계 설정
///
/// 시그니처를 세기 전에 로그에서 지울 텍스트 패턴 목록입니다.
/// 커밋 메시지나 알려진 안내 문구 안의 "segmentation fault" 같은 문자열이
/// 잘못 집계되지 않도록 합니다.
///
/// `elide`가 먼저 적용되고 그다음 `elide_once`가 적용됩니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkConfig {
    /// 집계 전에 매치를 모두 제거할 정규식 패턴
    pub elide: Vec<String>,
    /// 집계 전에 첫 매치만 제거할 정규식 패턴
    ///
    /// Tk 안내 문구는 로그에 한 번 나오므로, 그 뒤의 같은 문자열은 실제 크래시로 센다.
    pub elide_once: Vec<String>,
}

impl Default for MarkConfig {
    fn default() -> Self {
        Self {
            elide: vec![r"(?m)^LASTLOG .*".to_owned()],
            elide_once: vec![
                "combination may cause frequent hang or segmentation fault|hangs or segmentation faults"
                    .to_owned(),
            ],
        }
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}

fn override_lines(target: &mut Vec<String>, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val
            .lines()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
            .collect();
    }
}
