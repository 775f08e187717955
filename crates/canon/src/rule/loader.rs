//! 규칙 파일 로더 -- YAML 규칙 파일을 디스크에서 로드합니다.
//!
//! 규칙 디렉토리 내의 `.yml`/`.yaml` 파일을 스캔하고 파싱합니다.
//! 파일 하나가 규칙 하나이며, 개별 파일 파싱 실패는 경고 로그를 남기고 건너뜁니다.
//!
//! # 규칙 형식
//! ```yaml
//! id: test-all-summary
//! project: ruby
//! section: test-all
//! kind: failure_hook
//! pattern: '(?m)^\d+ tests, \d+ assertions, (\d+) failures, (\d+) errors'
//! code: '${1}F${2}E'
//! unparseable: NoSummary
//! ```

use std::collections::HashSet;
use std::path::Path;

use regex::Regex;
use serde::{Deserialize, Serialize};

use chklog_core::types::{FailureOutcome, TitleField};

use super::types::{ActionError, RuleAction, RuleKind, capture_counts};
use crate::error::CanonError;

/// 규칙 파일 로더 설정
const MAX_RULE_FILE_SIZE: u64 = 10 * 1024 * 1024; // 10MB
const MAX_RULES_COUNT: usize = 10_000;
const MAX_RULE_ID_LEN: usize = 256;

/// failure hook의 기본 요약 없음 마커
pub const DEFAULT_UNPARSEABLE: &str = "NoSummary";

/// YAML 규칙 정의 -- 하나의 YAML 파일에 대응합니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSpec {
    /// 규칙 고유 ID (디렉토리 내에서 유일해야 함)
    pub id: String,
    /// 프로젝트 이름. 빈 문자열이면 전역 규칙
    #[serde(default)]
    pub project: String,
    /// 적용 섹션
    #[serde(default)]
    pub section: Option<String>,
    /// 규칙 종류
    pub kind: RuleKind,
    /// 정규식 패턴
    pub pattern: String,
    /// gsub / gsub_stateful: 치환 템플릿
    #[serde(default)]
    pub replace: Option<String>,
    /// gsub_stateful: 정규화 키 템플릿
    #[serde(default)]
    pub key: Option<String>,
    /// gsub_stateful: 원시 값 템플릿
    #[serde(default)]
    pub value: Option<String>,
    /// title_hook: 갱신할 필드 (revision, version, mark, name)
    #[serde(default)]
    pub field: Option<String>,
    /// title_hook: 값 템플릿
    #[serde(default)]
    pub template: Option<String>,
    /// failure_hook: 실패 코드 템플릿
    #[serde(default)]
    pub code: Option<String>,
    /// failure_hook: 통과 패턴
    #[serde(default)]
    pub pass: Option<String>,
    /// failure_hook: 요약 없음 마커
    #[serde(default)]
    pub unparseable: Option<String>,
}

impl RuleSpec {
    /// 규칙의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), CanonError> {
        if self.id.is_empty() {
            return Err(self.invalid("rule id must not be empty", "(empty)"));
        }

        if self.id.len() > MAX_RULE_ID_LEN {
            return Err(self.invalid(
                &format!("rule id must not exceed {MAX_RULE_ID_LEN} characters"),
                &self.id,
            ));
        }

        if self.pattern.is_empty() {
            return Err(self.invalid("pattern must not be empty", &self.id));
        }

        match self.kind {
            RuleKind::Gsub => {
                self.require(&self.replace, "replace")?;
            }
            RuleKind::GsubStateful => {
                self.require(&self.key, "key")?;
                self.require(&self.value, "value")?;
                let replace = self.require(&self.replace, "replace")?;
                if !replace.contains("${id}") {
                    return Err(self.invalid("replace must contain ${id}", &self.id));
                }
            }
            RuleKind::Sort => {}
            RuleKind::TitleHook => {
                let field = self.require(&self.field, "field")?;
                if TitleField::from_str_loose(field).is_none() {
                    return Err(self.invalid(
                        &format!("unknown title field '{field}' (expected revision, version, mark, name)"),
                        &self.id,
                    ));
                }
                self.require(&self.template, "template")?;
            }
            RuleKind::FailureHook => {
                if self.section.as_deref().is_none_or(str::is_empty) {
                    return Err(self.invalid("failure_hook requires a section", &self.id));
                }
                self.require(&self.code, "code")?;
            }
        }

        Ok(())
    }

    /// 패턴과 액션으로 컴파일합니다.
    pub fn compile(&self) -> Result<(Regex, RuleAction), CanonError> {
        self.validate()?;

        let pattern =
            Regex::new(&self.pattern).map_err(|e| CanonError::invalid_pattern(&self.pattern, e))?;

        let action = match self.kind {
            RuleKind::Gsub => RuleAction::replace(self.text(&self.replace)),
            RuleKind::GsubStateful => RuleAction::allocate(
                self.text(&self.key),
                self.text(&self.value),
                self.text(&self.replace),
            ),
            RuleKind::Sort => RuleAction::Sort,
            RuleKind::TitleHook => {
                let field = self
                    .field
                    .as_deref()
                    .and_then(TitleField::from_str_loose)
                    .ok_or_else(|| self.invalid("missing title field", &self.id))?;
                let template = self.text(&self.template);
                RuleAction::title_hook(move |title, caps, _text| {
                    let mut value = String::new();
                    caps.expand(&template, &mut value);
                    title.set(field, value);
                    Ok(())
                })
            }
            RuleKind::FailureHook => {
                let pass = match self.pass.as_deref() {
                    Some(p) => Some(Regex::new(p).map_err(|e| CanonError::invalid_pattern(p, e))?),
                    None => None,
                };
                let code = self.text(&self.code);
                let unparseable = self
                    .unparseable
                    .clone()
                    .unwrap_or_else(|| DEFAULT_UNPARSEABLE.to_owned());
                RuleAction::summary(pass, unparseable, move |caps| {
                    let counts = capture_counts(caps);
                    if !counts.is_empty() && counts.iter().all(|c| *c == 0) {
                        return Ok(None);
                    }
                    let mut rendered = String::new();
                    caps.expand(&code, &mut rendered);
                    if rendered.is_empty() {
                        return Err(ActionError::new("code template expanded to an empty string"));
                    }
                    Ok(Some(rendered))
                })
            }
        };

        Ok((pattern, action))
    }

    /// 이 규칙 정의로 failure hook 결과를 바로 계산합니다 (CLI 검증용).
    pub fn evaluate_failure(&self, text: &str) -> Result<Option<FailureOutcome>, CanonError> {
        let (pattern, action) = self.compile()?;
        match action {
            RuleAction::FailureHook(f) => Ok(f(&pattern, text).ok()),
            _ => Ok(None),
        }
    }

    fn require<'a>(&self, field: &'a Option<String>, name: &str) -> Result<&'a str, CanonError> {
        match field.as_deref() {
            Some(v) if !v.is_empty() => Ok(v),
            _ => Err(self.invalid(
                &format!("{} rule requires '{name}'", self.kind),
                &self.id,
            )),
        }
    }

    fn text(&self, field: &Option<String>) -> String {
        field.clone().unwrap_or_default()
    }

    fn invalid(&self, reason: &str, rule_id: &str) -> CanonError {
        CanonError::RuleValidation {
            rule_id: rule_id.to_owned(),
            reason: reason.to_owned(),
        }
    }
}

/// 규칙 파일 로더
pub struct RuleLoader;

impl RuleLoader {
    /// 디렉토리에서 모든 YAML 규칙 파일을 로드합니다.
    ///
    /// `.yml` 또는 `.yaml` 확장자를 가진 파일만 처리합니다.
    /// 결과는 파일 이름 순서로 정렬되어 등록 순서가 실행마다 같습니다.
    /// 개별 파일 로딩 실패는 경고 로그를 남기고 건너뜁니다.
    ///
    /// # Errors
    /// - 디렉토리를 읽을 수 없는 경우
    /// - 규칙 수가 `MAX_RULES_COUNT`를 초과하는 경우
    pub async fn load_directory(dir: impl AsRef<Path>) -> Result<Vec<RuleSpec>, CanonError> {
        let dir = dir.as_ref();

        let mut entries = tokio::fs::read_dir(dir)
            .await
            .map_err(|e| CanonError::RuleLoad {
                path: dir.display().to_string(),
                reason: format!("failed to read directory: {e}"),
            })?;

        let mut paths = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| CanonError::RuleLoad {
                path: dir.display().to_string(),
                reason: format!("failed to read directory entry: {e}"),
            })?
        {
            let path = entry.path();

            // .yml / .yaml 확장자만 처리
            let is_yaml = path
                .extension()
                .is_some_and(|ext| ext == "yml" || ext == "yaml");

            if is_yaml {
                paths.push(path);
            }
        }
        paths.sort();

        let mut rules = Vec::new();
        let mut seen_ids = HashSet::new();

        for path in paths {
            match Self::load_file(&path).await {
                Ok(rule) => {
                    // 중복 ID 검사
                    if seen_ids.contains(&rule.id) {
                        tracing::warn!(
                            rule_id = %rule.id,
                            path = %path.display(),
                            "duplicate rule id, skipping"
                        );
                        continue;
                    }
                    seen_ids.insert(rule.id.clone());
                    rules.push(rule);
                }
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "failed to load rule file, skipping"
                    );
                }
            }

            if rules.len() > MAX_RULES_COUNT {
                return Err(CanonError::RuleLoad {
                    path: dir.display().to_string(),
                    reason: format!("too many rules: max {MAX_RULES_COUNT}"),
                });
            }
        }

        tracing::info!(
            dir = %dir.display(),
            count = rules.len(),
            "loaded canonicalization rules"
        );

        Ok(rules)
    }

    /// 단일 YAML 파일에서 규칙을 로드합니다.
    pub async fn load_file(path: impl AsRef<Path>) -> Result<RuleSpec, CanonError> {
        let path = path.as_ref();

        // 파일 크기 검증
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| CanonError::RuleLoad {
                path: path.display().to_string(),
                reason: format!("failed to read file metadata: {e}"),
            })?;

        if metadata.len() > MAX_RULE_FILE_SIZE {
            return Err(CanonError::RuleLoad {
                path: path.display().to_string(),
                reason: format!(
                    "file too large: {} bytes (max: {MAX_RULE_FILE_SIZE})",
                    metadata.len()
                ),
            });
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| CanonError::RuleLoad {
                path: path.display().to_string(),
                reason: format!("failed to read file: {e}"),
            })?;

        Self::parse_yaml(&content, &path.display().to_string())
    }

    /// YAML 문자열을 파싱하여 규칙을 생성합니다.
    ///
    /// 구조 검증과 함께 패턴 컴파일까지 확인합니다.
    pub fn parse_yaml(yaml_str: &str, source: &str) -> Result<RuleSpec, CanonError> {
        let rule: RuleSpec = serde_yaml::from_str(yaml_str).map_err(|e| CanonError::RuleLoad {
            path: source.to_owned(),
            reason: format!("YAML parse error: {e}"),
        })?;

        // 유효성 검증 + 패턴 컴파일
        rule.compile()?;

        Ok(rule)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_valid_gsub_yaml() {
        let yaml = r#"
id: release-date
project: ruby
kind: gsub
pattern: '^#define RUBY_RELEASE_DATE ".*"'
replace: '#define RUBY_RELEASE_DATE "<year>-<mm>-<dd>"'
"#;
        let rule = RuleLoader::parse_yaml(yaml, "release-date.yml").unwrap();
        assert_eq!(rule.id, "release-date");
        assert_eq!(rule.kind, RuleKind::Gsub);
        assert!(rule.section.is_none());
    }

    #[test]
    fn parse_invalid_yaml_returns_error() {
        let yaml = "not: [valid: yaml: {{{";
        let result = RuleLoader::parse_yaml(yaml, "bad.yml");
        assert!(matches!(result, Err(CanonError::RuleLoad { .. })));
    }

    #[test]
    fn parse_yaml_with_unknown_kind_fails() {
        let yaml = "id: x\nkind: explode\npattern: a\n";
        assert!(RuleLoader::parse_yaml(yaml, "x.yml").is_err());
    }

    #[test]
    fn parse_yaml_with_empty_id_fails() {
        let yaml = "id: ''\nkind: sort\npattern: a\n";
        let err = RuleLoader::parse_yaml(yaml, "x.yml").unwrap_err();
        assert!(matches!(err, CanonError::RuleValidation { .. }));
    }

    #[test]
    fn gsub_requires_replace() {
        let yaml = "id: x\nkind: gsub\npattern: a\n";
        let err = RuleLoader::parse_yaml(yaml, "x.yml").unwrap_err();
        assert!(err.to_string().contains("replace"));
    }

    #[test]
    fn stateful_requires_id_placeholder() {
        let yaml = r#"
id: warn-lines
kind: gsub_stateful
pattern: '\A([^:]*:)(\d+)(: warning: .*)'
key: '${1}<linenum>${3}'
value: '${2}'
replace: '${1}<line>${3}'
"#;
        let err = RuleLoader::parse_yaml(yaml, "x.yml").unwrap_err();
        assert!(err.to_string().contains("${id}"));
    }

    #[test]
    fn title_hook_rejects_unknown_field() {
        let yaml = "id: x\nkind: title_hook\npattern: a\nfield: color\ntemplate: b\n";
        let err = RuleLoader::parse_yaml(yaml, "x.yml").unwrap_err();
        assert!(err.to_string().contains("color"));
    }

    #[test]
    fn failure_hook_requires_section() {
        let yaml = "id: x\nkind: failure_hook\npattern: a\ncode: F\n";
        let err = RuleLoader::parse_yaml(yaml, "x.yml").unwrap_err();
        assert!(err.to_string().contains("section"));
    }

    #[test]
    fn invalid_pattern_is_reported() {
        let yaml = "id: x\nkind: sort\npattern: '(unclosed'\n";
        let err = RuleLoader::parse_yaml(yaml, "x.yml").unwrap_err();
        assert!(matches!(err, CanonError::InvalidPattern { .. }));
    }

    #[test]
    fn failure_hook_spec_trichotomy() {
        let yaml = r#"
id: test-all
project: ruby
section: test-all
kind: failure_hook
pattern: '(?m)^\d+ tests, \d+ assertions, (\d+) failures, (\d+) errors'
code: '${1}F${2}E'
"#;
        let rule = RuleLoader::parse_yaml(yaml, "t.yml").unwrap();
        assert_eq!(
            rule.evaluate_failure("10 tests, 20 assertions, 0 failures, 0 errors\n")
                .unwrap(),
            Some(FailureOutcome::Passed)
        );
        assert_eq!(
            rule.evaluate_failure("10 tests, 20 assertions, 2 failures, 1 errors\n")
                .unwrap(),
            Some(FailureOutcome::Failed("2F1E".to_owned()))
        );
        assert_eq!(
            rule.evaluate_failure("Segmentation fault\n").unwrap(),
            Some(FailureOutcome::Unparseable(DEFAULT_UNPARSEABLE.to_owned()))
        );
    }

    #[tokio::test]
    async fn load_nonexistent_directory_returns_error() {
        let result = RuleLoader::load_directory("/nonexistent/path/rules").await;
        assert!(matches!(result, Err(CanonError::RuleLoad { .. })));
    }

    #[tokio::test]
    async fn load_directory_skips_invalid_and_duplicate_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("a.yml"),
            "id: same\nkind: sort\npattern: '^[A-Z]\\w+#'\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("b.yaml"),
            "id: same\nkind: sort\npattern: '^x'\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("c.yml"), "id: [broken\n").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "id: ignored\n").unwrap();
        std::fs::write(
            dir.path().join("d.yml"),
            "id: other\nproject: ruby\nkind: gsub\npattern: 'x'\nreplace: 'y'\n",
        )
        .unwrap();

        let rules = RuleLoader::load_directory(dir.path()).await.unwrap();
        let ids: Vec<&str> = rules.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["same", "other"]);
        assert_eq!(rules[0].pattern, "^[A-Z]\\w+#");
    }
}
