//! 도메인 타입: 빌드 타이틀과 실패 마커
//!
//! 추출기(extractor)가 만들어 내고 CLI와 외부 리포팅이 소비하는 데이터 구조를 정의합니다.
//! 모든 타입은 `serde`로 JSON 직렬화가 가능합니다.

use std::fmt;

use serde::{Deserialize, Serialize};

/// 빌드 타이틀
///
/// 한 로그를 처리하는 동안 title hook이 필드를 하나씩 갱신하고,
/// 처리가 끝나면 더 이상 바뀌지 않습니다. 같은 필드에 대해서는 마지막 쓰기가 이깁니다.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Title {
    /// 표시 이름 (변형 접미어가 붙은 빌드 대상 이름, 예: `ruby-trunk-m32`)
    pub name: String,
    /// 리비전 (예: `rev:40000`)
    pub revision: Option<String>,
    /// 버전 문자열 (예: `ruby 2.1.0dev (...) [x86_64-linux]`)
    pub version: Option<String>,
    /// 이상 마크 (예: `[BUG] 2[SEGV]`)
    pub mark: Option<String>,
    /// 섹션 순서대로 모은 실패 코드
    #[serde(default)]
    pub failures: Vec<String>,
}

impl Title {
    /// 표시 이름으로 새 타이틀을 만듭니다.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// 필드 하나를 설정합니다. 빈 값은 필드를 비웁니다.
    pub fn set(&mut self, field: TitleField, value: impl Into<String>) {
        let value = value.into();
        let slot = match field {
            TitleField::Name => {
                self.name = value;
                return;
            }
            TitleField::Revision => &mut self.revision,
            TitleField::Version => &mut self.version,
            TitleField::Mark => &mut self.mark,
        };
        *slot = if value.is_empty() { None } else { Some(value) };
    }

    /// 필드 값을 읽습니다.
    pub fn get(&self, field: TitleField) -> Option<&str> {
        match field {
            TitleField::Name => Some(self.name.as_str()),
            TitleField::Revision => self.revision.as_deref(),
            TitleField::Version => self.version.as_deref(),
            TitleField::Mark => self.mark.as_deref(),
        }
    }

    /// 한 줄 타이틀을 만듭니다.
    ///
    /// `<mark> <failure codes> <version> <revision>` 순서이며 빈 부분은 생략합니다.
    /// 버전이 없으면 표시 이름을 씁니다.
    pub fn render(&self) -> String {
        let mut parts: Vec<&str> = Vec::new();
        if let Some(mark) = self.mark.as_deref() {
            parts.push(mark);
        }
        parts.extend(self.failures.iter().map(String::as_str));
        parts.push(self.version.as_deref().unwrap_or(&self.name));
        if let Some(rev) = self.revision.as_deref() {
            parts.push(rev);
        }
        parts.retain(|p| !p.is_empty());
        parts.join(" ")
    }
}

impl fmt::Display for Title {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// title hook이 갱신할 수 있는 필드
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TitleField {
    /// 표시 이름
    Name,
    /// 리비전
    Revision,
    /// 버전
    Version,
    /// 이상 마크
    Mark,
}

impl TitleField {
    /// 문자열에서 필드를 파싱합니다 (대소문자 무시).
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "name" => Some(Self::Name),
            "revision" | "rev" => Some(Self::Revision),
            "version" => Some(Self::Version),
            "mark" => Some(Self::Mark),
            _ => None,
        }
    }

    /// 필드 이름
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Revision => "revision",
            Self::Version => "version",
            Self::Mark => "mark",
        }
    }
}

impl fmt::Display for TitleField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// failure hook 결과
///
/// 통과, 실패, 요약 없음(파싱 불가)은 서로 다른 값입니다.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "status", content = "code", rename_all = "snake_case")]
pub enum FailureOutcome {
    /// 요약이 있고 실패/에러가 0개
    Passed,
    /// 요약이 있고 실패가 있음
    Failed(String),
    /// 요약 줄을 찾지 못함
    Unparseable(String),
}

impl FailureOutcome {
    /// 짧은 실패 코드. 통과면 `None`
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Passed => None,
            Self::Failed(code) | Self::Unparseable(code) => Some(code),
        }
    }

    /// 통과 여부
    pub fn is_passed(&self) -> bool {
        matches!(self, Self::Passed)
    }

    /// 메트릭 레이블용 결과 이름
    pub fn kind_str(&self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Failed(_) => "failed",
            Self::Unparseable(_) => "unparseable",
        }
    }
}

impl fmt::Display for FailureOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Passed => f.write_str("passed"),
            Self::Failed(code) => write!(f, "failed ({code})"),
            Self::Unparseable(code) => write!(f, "unparseable ({code})"),
        }
    }
}

/// 섹션별 실패 마커
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionMarker {
    /// 섹션 이름
    pub section: String,
    /// 결과
    pub outcome: FailureOutcome,
}

/// 한 로그에 대한 추출 결과
///
/// 타이틀과 로그 순서대로 정렬된 `section → outcome` 목록입니다.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReport {
    /// 빌드 타이틀
    pub title: Title,
    /// failure hook이 실행된 섹션들의 결과 (로그 순서)
    pub markers: Vec<SectionMarker>,
}

impl StatusReport {
    /// 섹션 이름으로 첫 번째 결과를 찾습니다.
    pub fn outcome(&self, section: &str) -> Option<&FailureOutcome> {
        self.markers
            .iter()
            .find(|m| m.section == section)
            .map(|m| &m.outcome)
    }

    /// 통과하지 못한 섹션이 있는지 여부
    pub fn has_failures(&self) -> bool {
        self.markers.iter().any(|m| !m.outcome.is_passed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_render_uses_name_without_version() {
        let title = Title::new("ruby-trunk");
        assert_eq!(title.render(), "ruby-trunk");
    }

    #[test]
    fn title_render_orders_parts() {
        let mut title = Title::new("ruby-trunk");
        title.set(TitleField::Version, "ruby 2.1.0dev [x86_64-linux]");
        title.set(TitleField::Revision, "rev:40000");
        title.set(TitleField::Mark, "2[SEGV]");
        title.failures.push("3F2E".to_owned());
        title.failures.push("rubyspec:1F0E".to_owned());
        assert_eq!(
            title.render(),
            "2[SEGV] 3F2E rubyspec:1F0E ruby 2.1.0dev [x86_64-linux] rev:40000"
        );
    }

    #[test]
    fn title_set_empty_clears_field() {
        let mut title = Title::new("ruby");
        title.set(TitleField::Mark, "[BUG]");
        title.set(TitleField::Mark, "");
        assert!(title.mark.is_none());
        assert_eq!(title.to_string(), "ruby");
    }

    #[test]
    fn title_later_write_wins() {
        let mut title = Title::new("ruby");
        title.set(TitleField::Revision, "rev:1");
        title.set(TitleField::Revision, "rev:2");
        assert_eq!(title.get(TitleField::Revision), Some("rev:2"));
    }

    #[test]
    fn title_field_from_str_loose() {
        assert_eq!(TitleField::from_str_loose("REVISION"), Some(TitleField::Revision));
        assert_eq!(TitleField::from_str_loose("rev"), Some(TitleField::Revision));
        assert_eq!(TitleField::from_str_loose("Mark"), Some(TitleField::Mark));
        assert_eq!(TitleField::from_str_loose("status"), None);
    }

    #[test]
    fn failure_outcome_trichotomy_is_distinct() {
        let passed = FailureOutcome::Passed;
        let failed = FailureOutcome::Failed("NoSummary".to_owned());
        let unparseable = FailureOutcome::Unparseable("NoSummary".to_owned());
        assert_ne!(passed, failed);
        assert_ne!(passed, unparseable);
        assert_ne!(failed, unparseable);
        assert_eq!(passed.code(), None);
        assert_eq!(failed.code(), Some("NoSummary"));
        assert_eq!(unparseable.code(), Some("NoSummary"));
    }

    #[test]
    fn failure_outcome_serializes_tagged() {
        let json = serde_json::to_string(&FailureOutcome::Failed("6F0E".to_owned())).unwrap();
        assert_eq!(json, r#"{"status":"failed","code":"6F0E"}"#);
        let passed = serde_json::to_string(&FailureOutcome::Passed).unwrap();
        assert_eq!(passed, r#"{"status":"passed"}"#);
    }

    #[test]
    fn status_report_lookup_and_failures() {
        let report = StatusReport {
            title: Title::new("ruby"),
            markers: vec![
                SectionMarker {
                    section: "btest".to_owned(),
                    outcome: FailureOutcome::Passed,
                },
                SectionMarker {
                    section: "test-all".to_owned(),
                    outcome: FailureOutcome::Failed("6F0E".to_owned()),
                },
            ],
        };
        assert_eq!(report.outcome("btest"), Some(&FailureOutcome::Passed));
        assert!(report.outcome("rubyspec").is_none());
        assert!(report.has_failures());
    }
}
