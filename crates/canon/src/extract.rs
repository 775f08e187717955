//! 상태 추출기 -- title hook과 failure hook을 섹션에 적용
//!
//! - title hook: 섹션 텍스트에서 리비전, 버전, 이상 마크 등을 찾아 [`Title`]을 갱신합니다.
//!   섹션 이름이 없는 hook은 모든 섹션 hook 뒤에 로그 전체 텍스트로 실행됩니다.
//! - failure hook: 섹션 텍스트에서 짧은 실패 코드를 계산합니다.
//!
//! 매치가 없으면 "신호 없음"이며 에러가 아닙니다. 로그에 없는 섹션에는 hook을 실행하지 않습니다.

use std::sync::Arc;

use metrics::counter;
use regex::{Regex, RegexBuilder};
use tracing::{debug, warn};

use chklog_core::config::MarkConfig;
use chklog_core::document::LogDocument;
use chklog_core::metrics::{
    CANON_RULE_FAILURES_TOTAL, EXTRACT_FAILURE_MARKERS_TOTAL, LABEL_KIND, LABEL_RESULT,
    LABEL_SECTION,
};
use chklog_core::types::{FailureOutcome, SectionMarker, StatusReport, Title};

use crate::error::CanonError;
use crate::rule::{Rule, RuleAction, RuleKind, RuleRegistry};

/// 이상 마크에 쓰는 크래시 시그니처 (집계 순서, 대소문자 무시)
pub const CRASH_SIGNATURES: [(&str, &str); 6] = [
    (r"\[BUG\]", "BUG"),
    (r"segmentation fault|signal segv", "SEGV"),
    (r"signal SIGBUS", "SIGBUS"),
    (r"signal SIGILL", "SIGILL"),
    (r"signal SIGABRT", "SIGABRT"),
    (r"\[FATAL\]", "FATAL"),
];

/// 개수 접두어. 0이면 `None`, 1이면 빈 문자열, 그 외에는 숫자
pub fn count_prefix(count: usize) -> Option<String> {
    match count {
        0 => None,
        1 => Some(String::new()),
        n => Some(n.to_string()),
    }
}

/// 이상 마크 집계기
///
/// 제거(elide) 패턴을 먼저 지운 뒤 시그니처별 출현 횟수를 세어
/// `[BUG] 2[SEGV]` 같은 마크를 만듭니다.
#[derive(Debug, Clone)]
pub struct MarkCounter {
    elide: Vec<Regex>,
    elide_once: Vec<Regex>,
    signatures: Vec<(Regex, String)>,
}

impl MarkCounter {
    /// 제거 패턴 목록으로 집계기를 만듭니다.
    ///
    /// `elide`는 매치를 모두, `elide_once`는 첫 매치만 지웁니다.
    pub fn new<S: AsRef<str>, T: AsRef<str>>(
        elide: &[S],
        elide_once: &[T],
    ) -> Result<Self, CanonError> {
        let elide = compile_all(elide)?;
        let elide_once = compile_all(elide_once)?;

        let signatures = CRASH_SIGNATURES
            .iter()
            .map(|(pattern, tag)| {
                RegexBuilder::new(pattern)
                    .case_insensitive(true)
                    .build()
                    .map(|re| (re, format!("[{tag}]")))
                    .map_err(|e| CanonError::invalid_pattern(pattern, e))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            elide,
            elide_once,
            signatures,
        })
    }

    /// 설정의 제거 패턴으로 집계기를 만듭니다.
    pub fn from_config(mark: &MarkConfig) -> Result<Self, CanonError> {
        Self::new(&mark.elide, &mark.elide_once)
    }

    /// 시그니처 중 하나라도 찾는 대소문자 무시 패턴 (title hook 등록용)
    pub fn trigger_pattern() -> String {
        let alternatives: Vec<&str> = CRASH_SIGNATURES.iter().map(|(p, _)| *p).collect();
        format!("(?i){}", alternatives.join("|"))
    }

    /// 텍스트에서 이상 마크를 계산합니다. 시그니처가 없으면 빈 문자열입니다.
    pub fn mark(&self, text: &str) -> String {
        let mut cleaned = text.to_owned();
        for re in &self.elide {
            cleaned = re.replace_all(&cleaned, "").into_owned();
        }
        for re in &self.elide_once {
            cleaned = re.replace(&cleaned, "").into_owned();
        }

        self.signatures
            .iter()
            .filter_map(|(re, tag)| {
                count_prefix(re.find_iter(&cleaned).count()).map(|prefix| format!("{prefix}{tag}"))
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn compile_all<S: AsRef<str>>(patterns: &[S]) -> Result<Vec<Regex>, CanonError> {
    patterns
        .iter()
        .map(|p| {
            let p = p.as_ref();
            Regex::new(p).map_err(|e| CanonError::invalid_pattern(p, e))
        })
        .collect()
}

/// 상태 추출기
///
/// # 사용 예시
/// ```
/// use std::sync::Arc;
/// use chklog_canon::{RuleRegistry, StatusExtractor, packs};
/// use chklog_core::{FailureOutcome, LogDocument};
///
/// let mut registry = RuleRegistry::new();
/// packs::install_builtin(&mut registry).unwrap();
/// let extractor = StatusExtractor::new(Arc::new(registry));
///
/// let doc = LogDocument::parse(
///     "== test-all\n6937 tests, 2165250 assertions, 6 failures, 0 errors, 0 skips\n",
/// );
/// let report = extractor.extract("ruby", &doc, "ruby-trunk");
/// assert_eq!(
///     report.outcome("test-all"),
///     Some(&FailureOutcome::Failed("6F0E".to_owned()))
/// );
/// ```
#[derive(Debug, Clone)]
pub struct StatusExtractor {
    registry: Arc<RuleRegistry>,
}

impl StatusExtractor {
    /// 레지스트리로 추출기를 만듭니다.
    pub fn new(registry: Arc<RuleRegistry>) -> Self {
        Self { registry }
    }

    /// `section`에 해당하는 title hook들을 등록 순서대로 실행합니다.
    ///
    /// `section`이 `None`이면 로그 전체 hook을 실행합니다. 패턴이 매치한 hook만 액션을 호출하며
    /// 같은 필드는 나중 hook이 덮어씁니다.
    pub fn apply_title_hooks(
        &self,
        project: &str,
        section: Option<&str>,
        text: &str,
        title: &mut Title,
    ) {
        for rule in self.registry.lookup(project, RuleKind::TitleHook) {
            if rule.section() != section {
                continue;
            }
            let RuleAction::TitleHook(f) = rule.action() else {
                continue;
            };
            let Some(caps) = rule.pattern().captures(text) else {
                continue;
            };
            if let Err(e) = f(title, &caps, text) {
                report_failure(rule, section, &e);
            }
        }
    }

    /// `section`의 failure hook을 실행합니다.
    ///
    /// 등록된 hook이 없거나 hook 액션이 실패하면 `None`(신호 없음)입니다.
    pub fn apply_failure_hook(
        &self,
        project: &str,
        section: &str,
        text: &str,
    ) -> Option<FailureOutcome> {
        let rule = self.registry.failure_hook(project, section)?;
        let RuleAction::FailureHook(f) = rule.action() else {
            return None;
        };
        match f(rule.pattern(), text) {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                report_failure(rule, Some(section), &e);
                None
            }
        }
    }

    /// 문서 하나에서 타이틀과 섹션별 실패 마커를 계산합니다.
    ///
    /// 섹션 title hook(로그 순서) → failure hook → 로그 전체 title hook 순서로 실행합니다.
    /// 이름이 같은 섹션이 여러 번 나오면 각각 실행합니다.
    pub fn extract(&self, project: &str, document: &LogDocument, display_name: &str) -> StatusReport {
        let mut title = Title::new(display_name);
        let mut markers = Vec::new();

        for section in document.sections() {
            let Some(name) = section.name() else {
                continue;
            };
            self.apply_title_hooks(project, Some(name), section.text(), &mut title);
        }

        for section in document.sections() {
            let Some(name) = section.name() else {
                continue;
            };
            let Some(outcome) = self.apply_failure_hook(project, name, section.text()) else {
                continue;
            };
            if let Some(code) = outcome.code() {
                counter!(
                    EXTRACT_FAILURE_MARKERS_TOTAL,
                    LABEL_SECTION => name.to_owned(),
                    LABEL_RESULT => outcome.kind_str()
                )
                .increment(1);
                title.failures.push(code.to_owned());
            }
            markers.push(SectionMarker {
                section: name.to_owned(),
                outcome,
            });
        }

        self.apply_title_hooks(project, None, &document.full_text(), &mut title);

        debug!(
            project,
            sections = document.len(),
            markers = markers.len(),
            title = %title,
            "extracted status"
        );

        StatusReport { title, markers }
    }
}

fn report_failure(rule: &Rule, section: Option<&str>, err: &crate::rule::ActionError) {
    counter!(CANON_RULE_FAILURES_TOTAL, LABEL_KIND => rule.kind().as_str()).increment(1);
    warn!(
        rule = %rule.name(),
        kind = %rule.kind(),
        section = section.unwrap_or("(whole log)"),
        error = %err,
        "hook action failed, no signal"
    );
}
