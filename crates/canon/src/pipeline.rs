//! 정규화 파이프라인 -- 휘발성 로그 텍스트를 diff 가능한 정규 텍스트로 변환
//!
//! 파이프라인은 줄 단위로 동작합니다. 치환 규칙은 줄바꿈을 뺀 각 줄에 따로 적용되므로
//! `^`/`\A`는 줄 시작, `$`/`\z`는 줄 끝에 고정됩니다. 마지막 줄바꿈 유무는 보존됩니다.
//!
//! # 적용 순서
//! 1. 모든 `gsub` / `gsub_stateful` 규칙 (등록 순서, 앞 규칙의 출력이 다음 규칙의 입력)
//! 2. 모든 `sort` 규칙 (매치하는 줄의 최대 연속 구간만 사전순 정렬)
//!
//! 섹션이 지정된 규칙은 해당 섹션의 줄(헤더 줄 포함)에만 적용됩니다.

use std::sync::Arc;

use metrics::counter;
use regex::{Captures, Regex};
use tracing::{debug, warn};

use chklog_core::document::LogDocument;
use chklog_core::metrics::{CANON_LINES_TOTAL, CANON_RULE_FAILURES_TOTAL, LABEL_KIND};

use crate::rule::{ActionError, Rule, RuleAction, RuleKind, RuleRegistry};
use crate::state::CanonState;

/// 섹션에 속한 줄 하나 (본문 + 원래 줄바꿈)
struct Line<'s> {
    section: Option<&'s str>,
    content: String,
    terminator: &'static str,
}

/// 정규화기
///
/// 레지스트리를 공유하며, 호출마다 새 [`CanonState`]를 만들어 로그 하나를 처리합니다.
/// 서로 다른 로그에 대한 동시 호출은 간섭하지 않습니다.
///
/// # 사용 예시
/// ```
/// use std::sync::Arc;
/// use chklog_canon::{Canonicalizer, RuleRegistry, packs};
///
/// let mut registry = RuleRegistry::new();
/// packs::install_builtin(&mut registry).unwrap();
/// let canon = Canonicalizer::new(Arc::new(registry));
///
/// let a = canon.canonicalize("ruby", "vm.c:2012:5: warning: foo\n");
/// let b = canon.canonicalize("ruby", "vm.c:3001:5: warning: foo\n");
/// assert_eq!(a, b);
/// ```
#[derive(Debug, Clone)]
pub struct Canonicalizer {
    registry: Arc<RuleRegistry>,
}

impl Canonicalizer {
    /// 레지스트리로 정규화기를 만듭니다.
    pub fn new(registry: Arc<RuleRegistry>) -> Self {
        Self { registry }
    }

    /// 공유 중인 레지스트리
    pub fn registry(&self) -> &Arc<RuleRegistry> {
        &self.registry
    }

    /// 로그 전체를 새 상태로 정규화합니다.
    ///
    /// 텍스트를 [`LogDocument`]로 파싱해 섹션 범위 규칙을 적용합니다.
    pub fn canonicalize(&self, project: &str, text: &str) -> String {
        let mut state = CanonState::new();
        self.canonicalize_with_state(project, text, &mut state)
    }

    /// 주어진 상태를 이어 써서 로그 전체를 정규화합니다.
    ///
    /// 같은 상태를 쓰는 호출은 `&mut` 대여로 직렬화되어 식별자 할당이 결정적입니다.
    pub fn canonicalize_with_state(
        &self,
        project: &str,
        text: &str,
        state: &mut CanonState,
    ) -> String {
        let document = LogDocument::parse(text);
        self.canonicalize_document_with_state(project, &document, state)
    }

    /// 파싱된 문서를 새 상태로 정규화합니다.
    pub fn canonicalize_document(&self, project: &str, document: &LogDocument) -> String {
        let mut state = CanonState::new();
        self.canonicalize_document_with_state(project, document, &mut state)
    }

    /// 파싱된 문서를 주어진 상태로 정규화합니다.
    pub fn canonicalize_document_with_state(
        &self,
        project: &str,
        document: &LogDocument,
        state: &mut CanonState,
    ) -> String {
        let lines = document
            .sections()
            .iter()
            .flat_map(|s| split_lines(s.name(), s.raw()))
            .collect();
        self.run(project, lines, state)
    }

    /// 섹션 하나의 텍스트를 새 상태로 정규화합니다.
    ///
    /// 모든 줄이 `section`에 속한 것으로 취급합니다.
    pub fn canonicalize_section(&self, project: &str, section: &str, text: &str) -> String {
        let mut state = CanonState::new();
        self.run(project, split_lines(Some(section), text), &mut state)
    }

    fn run(&self, project: &str, mut lines: Vec<Line<'_>>, state: &mut CanonState) -> String {
        let rewrite = self.registry.rewrite_rules(project);
        let sorts = self.registry.lookup(project, RuleKind::Sort);

        counter!(CANON_LINES_TOTAL).increment(lines.len() as u64);
        debug!(
            project,
            lines = lines.len(),
            rewrite_rules = rewrite.len(),
            sort_rules = sorts.len(),
            "canonicalizing"
        );

        for line in &mut lines {
            for rule in rewrite.iter().filter(|r| r.applies_to(line.section)) {
                match rewrite_line(rule, &line.content, state) {
                    Ok(Some(rewritten)) => line.content = rewritten,
                    Ok(None) => {}
                    Err(e) => report_failure(rule, &line.content, &e),
                }
            }
        }

        for rule in &sorts {
            sort_runs(rule, &mut lines);
        }

        let mut out = String::with_capacity(lines.iter().map(|l| l.content.len() + 1).sum());
        for line in &lines {
            out.push_str(&line.content);
            out.push_str(line.terminator);
        }
        out
    }
}

/// 텍스트를 줄로 나눕니다. `\r\n`과 `\n`을 보존합니다.
fn split_lines<'s>(section: Option<&'s str>, text: &str) -> Vec<Line<'s>> {
    text.split_inclusive('\n')
        .map(|raw| {
            let (content, terminator) = if let Some(body) = raw.strip_suffix("\r\n") {
                (body, "\r\n")
            } else if let Some(body) = raw.strip_suffix('\n') {
                (body, "\n")
            } else {
                (raw, "")
            };
            Line {
                section,
                content: content.to_owned(),
                terminator,
            }
        })
        .collect()
}

/// 치환 규칙 하나를 줄 하나에 적용합니다. 매치가 없으면 `None`.
fn rewrite_line(
    rule: &Rule,
    line: &str,
    state: &mut CanonState,
) -> Result<Option<String>, ActionError> {
    match rule.action() {
        RuleAction::Gsub(f) => replace_all(rule.pattern(), line, |caps| f(caps)),
        RuleAction::GsubStateful(f) => {
            // 줄 중간에 실패하면 앞선 매치가 할당한 식별자도 취소한다
            let table = state.table_mut(rule.seq());
            table.begin();
            let result = replace_all(rule.pattern(), line, |caps| f(caps, table));
            if result.is_ok() {
                table.commit();
            } else {
                table.rollback();
            }
            result
        }
        // 치환 단계 밖의 종류는 rewrite_rules()에 포함되지 않는다
        RuleAction::Sort | RuleAction::TitleHook(_) | RuleAction::FailureHook(_) => Ok(None),
    }
}

/// 겹치지 않는 모든 매치를 왼쪽부터 치환합니다. 치환된 텍스트는 다시 검사하지 않습니다.
///
/// 빈 매치는 정규식 엔진이 한 글자 이상 전진시키므로 무한 루프가 없습니다.
/// 액션이 실패하면 이 줄에 대한 규칙 적용 전체를 취소합니다.
pub fn replace_all<F>(pattern: &Regex, line: &str, mut f: F) -> Result<Option<String>, ActionError>
where
    F: FnMut(&Captures<'_>) -> Result<String, ActionError>,
{
    let mut out = String::new();
    let mut last = 0;
    let mut matched = false;

    for caps in pattern.captures_iter(line) {
        let Some(m) = caps.get(0) else {
            continue;
        };
        matched = true;
        out.push_str(&line[last..m.start()]);
        out.push_str(&f(&caps)?);
        last = m.end();
    }

    if !matched {
        return Ok(None);
    }
    out.push_str(&line[last..]);
    Ok(Some(out))
}

/// 규칙에 매치하는 최대 연속 줄 구간을 각각 사전순으로 정렬합니다.
///
/// 줄바꿈은 위치에 그대로 두고 본문만 재배치합니다.
fn sort_runs(rule: &Rule, lines: &mut [Line<'_>]) {
    let matches = |line: &Line<'_>| rule.applies_to(line.section) && rule.pattern().is_match(&line.content);

    let mut start = 0;
    while start < lines.len() {
        if !matches(&lines[start]) {
            start += 1;
            continue;
        }
        let mut end = start + 1;
        while end < lines.len() && matches(&lines[end]) {
            end += 1;
        }
        if end - start > 1 {
            let mut contents: Vec<String> = lines[start..end]
                .iter_mut()
                .map(|l| std::mem::take(&mut l.content))
                .collect();
            contents.sort();
            for (line, content) in lines[start..end].iter_mut().zip(contents) {
                line.content = content;
            }
        }
        start = end;
    }
}

fn report_failure(rule: &Rule, line: &str, err: &ActionError) {
    counter!(CANON_RULE_FAILURES_TOTAL, LABEL_KIND => rule.kind().as_str()).increment(1);
    warn!(
        rule = %rule.name(),
        kind = %rule.kind(),
        line,
        error = %err,
        "rule action failed, skipping rule for this line"
    );
}
