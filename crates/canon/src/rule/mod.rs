//! 규칙 레지스트리 -- 프로젝트별 정규화/추출 규칙 모음
//!
//! 규칙은 `(project, kind)`별 목록에 등록 순서대로 쌓입니다.
//! 프로젝트 이름이 빈 문자열인 규칙은 전역 규칙이며 모든 프로젝트에 적용됩니다.
//!
//! # 아키텍처
//! - [`RuleRegistry`]: 시작 시 한 번 구성하고 이후 읽기 전용으로 공유
//! - [`loader`]: YAML 규칙 파일 로딩 및 유효성 검증
//! - [`types`]: 규칙, 규칙 종류, 액션 정의
//!
//! # 사용 예시
//! ```
//! use chklog_canon::rule::{RuleAction, RuleKind, RuleRegistry};
//!
//! let mut registry = RuleRegistry::new();
//! registry
//!     .register("ruby", None, r"Finished in [0-9.]+ seconds", RuleAction::replace("Finished in <t> seconds"))
//!     .unwrap();
//! assert_eq!(registry.lookup("ruby", RuleKind::Gsub).len(), 1);
//! assert!(registry.lookup("perl", RuleKind::Gsub).is_empty());
//! ```

pub mod loader;
pub mod types;

pub use loader::{RuleLoader, RuleSpec};
pub use types::{ActionError, Rule, RuleAction, RuleKind, capture_counts};

use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::Path;

use regex::{Captures, Regex};

use chklog_core::types::{FailureOutcome, Title};

use crate::error::CanonError;
use crate::state::IdTable;

/// 전역 규칙의 프로젝트 이름
pub const GLOBAL_PROJECT: &str = "";

/// 규칙 레지스트리
///
/// `Send + Sync`이며, 구성이 끝나면 `Arc`로 감싸 잠금 없이 공유합니다.
#[derive(Debug, Default)]
pub struct RuleRegistry {
    /// (project, kind) -> 등록 순서대로의 규칙
    rules: HashMap<(String, RuleKind), Vec<Rule>>,
    /// failure hook이 등록된 (project, section)
    failure_sections: HashSet<(String, String)>,
    /// 다음 등록 순번
    next_seq: u64,
}

impl RuleRegistry {
    /// 빈 레지스트리를 만듭니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 규칙을 등록합니다. 규칙 종류는 액션이 결정합니다.
    ///
    /// # Errors
    /// - 패턴이 유효한 정규식이 아닌 경우 `InvalidPattern`
    /// - 같은 (project, section)에 failure hook이 이미 있는 경우 `DuplicateFailureHook`
    /// - 섹션 없는 failure hook인 경우 `RuleValidation`
    pub fn register(
        &mut self,
        project: &str,
        section: Option<&str>,
        pattern: &str,
        action: RuleAction,
    ) -> Result<&Rule, CanonError> {
        let name = format!(
            "{}/{}#{}",
            if project.is_empty() { "global" } else { project },
            action.kind(),
            self.next_seq
        );
        self.register_named(&name, project, section, pattern, action)
    }

    /// 이름을 붙여 규칙을 등록합니다.
    pub fn register_named(
        &mut self,
        name: &str,
        project: &str,
        section: Option<&str>,
        pattern: &str,
        action: RuleAction,
    ) -> Result<&Rule, CanonError> {
        let compiled = Regex::new(pattern).map_err(|e| CanonError::invalid_pattern(pattern, e))?;
        self.register_compiled(name, project, section, compiled, action)
    }

    /// 이미 컴파일된 패턴으로 규칙을 등록합니다.
    pub fn register_compiled(
        &mut self,
        name: &str,
        project: &str,
        section: Option<&str>,
        pattern: Regex,
        action: RuleAction,
    ) -> Result<&Rule, CanonError> {
        let kind = action.kind();

        if kind == RuleKind::FailureHook {
            let Some(section) = section else {
                return Err(CanonError::RuleValidation {
                    rule_id: name.to_owned(),
                    reason: "failure hook requires a section".to_owned(),
                });
            };
            let key = (project.to_owned(), section.to_owned());
            if self.failure_sections.contains(&key) {
                return Err(CanonError::DuplicateFailureHook {
                    project: key.0,
                    section: key.1,
                });
            }
            self.failure_sections.insert(key);
        }

        let rule = Rule {
            seq: self.next_seq,
            name: name.to_owned(),
            project: project.to_owned(),
            section: section.map(str::to_owned),
            pattern,
            action,
        };
        self.next_seq += 1;

        tracing::debug!(
            rule = %rule.name,
            project = %rule.project,
            section = ?rule.section,
            kind = %kind,
            "registered rule"
        );

        let list = self.rules.entry((project.to_owned(), kind)).or_default();
        list.push(rule);
        Ok(&list[list.len() - 1])
    }

    /// gsub 규칙을 등록합니다.
    pub fn register_gsub<F>(
        &mut self,
        project: &str,
        section: Option<&str>,
        pattern: &str,
        f: F,
    ) -> Result<&Rule, CanonError>
    where
        F: Fn(&Captures<'_>) -> Result<String, types::ActionError> + Send + Sync + 'static,
    {
        self.register(project, section, pattern, RuleAction::gsub(f))
    }

    /// gsub_stateful 규칙을 등록합니다.
    pub fn register_gsub_stateful<F>(
        &mut self,
        project: &str,
        section: Option<&str>,
        pattern: &str,
        f: F,
    ) -> Result<&Rule, CanonError>
    where
        F: Fn(&Captures<'_>, &mut IdTable) -> Result<String, types::ActionError>
            + Send
            + Sync
            + 'static,
    {
        self.register(project, section, pattern, RuleAction::gsub_stateful(f))
    }

    /// sort 규칙을 등록합니다.
    pub fn register_sort(
        &mut self,
        project: &str,
        section: Option<&str>,
        pattern: &str,
    ) -> Result<&Rule, CanonError> {
        self.register(project, section, pattern, RuleAction::Sort)
    }

    /// title hook을 등록합니다. `section`이 `None`이면 로그 전체에 대해 마지막에 실행됩니다.
    pub fn register_title_hook<F>(
        &mut self,
        project: &str,
        section: Option<&str>,
        pattern: &str,
        f: F,
    ) -> Result<&Rule, CanonError>
    where
        F: Fn(&mut Title, &Captures<'_>, &str) -> Result<(), types::ActionError>
            + Send
            + Sync
            + 'static,
    {
        self.register(project, section, pattern, RuleAction::title_hook(f))
    }

    /// failure hook을 등록합니다.
    pub fn register_failure_hook<F>(
        &mut self,
        project: &str,
        section: &str,
        pattern: &str,
        f: F,
    ) -> Result<&Rule, CanonError>
    where
        F: Fn(&Regex, &str) -> Result<FailureOutcome, types::ActionError> + Send + Sync + 'static,
    {
        self.register(project, Some(section), pattern, RuleAction::failure_hook(f))
    }

    /// YAML 규칙 정의를 컴파일해 등록합니다.
    pub fn register_spec(&mut self, spec: &RuleSpec) -> Result<&Rule, CanonError> {
        let (pattern, action) = spec.compile()?;
        self.register_compiled(
            &spec.id,
            &spec.project,
            spec.section.as_deref(),
            pattern,
            action,
        )
    }

    /// 디렉토리에서 YAML 규칙 파일을 로드해 등록합니다.
    ///
    /// 등록에 실패한 규칙(중복 failure hook 등)은 경고 로그를 남기고 건너뜁니다.
    /// 등록된 규칙 수를 반환합니다.
    pub async fn load_rules_from_dir(
        &mut self,
        dir: impl AsRef<Path>,
    ) -> Result<usize, CanonError> {
        let specs = RuleLoader::load_directory(dir).await?;
        let mut count = 0;
        for spec in &specs {
            match self.register_spec(spec) {
                Ok(_) => count += 1,
                Err(e) => {
                    tracing::warn!(rule_id = %spec.id, error = %e, "failed to register rule, skipping");
                }
            }
        }
        Ok(count)
    }

    /// `(project, kind)`의 규칙을 돌려줍니다. 전역 규칙이 먼저, 그다음 프로젝트 규칙입니다.
    ///
    /// 등록된 규칙이 없으면 빈 목록이며 실패하지 않습니다.
    pub fn lookup(&self, project: &str, kind: RuleKind) -> Vec<&Rule> {
        let global = self.list(GLOBAL_PROJECT, kind);
        if project.is_empty() {
            return global.iter().collect();
        }
        global.iter().chain(self.list(project, kind)).collect()
    }

    /// 치환 단계 규칙(gsub + gsub_stateful)을 실행 순서대로 돌려줍니다.
    ///
    /// 전역 규칙이 먼저이고, 각 그룹 안에서는 등록 순서를 따릅니다.
    pub fn rewrite_rules(&self, project: &str) -> Vec<&Rule> {
        let mut projects = vec![GLOBAL_PROJECT];
        if !project.is_empty() {
            projects.push(project);
        }
        let mut out = Vec::new();
        for p in projects {
            let mut group: Vec<&Rule> = self
                .list(p, RuleKind::Gsub)
                .iter()
                .chain(self.list(p, RuleKind::GsubStateful))
                .collect();
            group.sort_by_key(|r| r.seq);
            out.extend(group);
        }
        out
    }

    /// `(project, section)`의 failure hook. 프로젝트 규칙이 전역 규칙보다 우선합니다.
    pub fn failure_hook(&self, project: &str, section: &str) -> Option<&Rule> {
        let find = |p: &str| {
            self.list(p, RuleKind::FailureHook)
                .iter()
                .find(|r| r.section() == Some(section))
        };
        find(project).or_else(|| find(GLOBAL_PROJECT))
    }

    /// 등록된 모든 규칙 (등록 순서)
    pub fn rules(&self) -> impl Iterator<Item = &Rule> {
        let mut all: Vec<&Rule> = self.rules.values().flatten().collect();
        all.sort_by_key(|r| r.seq);
        all.into_iter()
    }

    /// 규칙이 하나 이상 등록된 프로젝트 이름 (전역은 빈 문자열)
    pub fn projects(&self) -> Vec<&str> {
        let set: BTreeSet<&str> = self.rules.keys().map(|(p, _)| p.as_str()).collect();
        set.into_iter().collect()
    }

    /// 전체 규칙 수
    pub fn rule_count(&self) -> usize {
        self.rules.values().map(Vec::len).sum()
    }

    fn list(&self, project: &str, kind: RuleKind) -> &[Rule] {
        self.rules
            .get(&(project.to_owned(), kind))
            .map_or(&[], Vec::as_slice)
    }
}
