//! 규칙 데이터 타입
//!
//! 규칙 종류는 닫힌 열거형 [`RuleAction`]으로 표현하며, 각 변형이 자신의 액션을 가집니다.
//! 액션은 `Result`를 돌려주고, 실패하면 호출자가 그 규칙 적용 하나만 건너뜁니다.

use std::fmt;
use std::sync::Arc;

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

use chklog_core::types::{FailureOutcome, Title};

use crate::state::IdTable;

/// 규칙 액션 실패
///
/// 규칙 자체의 결함이며, 해당 줄(또는 섹션)에 대한 그 규칙의 적용만 건너뜁니다.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct ActionError(pub String);

impl ActionError {
    /// 메시지로 에러를 만듭니다.
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

/// 순수 치환 액션: 매치 하나 -> 치환 문자열
pub type GsubFn = dyn Fn(&Captures<'_>) -> Result<String, ActionError> + Send + Sync;

/// 상태 치환 액션: 매치 하나 + 규칙의 식별자 테이블 -> 치환 문자열
pub type StatefulFn =
    dyn Fn(&Captures<'_>, &mut IdTable) -> Result<String, ActionError> + Send + Sync;

/// 타이틀 액션: 패턴이 매치했을 때만 호출됩니다. 세 번째 인자는 섹션 전체 텍스트입니다.
pub type TitleFn =
    dyn Fn(&mut Title, &Captures<'_>, &str) -> Result<(), ActionError> + Send + Sync;

/// 실패 판정 액션: 규칙 패턴과 섹션 텍스트 -> 결과
pub type FailureFn = dyn Fn(&Regex, &str) -> Result<FailureOutcome, ActionError> + Send + Sync;

/// 실패 코드 렌더러: 마지막 요약 매치 -> 코드. `None`이면 통과
pub type SummaryFn = dyn Fn(&Captures<'_>) -> Result<Option<String>, ActionError> + Send + Sync;

/// 규칙 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    /// 순수 치환
    Gsub,
    /// 식별자 할당 치환
    GsubStateful,
    /// 연속 매치 줄 정렬
    Sort,
    /// 타이틀 갱신
    TitleHook,
    /// 섹션 실패 코드
    FailureHook,
}

impl RuleKind {
    /// 모든 종류 (정의 순서)
    pub const ALL: [RuleKind; 5] = [
        RuleKind::Gsub,
        RuleKind::GsubStateful,
        RuleKind::Sort,
        RuleKind::TitleHook,
        RuleKind::FailureHook,
    ];

    /// 종류 이름
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gsub => "gsub",
            Self::GsubStateful => "gsub_stateful",
            Self::Sort => "sort",
            Self::TitleHook => "title_hook",
            Self::FailureHook => "failure_hook",
        }
    }

    /// 문자열에서 종류를 파싱합니다 (대소문자, `-`/`_` 무시).
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "gsub" => Some(Self::Gsub),
            "gsub_stateful" | "stateful" => Some(Self::GsubStateful),
            "sort" => Some(Self::Sort),
            "title_hook" | "title" => Some(Self::TitleHook),
            "failure_hook" | "failure" => Some(Self::FailureHook),
            _ => None,
        }
    }

    /// 정규화 파이프라인의 치환 단계에 속하는지
    pub fn is_rewrite(&self) -> bool {
        matches!(self, Self::Gsub | Self::GsubStateful)
    }
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 규칙 액션 -- 종류별로 닫힌 변형
#[derive(Clone)]
pub enum RuleAction {
    /// 매치마다 순수 함수로 치환
    Gsub(Arc<GsubFn>),
    /// 매치마다 식별자 테이블을 참조해 치환
    GsubStateful(Arc<StatefulFn>),
    /// 패턴에 매치하는 연속 줄을 사전순 정렬
    Sort,
    /// 패턴이 매치하면 타이틀을 갱신
    TitleHook(Arc<TitleFn>),
    /// 섹션 텍스트로 실패 여부를 판정
    FailureHook(Arc<FailureFn>),
}

impl RuleAction {
    /// 클로저로 gsub 액션을 만듭니다.
    pub fn gsub<F>(f: F) -> Self
    where
        F: Fn(&Captures<'_>) -> Result<String, ActionError> + Send + Sync + 'static,
    {
        Self::Gsub(Arc::new(f))
    }

    /// `$1`, `${name}` 캡처 확장을 쓰는 템플릿 치환 액션을 만듭니다.
    pub fn replace(template: impl Into<String>) -> Self {
        let template = template.into();
        Self::gsub(move |caps| {
            let mut dst = String::new();
            caps.expand(&template, &mut dst);
            Ok(dst)
        })
    }

    /// 클로저로 gsub_stateful 액션을 만듭니다.
    pub fn gsub_stateful<F>(f: F) -> Self
    where
        F: Fn(&Captures<'_>, &mut IdTable) -> Result<String, ActionError> + Send + Sync + 'static,
    {
        Self::GsubStateful(Arc::new(f))
    }

    /// 템플릿 기반 gsub_stateful 액션을 만듭니다.
    ///
    /// `key`와 `value` 템플릿으로 정규화 키와 원시 값을 만들고,
    /// `replace` 템플릿의 `${id}`를 할당된 식별자로 바꿉니다.
    pub fn allocate(
        key: impl Into<String>,
        value: impl Into<String>,
        replace: impl Into<String>,
    ) -> Self {
        let key = key.into();
        let value = value.into();
        let replace = replace.into();
        Self::gsub_stateful(move |caps, table| {
            let mut k = String::new();
            caps.expand(&key, &mut k);
            let mut raw = String::new();
            caps.expand(&value, &mut raw);
            if raw.is_empty() {
                return Err(ActionError::new(format!(
                    "value template '{value}' expanded to an empty string"
                )));
            }
            let id = table.assign(&k, &raw);
            let mut dst = String::new();
            caps.expand(&replace.replace("${id}", &id), &mut dst);
            Ok(dst)
        })
    }

    /// 클로저로 title hook 액션을 만듭니다.
    pub fn title_hook<F>(f: F) -> Self
    where
        F: Fn(&mut Title, &Captures<'_>, &str) -> Result<(), ActionError> + Send + Sync + 'static,
    {
        Self::TitleHook(Arc::new(f))
    }

    /// 클로저로 failure hook 액션을 만듭니다.
    pub fn failure_hook<F>(f: F) -> Self
    where
        F: Fn(&Regex, &str) -> Result<FailureOutcome, ActionError> + Send + Sync + 'static,
    {
        Self::FailureHook(Arc::new(f))
    }

    /// 요약 줄 기반 failure hook을 만듭니다.
    ///
    /// 판정 순서:
    /// 1. `pass` 패턴이 매치하면 `Passed`
    /// 2. 규칙 패턴의 마지막 매치를 `render`에 넘겨 `Some(code)`면 `Failed`, `None`이면 `Passed`
    /// 3. 매치가 없으면 `Unparseable(unparseable)`
    pub fn summary<F>(pass: Option<Regex>, unparseable: impl Into<String>, render: F) -> Self
    where
        F: Fn(&Captures<'_>) -> Result<Option<String>, ActionError> + Send + Sync + 'static,
    {
        let unparseable = unparseable.into();
        let render: Arc<SummaryFn> = Arc::new(render);
        Self::failure_hook(move |pattern, text| {
            if pass.as_ref().is_some_and(|p| p.is_match(text)) {
                return Ok(FailureOutcome::Passed);
            }
            match pattern.captures_iter(text).last() {
                Some(caps) => Ok(match render(&caps)? {
                    Some(code) => FailureOutcome::Failed(code),
                    None => FailureOutcome::Passed,
                }),
                None => Ok(FailureOutcome::Unparseable(unparseable.clone())),
            }
        })
    }

    /// 이 액션의 규칙 종류
    pub fn kind(&self) -> RuleKind {
        match self {
            Self::Gsub(_) => RuleKind::Gsub,
            Self::GsubStateful(_) => RuleKind::GsubStateful,
            Self::Sort => RuleKind::Sort,
            Self::TitleHook(_) => RuleKind::TitleHook,
            Self::FailureHook(_) => RuleKind::FailureHook,
        }
    }
}

impl fmt::Debug for RuleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RuleAction::{}", self.kind())
    }
}

/// 캡처 그룹 1번부터의 숫자 값을 읽습니다. 숫자가 아닌 그룹은 건너뜁니다.
pub fn capture_counts(caps: &Captures<'_>) -> Vec<u64> {
    caps.iter()
        .skip(1)
        .flatten()
        .filter_map(|m| m.as_str().parse::<u64>().ok())
        .collect()
}

/// 등록된 규칙 -- 등록 후 변경되지 않습니다.
#[derive(Debug, Clone)]
pub struct Rule {
    pub(crate) seq: u64,
    pub(crate) name: String,
    pub(crate) project: String,
    pub(crate) section: Option<String>,
    pub(crate) pattern: Regex,
    pub(crate) action: RuleAction,
}

impl Rule {
    /// 레지스트리 내 등록 순번 (전역적으로 증가)
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// 규칙 이름 (YAML `id` 또는 자동 생성 이름)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 프로젝트 이름. 빈 문자열이면 전역 규칙
    pub fn project(&self) -> &str {
        &self.project
    }

    /// 전역 규칙인지
    pub fn is_global(&self) -> bool {
        self.project.is_empty()
    }

    /// 적용 섹션. `None`이면 로그 전체
    pub fn section(&self) -> Option<&str> {
        self.section.as_deref()
    }

    /// 규칙 패턴
    pub fn pattern(&self) -> &Regex {
        &self.pattern
    }

    /// 규칙 액션
    pub fn action(&self) -> &RuleAction {
        &self.action
    }

    /// 규칙 종류
    pub fn kind(&self) -> RuleKind {
        self.action.kind()
    }

    /// 주어진 섹션의 줄에 이 규칙이 적용되는지
    pub fn applies_to(&self, section: Option<&str>) -> bool {
        match self.section.as_deref() {
            None => true,
            Some(own) => section == Some(own),
        }
    }
}
