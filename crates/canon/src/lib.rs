#![doc = include_str!("../README.md")]
//!
//! # 모듈 구성
//!
//! - [`rule`]: 규칙 타입, 레지스트리, YAML 규칙 로더
//! - [`state`]: gsub_stateful 규칙의 식별자 할당 테이블
//! - [`pipeline`]: 줄 단위 정규화 파이프라인 (치환 후 정렬)
//! - [`extract`]: 타이틀/실패 마커 추출과 이상 마크 카운터
//! - [`packs`]: 내장 규칙 팩 (전역, ruby)
//! - [`error`]: 도메인 에러 타입
//!
//! # 아키텍처
//!
//! ```text
//! LogDocument -> Canonicalizer (gsub/gsub_stateful -> sort) -> canonical text
//!      |
//!      +-----> StatusExtractor (title hooks -> failure hooks -> whole-log hooks) -> StatusReport
//!                         ^
//!                    RuleRegistry (builtin packs + YAML rules)
//! ```

pub mod error;
pub mod extract;
pub mod packs;
pub mod pipeline;
pub mod rule;
pub mod state;

// --- 주요 타입 re-export ---

// 파이프라인
pub use pipeline::Canonicalizer;

// 추출
pub use extract::{MarkCounter, StatusExtractor};

// 규칙
pub use rule::{ActionError, Rule, RuleAction, RuleKind, RuleLoader, RuleRegistry, RuleSpec};

// 상태
pub use state::{CanonState, IdTable, id_label};

// 에러
pub use error::CanonError;
