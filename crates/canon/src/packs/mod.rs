//! 내장 규칙 팩
//!
//! - [`generic`]: 모든 프로젝트에 적용되는 전역 규칙 (섹션 헤더 타임스탬프)
//! - [`ruby`]: `ruby` 빌드 대상의 title/failure hook과 diff 전처리 규칙

pub mod generic;
pub mod ruby;

use chklog_core::config::MarkConfig;

use crate::error::CanonError;
use crate::rule::RuleRegistry;

/// 내장 팩을 모두 설치합니다 (기본 마크 설정 사용).
pub fn install_builtin(registry: &mut RuleRegistry) -> Result<(), CanonError> {
    install_builtin_with(registry, &MarkConfig::default())
}

/// 주어진 마크 설정으로 내장 팩을 모두 설치합니다.
pub fn install_builtin_with(
    registry: &mut RuleRegistry,
    mark: &MarkConfig,
) -> Result<(), CanonError> {
    let before = registry.rule_count();
    generic::install(registry)?;
    ruby::install(registry, mark)?;
    tracing::info!(
        rules = registry.rule_count() - before,
        "installed builtin rule packs"
    );
    Ok(())
}
