//! 전역 규칙 팩

use crate::error::CanonError;
use crate::rule::{GLOBAL_PROJECT, RuleAction, RuleRegistry};

/// 전역 규칙을 설치합니다.
pub fn install(registry: &mut RuleRegistry) -> Result<(), CanonError> {
    // == test-all # 2013-04-06T12:00:00+09:00
    registry.register_named(
        "generic-section-time",
        GLOBAL_PROJECT,
        None,
        r"^(== \S+) # .+$",
        RuleAction::replace("${1} # <time>"),
    )?;
    Ok(())
}
