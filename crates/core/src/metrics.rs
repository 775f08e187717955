//! 메트릭 상수 및 설명 등록
//!
//! 모든 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 각 모듈은 이 상수를 사용하여 `metrics::counter!()` 매크로를 호출합니다.
//! 레코더(exporter)는 설치하지 않으므로, 레코더가 없으면 카운터 호출은 no-op입니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `chklog_`
//! - 모듈명: `canon_`, `extract_`
//! - 접미어: `_total` (counter)
//!
//! # 사용 예시
//!
//! ```ignore
//! use metrics::counter;
//!
//! counter!(chklog_core::metrics::CANON_LINES_TOTAL).increment(1);
//! ```

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 프로젝트(빌드 대상) 레이블 키
pub const LABEL_PROJECT: &str = "project";

/// 규칙 종류 레이블 키 (gsub, gsub_stateful, sort, title_hook, failure_hook)
pub const LABEL_KIND: &str = "kind";

/// 섹션 이름 레이블 키
pub const LABEL_SECTION: &str = "section";

/// 결과 레이블 키 (failed, unparseable)
pub const LABEL_RESULT: &str = "result";

// ─── Canonicalization 메트릭 ───────────────────────────────────────

/// Canon: 정규화된 전체 줄 수 (counter)
pub const CANON_LINES_TOTAL: &str = "chklog_canon_lines_total";

/// Canon: 규칙 액션 실패 수 (counter, label: kind)
pub const CANON_RULE_FAILURES_TOTAL: &str = "chklog_canon_rule_failures_total";

// ─── Extractor 메트릭 ──────────────────────────────────────────────

/// Extract: 산출된 실패 마커 수 (counter, labels: section, result)
pub const EXTRACT_FAILURE_MARKERS_TOTAL: &str = "chklog_extract_failure_markers_total";

// ─── 설명 등록 함수 ─────────────────────────────────────────────────

/// 모든 메트릭의 설명(description)을 등록합니다.
///
/// CLI 시작 시점에서 한 번 호출합니다.
pub fn describe_all() {
    use metrics::describe_counter;

    describe_counter!(
        CANON_LINES_TOTAL,
        "Total number of log lines passed through the canonicalization pipeline"
    );
    describe_counter!(
        CANON_RULE_FAILURES_TOTAL,
        "Total number of rule actions that failed and were skipped"
    );
    describe_counter!(
        EXTRACT_FAILURE_MARKERS_TOTAL,
        "Total number of failure markers produced by failure hooks"
    );
}
