#![no_main]

use std::sync::{Arc, OnceLock};

use arbitrary::Arbitrary;
use chklog_canon::{Canonicalizer, RuleRegistry, StatusExtractor, packs};
use chklog_core::LogDocument;
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct Input {
    ruby: bool,
    text: String,
}

fn registry() -> Arc<RuleRegistry> {
    static REGISTRY: OnceLock<Arc<RuleRegistry>> = OnceLock::new();
    REGISTRY
        .get_or_init(|| {
            let mut registry = RuleRegistry::new();
            packs::install_builtin(&mut registry).expect("builtin packs must compile");
            Arc::new(registry)
        })
        .clone()
}

fuzz_target!(|input: Input| {
    let project = if input.ruby { "ruby" } else { "other" };
    let registry = registry();

    // 줄 수는 정규화 전후로 같아야 한다
    let canonical = Canonicalizer::new(Arc::clone(&registry)).canonicalize(project, &input.text);
    assert_eq!(
        canonical.matches('\n').count(),
        input.text.matches('\n').count()
    );

    let document = LogDocument::parse(&input.text);
    let report = StatusExtractor::new(registry).extract(project, &document, project);
    let _ = report.title.render();
});
