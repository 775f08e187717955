#![no_main]

use chklog_core::LogDocument;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let text = String::from_utf8_lossy(data);
    let document = LogDocument::parse(&text);

    // 섹션 분할은 원문을 잃지 않아야 한다
    assert_eq!(document.full_text(), text);
    for name in document.section_names() {
        assert!(document.section(name).is_some());
    }
});
