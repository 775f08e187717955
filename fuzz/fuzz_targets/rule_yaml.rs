#![no_main]

use chklog_canon::RuleLoader;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // YAML 파서는 &str을 받으므로 UTF-8 변환 필요
    if let Ok(yaml_str) = std::str::from_utf8(data) {
        // 파싱에 성공한 규칙은 컴파일까지 패닉 없이 끝나야 한다
        if let Ok(spec) = RuleLoader::parse_yaml(yaml_str, "fuzz-input.yml") {
            let _ = spec.compile();
        }
    }
});
