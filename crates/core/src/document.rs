//! 로그 문서: 섹션 단위 빌드 로그 파서
//!
//! 빌드 러너가 남기는 로그는 `== <section> # <timestamp>` 헤더 줄로 구분된 섹션들의 연속입니다.
//! 첫 헤더 이전의 줄들은 이름 없는 프리앰블 섹션(`name == None`)이 됩니다.
//!
//! ```
//! use chklog_core::LogDocument;
//!
//! let doc = LogDocument::parse("== btest # 2013-04-06T12:00:00+09:00\nFAIL 1/900 tests failed\n");
//! let btest = doc.section("btest").unwrap();
//! assert_eq!(btest.text(), "FAIL 1/900 tests failed\n");
//! assert_eq!(doc.full_text(), "== btest # 2013-04-06T12:00:00+09:00\nFAIL 1/900 tests failed\n");
//! ```

use serde::Serialize;

/// 섹션 헤더 접두어
pub const HEADER_PREFIX: &str = "== ";

/// 헤더에서 섹션 이름과 타임스탬프를 나누는 구분자
const TIMESTAMP_SEPARATOR: &str = " # ";

/// 파싱된 로그 문서
///
/// 섹션 순서와 원본 텍스트를 그대로 보존합니다. 이름이 같은 섹션이 여러 번 나오면
/// 각각 별도 섹션으로 유지됩니다.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LogDocument {
    sections: Vec<Section>,
}

impl LogDocument {
    /// 텍스트를 섹션 단위로 나눕니다. 실패하지 않습니다.
    pub fn parse(text: &str) -> Self {
        let mut sections = Vec::new();
        let mut current = Section::preamble();

        for line in text.split_inclusive('\n') {
            if let Some((name, timestamp)) = parse_header(line) {
                if !current.is_empty() {
                    sections.push(current);
                }
                current = Section {
                    name: Some(name.to_owned()),
                    timestamp: timestamp.map(str::to_owned),
                    header_len: line.len(),
                    raw: line.to_owned(),
                };
            } else {
                current.raw.push_str(line);
            }
        }
        if !current.is_empty() {
            sections.push(current);
        }

        Self { sections }
    }

    /// 모든 섹션 (로그 순서)
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// 이름이 일치하는 첫 번째 섹션
    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections
            .iter()
            .find(|s| s.name.as_deref() == Some(name))
    }

    /// 이름 있는 섹션들의 이름 (로그 순서, 중복 포함)
    pub fn section_names(&self) -> impl Iterator<Item = &str> {
        self.sections.iter().filter_map(|s| s.name.as_deref())
    }

    /// 원본 텍스트 전체
    pub fn full_text(&self) -> String {
        self.sections.iter().map(|s| s.raw.as_str()).collect()
    }

    /// 섹션 수
    pub fn len(&self) -> usize {
        self.sections.len()
    }

    /// 섹션이 하나도 없는지 (빈 입력)
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

/// 로그 섹션 하나
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Section {
    name: Option<String>,
    timestamp: Option<String>,
    #[serde(skip)]
    header_len: usize,
    raw: String,
}

impl Section {
    fn preamble() -> Self {
        Self {
            name: None,
            timestamp: None,
            header_len: 0,
            raw: String::new(),
        }
    }

    fn is_empty(&self) -> bool {
        self.name.is_none() && self.raw.is_empty()
    }

    /// 섹션 이름. 프리앰블이면 `None`
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// 헤더의 타임스탬프
    pub fn timestamp(&self) -> Option<&str> {
        self.timestamp.as_deref()
    }

    /// 헤더 줄 (줄바꿈 포함). 프리앰블이면 `None`
    pub fn header(&self) -> Option<&str> {
        self.name.as_ref().map(|_| &self.raw[..self.header_len])
    }

    /// 헤더를 제외한 본문
    pub fn text(&self) -> &str {
        &self.raw[self.header_len..]
    }

    /// 헤더를 포함한 원본 텍스트
    pub fn raw(&self) -> &str {
        &self.raw
    }
}

/// 헤더 줄이면 `(name, timestamp)`를 돌려줍니다.
fn parse_header(line: &str) -> Option<(&str, Option<&str>)> {
    let line = line.trim_end_matches(['\n', '\r']);
    let rest = line.strip_prefix(HEADER_PREFIX)?;
    let (name, timestamp) = match rest.split_once(TIMESTAMP_SEPARATOR) {
        Some((name, ts)) => (name.trim(), Some(ts.trim())),
        None => (rest.trim(), None),
    };
    if name.is_empty() || name.contains(char::is_whitespace) {
        return None;
    }
    Some((name, timestamp.filter(|t| !t.is_empty())))
}
