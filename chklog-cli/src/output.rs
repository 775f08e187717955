//! Output formatting abstraction for text vs JSON rendering
//!
//! All subcommand output flows through [`OutputWriter`] which handles format switching.
//! This keeps format-specific logic out of command handlers entirely.

use std::io::Write;

use serde::Serialize;

use crate::cli::OutputFormat;
use crate::error::CliError;

/// Abstraction for writing CLI output in different formats.
///
/// Subcommand handlers call `writer.render(&payload)` where `payload`
/// implements both `Serialize` (for JSON) and `Render` (for text).
pub struct OutputWriter {
    format: OutputFormat,
}

impl OutputWriter {
    /// Create a new output writer with the specified format.
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Render a payload to stdout.
    pub fn render<T: Render + Serialize>(&self, payload: &T) -> Result<(), CliError> {
        let stdout = std::io::stdout();
        let mut handle = stdout.lock();
        self.render_to(payload, &mut handle)
    }

    /// Render a payload to an arbitrary writer.
    ///
    /// For `Text` format, delegates to `Render::render_text()`.
    /// For `Json` format, serialises via `serde_json`.
    pub fn render_to<T: Render + Serialize>(
        &self,
        payload: &T,
        w: &mut dyn Write,
    ) -> Result<(), CliError> {
        match self.format {
            OutputFormat::Text => {
                payload.render_text(w)?;
            }
            OutputFormat::Json => {
                serde_json::to_writer_pretty(&mut *w, payload)?;
                writeln!(w)?;
            }
        }
        w.flush()?;
        Ok(())
    }
}

/// Trait for human-readable text rendering.
///
/// Implemented by every CLI output payload alongside `serde::Serialize`.
pub trait Render {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Minimal marker payload shaped like the status output.
    #[derive(Serialize)]
    struct MarkerLine {
        section: String,
        code: Option<String>,
    }

    impl Render for MarkerLine {
        fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
            writeln!(w, "{} {}", self.section, self.code.as_deref().unwrap_or("ok"))
        }
    }

    fn failed() -> MarkerLine {
        MarkerLine {
            section: "test-all".to_owned(),
            code: Some("6F0E".to_owned()),
        }
    }

    #[test]
    fn text_format_delegates_to_render_text() {
        let mut buffer = Vec::new();
        OutputWriter::new(OutputFormat::Text)
            .render_to(&failed(), &mut buffer)
            .expect("text rendering should succeed");
        assert_eq!(String::from_utf8(buffer).expect("valid UTF-8"), "test-all 6F0E\n");
    }

    #[test]
    fn json_format_is_pretty_and_newline_terminated() {
        let mut buffer = Vec::new();
        OutputWriter::new(OutputFormat::Json)
            .render_to(&failed(), &mut buffer)
            .expect("json rendering should succeed");

        let output = String::from_utf8(buffer).expect("valid UTF-8");
        assert!(output.ends_with("}\n"));
        assert!(output.contains("\n  \"section\""), "pretty-printed: {output}");
        let parsed: serde_json::Value = serde_json::from_str(&output).expect("should parse JSON");
        assert_eq!(parsed["code"].as_str(), Some("6F0E"));
    }

    #[test]
    fn json_keeps_absent_code_as_null() {
        let passed = MarkerLine {
            section: "btest".to_owned(),
            code: None,
        };
        let mut buffer = Vec::new();
        OutputWriter::new(OutputFormat::Json)
            .render_to(&passed, &mut buffer)
            .expect("json rendering should succeed");
        let parsed: serde_json::Value = serde_json::from_slice(&buffer).expect("should parse JSON");
        assert!(parsed["code"].is_null());
    }

    #[test]
    fn canonical_text_with_non_ascii_passes_through() {
        let payload = MarkerLine {
            section: "test-all".to_owned(),
            code: Some("rubyspec:NoSummary 日本語".to_owned()),
        };
        let mut buffer = Vec::new();
        OutputWriter::new(OutputFormat::Text)
            .render_to(&payload, &mut buffer)
            .expect("rendering should succeed");
        assert!(String::from_utf8(buffer).expect("valid UTF-8").contains("日本語"));
    }
}
