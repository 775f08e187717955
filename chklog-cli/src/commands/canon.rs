//! `chklog canon` command handler

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use chklog_canon::Canonicalizer;
use chklog_core::LogDocument;

use crate::cli::CanonArgs;
use crate::commands::{build_registry, load_config, read_log};
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `canon` command.
pub async fn execute(
    args: CanonArgs,
    config_path: Option<&Path>,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let (config, _) = load_config(config_path).await?;
    let project = args.project.unwrap_or_else(|| config.canon.project.clone());
    let registry = build_registry(&config).await?;
    let text = read_log(&args.log).await?;

    info!(
        log = %args.log.display(),
        project = %project,
        section = ?args.section,
        "canonicalizing log"
    );

    let report = canonicalize(
        Canonicalizer::new(Arc::new(registry)),
        &project,
        &text,
        args.section.as_deref(),
    )?;
    writer.render(&report)
}

/// Canonicalize the whole log or every occurrence of one section.
///
/// Repeated sections are joined in log order and share identifier state.
fn canonicalize(
    canon: Canonicalizer,
    project: &str,
    text: &str,
    section: Option<&str>,
) -> Result<CanonReport, CliError> {
    let canonical = match section {
        None => canon.canonicalize(project, text),
        Some(name) => {
            let document = LogDocument::parse(text);
            let raw: String = document
                .sections()
                .iter()
                .filter(|s| s.name() == Some(name))
                .map(|s| s.raw())
                .collect();
            if raw.is_empty() {
                return Err(CliError::Command(format!("section not found in log: {name}")));
            }
            canon.canonicalize_section(project, name, &raw)
        }
    };

    Ok(CanonReport {
        project: project.to_owned(),
        section: section.map(str::to_owned),
        text: canonical,
    })
}

/// Canonical text output.
#[derive(Serialize)]
pub struct CanonReport {
    pub project: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    pub text: String,
}

impl Render for CanonReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        w.write_all(self.text.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chklog_canon::{RuleRegistry, packs};

    const LOG: &str = "\
== make # 2013-04-06T12:00:00+09:00
vm.c:2012:5: warning: foo
== test-all # 2013-04-06T12:10:00+09:00
Finished tests in 527.896930s, 16.5241 tests/s, 4174.6880 assertions/s.
";

    fn canonicalizer() -> Canonicalizer {
        let mut registry = RuleRegistry::new();
        packs::install_builtin(&mut registry).expect("builtin packs");
        Canonicalizer::new(Arc::new(registry))
    }

    #[test]
    fn whole_log_is_canonicalized() {
        let report = canonicalize(canonicalizer(), "ruby", LOG, None).expect("canonicalize");
        assert_eq!(
            report.text,
            "== make # <time>\n\
             vm.c:<line_a>:5: warning: foo\n\
             == test-all # <time>\n\
             Finished tests in <n>s, <n> tests/s, <n> assertions/s.\n"
        );
        assert!(report.section.is_none());
    }

    #[test]
    fn single_section_includes_its_header() {
        let report =
            canonicalize(canonicalizer(), "ruby", LOG, Some("test-all")).expect("canonicalize");
        assert_eq!(
            report.text,
            "== test-all # <time>\nFinished tests in <n>s, <n> tests/s, <n> assertions/s.\n"
        );
    }

    #[test]
    fn repeated_section_is_canonicalized_everywhere() {
        let log = "\
== make # 2013-04-06T12:00:00+09:00
vm.c:2012:5: warning: foo
== test-all # 2013-04-06T12:10:00+09:00
ok
== make # 2013-04-06T12:20:00+09:00
vm.c:3001:5: warning: foo
";
        let report =
            canonicalize(canonicalizer(), "ruby", log, Some("make")).expect("canonicalize");
        assert_eq!(
            report.text,
            "== make # <time>\n\
             vm.c:<line_a>:5: warning: foo\n\
             == make # <time>\n\
             vm.c:<line_b>:5: warning: foo\n"
        );
    }

    #[test]
    fn missing_section_is_command_error() {
        let err = canonicalize(canonicalizer(), "ruby", LOG, Some("rubyspec"))
            .err()
            .expect("section is absent");
        assert!(matches!(err, CliError::Command(_)));
    }

    #[test]
    fn text_rendering_is_verbatim() {
        let report = CanonReport {
            project: "ruby".to_owned(),
            section: None,
            text: "a\r\nb".to_owned(),
        };
        let mut buffer = Vec::new();
        report.render_text(&mut buffer).expect("render");
        assert_eq!(buffer, b"a\r\nb");
    }

    #[test]
    fn json_skips_absent_section() {
        let report = CanonReport {
            project: "ruby".to_owned(),
            section: None,
            text: "x\n".to_owned(),
        };
        let parsed: serde_json::Value =
            serde_json::from_str(&serde_json::to_string(&report).expect("json")).expect("parse");
        assert!(parsed.get("section").is_none());
        assert_eq!(parsed["text"].as_str(), Some("x\n"));
    }
}
