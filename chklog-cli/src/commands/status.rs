//! `chklog status` command handler

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use chklog_canon::StatusExtractor;
use chklog_core::{FailureOutcome, LogDocument, StatusReport};

use crate::cli::StatusArgs;
use crate::commands::{build_registry, load_config, read_log};
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `status` command.
pub async fn execute(
    args: StatusArgs,
    config_path: Option<&Path>,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let (config, _) = load_config(config_path).await?;
    let project = args.project.unwrap_or_else(|| config.canon.project.clone());
    let display_name = args
        .name
        .unwrap_or_else(|| config.canon.effective_display_name().to_owned());
    let registry = build_registry(&config).await?;
    let text = read_log(&args.log).await?;

    let extractor = StatusExtractor::new(Arc::new(registry));
    let report = extractor.extract(&project, &LogDocument::parse(&text), &display_name);

    info!(
        log = %args.log.display(),
        project = %project,
        markers = report.markers.len(),
        failed = report.has_failures(),
        "extracted build status"
    );

    writer.render(&StatusOutput::new(project, report))
}

/// Status output: the rendered title line plus the structured report.
#[derive(Serialize)]
pub struct StatusOutput {
    pub project: String,
    pub title_line: String,
    #[serde(flatten)]
    pub report: StatusReport,
}

impl StatusOutput {
    pub fn new(project: String, report: StatusReport) -> Self {
        Self {
            project,
            title_line: report.title.render(),
            report,
        }
    }
}

impl Render for StatusOutput {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "{}", self.title_line.bold())?;
        writeln!(w)?;
        writeln!(w, "  Project:  {}", self.project)?;
        writeln!(
            w,
            "  Revision: {}",
            self.report.title.revision.as_deref().unwrap_or("-")
        )?;
        writeln!(
            w,
            "  Version:  {}",
            self.report.title.version.as_deref().unwrap_or("-")
        )?;
        if let Some(mark) = self.report.title.mark.as_deref() {
            writeln!(w, "  Mark:     {}", mark.red().bold())?;
        }

        if self.report.markers.is_empty() {
            writeln!(w)?;
            writeln!(w, "No failure markers.")?;
            return Ok(());
        }

        writeln!(w)?;
        writeln!(w, "{:<20} {:<12} Code", "Section", "Result")?;
        writeln!(w, "{}", "-".repeat(50))?;
        for marker in &self.report.markers {
            let result = match &marker.outcome {
                FailureOutcome::Passed => "passed".green(),
                FailureOutcome::Failed(_) => "failed".red(),
                FailureOutcome::Unparseable(_) => "unparseable".yellow(),
            };
            writeln!(
                w,
                "{:<20} {:<12} {}",
                marker.section,
                result,
                marker.outcome.code().unwrap_or("")
            )?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chklog_core::{SectionMarker, Title};

    fn sample() -> StatusOutput {
        let mut title = Title::new("ruby-trunk");
        title.revision = Some("rev:40000".to_owned());
        title.failures.push("6F0E".to_owned());
        StatusOutput::new(
            "ruby".to_owned(),
            StatusReport {
                title,
                markers: vec![
                    SectionMarker {
                        section: "btest".to_owned(),
                        outcome: FailureOutcome::Passed,
                    },
                    SectionMarker {
                        section: "test-all".to_owned(),
                        outcome: FailureOutcome::Failed("6F0E".to_owned()),
                    },
                ],
            },
        )
    }

    #[test]
    fn title_line_is_rendered_on_construction() {
        assert_eq!(sample().title_line, "6F0E ruby-trunk rev:40000");
    }

    #[test]
    fn text_lists_each_marker() {
        colored::control::set_override(false);
        let mut buffer = Vec::new();
        sample().render_text(&mut buffer).expect("render");
        let output = String::from_utf8(buffer).expect("valid UTF-8");
        assert!(output.starts_with("6F0E ruby-trunk rev:40000\n"));
        assert!(output.contains("btest"));
        assert!(output.contains("test-all"));
        assert!(output.contains("6F0E"));
        assert!(output.contains("Revision: rev:40000"));
        assert!(output.contains("Version:  -"));
    }

    #[test]
    fn text_without_markers() {
        let output = StatusOutput::new("ruby".to_owned(), StatusReport::default());
        let mut buffer = Vec::new();
        output.render_text(&mut buffer).expect("render");
        let text = String::from_utf8(buffer).expect("valid UTF-8");
        assert!(text.contains("No failure markers."));
    }

    #[test]
    fn json_flattens_report() {
        let parsed: serde_json::Value =
            serde_json::from_str(&serde_json::to_string(&sample()).expect("json")).expect("parse");
        assert_eq!(parsed["project"].as_str(), Some("ruby"));
        assert_eq!(parsed["title_line"].as_str(), Some("6F0E ruby-trunk rev:40000"));
        assert_eq!(parsed["title"]["revision"].as_str(), Some("rev:40000"));
        assert_eq!(parsed["markers"][1]["outcome"]["status"].as_str(), Some("failed"));
        assert_eq!(parsed["markers"][1]["outcome"]["code"].as_str(), Some("6F0E"));
        assert_eq!(parsed["markers"][0]["outcome"]["status"].as_str(), Some("passed"));
    }
}
