//! `chklog rules` command handler

use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};

use chklog_canon::{RuleKind, RuleLoader, RuleRegistry};

use crate::cli::{RulesAction, RulesArgs};
use crate::commands::{build_registry, load_config};
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `rules` command.
pub async fn execute(
    args: RulesArgs,
    config_path: Option<&Path>,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    match args.action {
        RulesAction::List { project, kind } => {
            execute_list(config_path, project, kind, writer).await
        }
        RulesAction::Validate { path } => execute_validate(&path, writer).await,
    }
}

async fn execute_list(
    config_path: Option<&Path>,
    project: Option<String>,
    kind: Option<String>,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let kind = match kind.as_deref() {
        Some(k) => Some(RuleKind::from_str_loose(k).ok_or_else(|| {
            CliError::Command(format!(
                "unknown rule kind: {k} (expected: gsub, gsub_stateful, sort, title_hook, failure_hook)"
            ))
        })?),
        None => None,
    };

    let (config, _) = load_config(config_path).await?;
    let registry = build_registry(&config).await?;

    let report = list_rules(&registry, project.as_deref(), kind);
    info!(total = report.total, "listing rules");
    writer.render(&report)
}

/// Registered rules in registration order, filtered by project and kind.
fn list_rules(registry: &RuleRegistry, project: Option<&str>, kind: Option<RuleKind>) -> RuleListReport {
    let rules: Vec<RuleEntry> = registry
        .rules()
        .filter(|r| project.is_none_or(|p| r.is_global() || r.project() == p))
        .filter(|r| kind.is_none_or(|k| r.kind() == k))
        .map(|r| RuleEntry {
            seq: r.seq(),
            name: r.name().to_owned(),
            project: r.project().to_owned(),
            section: r.section().map(str::to_owned),
            kind: r.kind(),
            pattern: r.pattern().as_str().to_owned(),
        })
        .collect();

    RuleListReport {
        total: rules.len(),
        rules,
    }
}

async fn execute_validate(path: &Path, writer: &OutputWriter) -> Result<(), CliError> {
    info!(path = %path.display(), "validating rule files");

    let report = validate_dir(path).await?;
    writer.render(&report)?;

    if report.invalid > 0 {
        return Err(CliError::Rule(format!("{} invalid rule files", report.invalid)));
    }
    Ok(())
}

/// Validate every YAML file in `dir`, collecting one error per bad file.
async fn validate_dir(dir: &Path) -> Result<RuleValidationReport, CliError> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut files: Vec<PathBuf> = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path
            .extension()
            .is_some_and(|ext| ext == "yml" || ext == "yaml")
        {
            files.push(path);
        }
    }
    files.sort();

    let mut seen_ids = HashSet::new();
    let mut errors = Vec::new();
    let mut valid = 0;

    for file in &files {
        match RuleLoader::load_file(file).await {
            Ok(spec) if !seen_ids.insert(spec.id.clone()) => {
                errors.push(RuleFileError {
                    file: file.display().to_string(),
                    error: format!("duplicate rule id '{}'", spec.id),
                });
            }
            Ok(_) => valid += 1,
            Err(e) => {
                warn!(file = %file.display(), error = %e, "invalid rule file");
                errors.push(RuleFileError {
                    file: file.display().to_string(),
                    error: e.to_string(),
                });
            }
        }
    }

    Ok(RuleValidationReport {
        path: dir.display().to_string(),
        total_files: files.len(),
        valid,
        invalid: errors.len(),
        errors,
    })
}

#[derive(Serialize)]
pub struct RuleListReport {
    pub total: usize,
    pub rules: Vec<RuleEntry>,
}

#[derive(Serialize)]
pub struct RuleEntry {
    pub seq: u64,
    pub name: String,
    pub project: String,
    pub section: Option<String>,
    pub kind: RuleKind,
    pub pattern: String,
}

impl Render for RuleListReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Rules ({} total)", self.total.to_string().bold())?;
        writeln!(w)?;
        writeln!(
            w,
            "{:<5} {:<32} {:<8} {:<14} {:<16} Pattern",
            "Seq", "Name", "Project", "Kind", "Section"
        )?;
        writeln!(w, "{}", "-".repeat(100))?;

        for r in &self.rules {
            let project = if r.project.is_empty() {
                "(global)".dimmed()
            } else {
                r.project.normal()
            };
            writeln!(
                w,
                "{:<5} {:<32} {:<8} {:<14} {:<16} {}",
                r.seq,
                r.name,
                project,
                r.kind.as_str(),
                r.section.as_deref().unwrap_or("*"),
                r.pattern
            )?;
        }

        Ok(())
    }
}

#[derive(Serialize)]
pub struct RuleValidationReport {
    pub path: String,
    pub total_files: usize,
    pub valid: usize,
    pub invalid: usize,
    pub errors: Vec<RuleFileError>,
}

#[derive(Serialize)]
pub struct RuleFileError {
    pub file: String,
    pub error: String,
}

impl Render for RuleValidationReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Rule Validation: {}", self.path.bold())?;
        writeln!(
            w,
            "  Files: {} total, {} valid, {} invalid",
            self.total_files,
            self.valid.to_string().green(),
            if self.invalid > 0 {
                self.invalid.to_string().red()
            } else {
                self.invalid.to_string().normal()
            }
        )?;

        if !self.errors.is_empty() {
            writeln!(w)?;
            writeln!(w, "Errors:")?;
            for e in &self.errors {
                writeln!(w, "  {}: {}", e.file.red(), e.error)?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chklog_canon::packs;

    fn builtin() -> RuleRegistry {
        let mut registry = RuleRegistry::new();
        packs::install_builtin(&mut registry).expect("builtin packs");
        registry
    }

    #[test]
    fn list_all_rules_in_registration_order() {
        let registry = builtin();
        let report = list_rules(&registry, None, None);
        assert_eq!(report.total, registry.rule_count());
        assert!(report.rules.windows(2).all(|w| w[0].seq < w[1].seq));
    }

    #[test]
    fn list_filters_by_kind() {
        let report = list_rules(&builtin(), None, Some(RuleKind::FailureHook));
        assert_eq!(report.total, 5);
        assert!(report.rules.iter().all(|r| r.section.is_some()));
    }

    #[test]
    fn list_for_other_project_shows_only_global_rules() {
        let report = list_rules(&builtin(), Some("perl"), None);
        assert!(report.total > 0);
        assert!(report.rules.iter().all(|r| r.project.is_empty()));
    }

    #[tokio::test]
    async fn validate_collects_per_file_errors() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(
            dir.path().join("a.yml"),
            "id: one\nkind: gsub\npattern: 'x'\nreplace: 'y'\n",
        )
        .expect("write");
        std::fs::write(
            dir.path().join("b.yml"),
            "id: one\nkind: sort\npattern: 'x'\n",
        )
        .expect("write");
        std::fs::write(
            dir.path().join("c.yaml"),
            "id: two\nkind: gsub_stateful\npattern: 'x'\nreplace: 'y'\n",
        )
        .expect("write");
        std::fs::write(dir.path().join("README.md"), "# rules").expect("write");

        let report = validate_dir(dir.path()).await.expect("validate");
        assert_eq!(report.total_files, 3);
        assert_eq!(report.valid, 1);
        assert_eq!(report.invalid, 2);
        assert!(report.errors[0].error.contains("duplicate rule id"));
        assert!(report.errors[1].file.ends_with("c.yaml"));
    }

    #[tokio::test]
    async fn validate_missing_dir_is_io_error() {
        let err = validate_dir(Path::new("/nonexistent/chklog-rules"))
            .await
            .err()
            .expect("missing dir");
        assert_eq!(err.exit_code(), 10);
    }

    #[test]
    fn validation_report_renders_errors() {
        let report = RuleValidationReport {
            path: "/srv/rules".to_owned(),
            total_files: 2,
            valid: 1,
            invalid: 1,
            errors: vec![RuleFileError {
                file: "bad.yml".to_owned(),
                error: "YAML parse error".to_owned(),
            }],
        };
        let mut buffer = Vec::new();
        report.render_text(&mut buffer).expect("render");
        let output = String::from_utf8(buffer).expect("valid UTF-8");
        assert!(output.contains("/srv/rules"));
        assert!(output.contains("YAML parse error"));
    }
}
