//! Terminal and JSON rendering of policy errors and validation diagnostics.

use std::io::Write;

use attrguard_validate::Diagnostics;
use attrguard_validate::Severity;
use serde::Serialize;

use crate::policy::PolicyError;
use crate::policy::PolicyLoadError;

/// Output format for `check`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Format {
    #[default]
    Text,
    Json,
}

/// Diagnostics for one instance file.
#[derive(Debug, Serialize)]
pub struct InstanceReport<'a> {
    pub instance: &'a str,
    pub diagnostics: &'a Diagnostics,
}

/// Render policy errors as pretty diagnostics using ariadne.
///
/// Errors with a span get a labeled source excerpt; the rest fall back to a
/// plain header and note.
pub fn format_policy_errors(errors: &[PolicyError], source: &str, filename: &str) -> String {
    use ariadne::Color;
    use ariadne::Label;
    use ariadne::Report;
    use ariadne::ReportKind;
    use ariadne::Source;

    let mut output = Vec::new();
    for error in errors {
        match &error.span {
            Some(span) => {
                let report = Report::build(ReportKind::Error, (filename, span.clone()))
                    .with_message(format!("Invalid policy field '{}'", error.field_path))
                    .with_label(
                        Label::new((filename, span.clone()))
                            .with_message(&error.message)
                            .with_color(Color::Red),
                    )
                    .finish();

                report
                    .write((filename, Source::from(source)), &mut output)
                    .ok();
            }
            None => {
                writeln!(
                    &mut output,
                    "\x1b[31mError\x1b[0m: Invalid policy field '{}'",
                    error.field_path
                )
                .ok();
                writeln!(&mut output, "  ┌─ {}", filename).ok();
                writeln!(&mut output, "  │").ok();
                writeln!(&mut output, "  = {}", error.message).ok();
                writeln!(&mut output).ok();
            }
        }
    }
    String::from_utf8_lossy(&output).to_string()
}

/// Render a policy loading failure for the terminal.
pub fn format_load_error(error: &PolicyLoadError) -> String {
    match error {
        PolicyLoadError::Io { .. } => format!("{}\n", error),
        PolicyLoadError::Invalid {
            source_info,
            errors,
        } => format_policy_errors(
            errors,
            &source_info.content,
            &source_info.file_path.display().to_string(),
        ),
    }
}

/// Render the diagnostics of one instance as text.
pub fn format_diagnostics(diagnostics: &Diagnostics, instance: &str, color: bool) -> String {
    let mut output = Vec::new();
    for diagnostic in diagnostics {
        let (label, code) = match diagnostic.severity {
            Severity::Error => ("Error", "31"),
            Severity::Warning => ("Warning", "33"),
        };
        if color {
            write!(&mut output, "\x1b[{}m{}\x1b[0m", code, label).ok();
        } else {
            write!(&mut output, "{}", label).ok();
        }
        writeln!(&mut output, ": {}", diagnostic.summary).ok();
        if diagnostic.location.is_root() {
            writeln!(&mut output, "  ┌─ {}", instance).ok();
        } else {
            writeln!(&mut output, "  ┌─ {}: {}", instance, diagnostic.location).ok();
        }
        writeln!(&mut output, "  │").ok();
        writeln!(&mut output, "  = {}", diagnostic.detail).ok();
        writeln!(&mut output).ok();
    }
    String::from_utf8_lossy(&output).to_string()
}

/// Render the diagnostics of every instance as one JSON array.
pub fn format_json(reports: &[InstanceReport<'_>]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(reports)
}
