//! Render documents and diagnostics as JSON or human-readable text.

use crate::annotation::ApiDocument;
use crate::error::{Diagnostic, Severity};
use crate::extractor::FileExtraction;
use colored::Colorize;
use serde::Serialize;

/// Output format options.
#[derive(Debug, Clone, Copy, Default)]
pub enum OutputFormat {
    Text,
    #[default]
    Json,
    JsonPretty,
}

/// Format an assembled document.
pub fn format_document(document: &ApiDocument, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => serde_json::to_string(document).unwrap_or_default(),
        OutputFormat::JsonPretty => serde_json::to_string_pretty(document).unwrap_or_default(),
        OutputFormat::Text => format_document_text(document),
    }
}

fn format_document_text(document: &ApiDocument) -> String {
    let mut output = String::new();

    if let Some(title) = &document.meta.title {
        let version = document
            .meta
            .version
            .as_deref()
            .map(|v| format!(" v{}", v))
            .unwrap_or_default();
        output.push_str(&format!("{}{}\n", title.bold(), version.dimmed()));
    }
    if let Some(base_url) = &document.meta.base_url {
        output.push_str(&format!("{}\n", base_url.dimmed()));
    }
    output.push('\n');

    for api in &document.apis {
        output.push_str(&format!(
            "{} {} - {}\n",
            api.method.to_uppercase().cyan().bold(),
            api.path,
            api.summary
        ));
        if let Some(group) = &api.group {
            output.push_str(&format!("    group: {}\n", group));
        }
        if !api.tags.is_empty() {
            output.push_str(&format!("    tags: {}\n", api.tags.join(", ")));
        }
        if let Some(deprecated) = &api.deprecated {
            output.push_str(&format!("    {} {}\n", "deprecated:".yellow(), deprecated));
        }
        output.push_str(&format!("    {}\n", api.location.to_string().dimmed()));
    }

    output.push_str(&format!("{} operations\n", document.apis.len()));
    output
}

/// Format the diagnostics of an extraction run.
pub fn format_diagnostics(files: &[FileExtraction], format: OutputFormat) -> String {
    let diagnostics: Vec<&Diagnostic> =
        files.iter().flat_map(|f| f.diagnostics.iter()).collect();

    match format {
        OutputFormat::Json => serde_json::to_string(&diagnostics).unwrap_or_default(),
        OutputFormat::JsonPretty => serde_json::to_string_pretty(&diagnostics).unwrap_or_default(),
        OutputFormat::Text => format_diagnostics_text(files, &diagnostics),
    }
}

fn format_diagnostics_text(files: &[FileExtraction], diagnostics: &[&Diagnostic]) -> String {
    let mut output = String::new();

    for diagnostic in diagnostics {
        let severity = match diagnostic.severity {
            Severity::Error => "ERROR".red().bold(),
            Severity::Warning => "WARN".yellow().bold(),
        };
        output.push_str(&format!(
            "{} {} - {}\n",
            severity,
            diagnostic.location.to_string().dimmed(),
            diagnostic.message
        ));
    }

    let annotations: usize = files.iter().map(|f| f.fragments.len()).sum();
    let errors = diagnostics
        .iter()
        .filter(|d| d.severity == Severity::Error)
        .count();
    let warnings = diagnostics.len() - errors;

    output.push('\n');
    output.push_str(&format!(
        "Checked {} files, {} annotations\n",
        files.len(),
        annotations
    ));
    if errors > 0 {
        output.push_str(&format!(
            "{} errors, {} warnings\n",
            errors.to_string().red().bold(),
            warnings
        ));
    } else if warnings > 0 {
        output.push_str(&format!(
            "{} {} warnings\n",
            "OK".green().bold(),
            warnings.to_string().yellow()
        ));
    } else {
        output.push_str(&format!("{} No issues found\n", "OK".green().bold()));
    }

    output
}

/// Format any serializable value as JSON.
pub fn to_json<T: Serialize>(value: &T, pretty: bool) -> String {
    if pretty {
        serde_json::to_string_pretty(value).unwrap_or_default()
    } else {
        serde_json::to_string(value).unwrap_or_default()
    }
}
