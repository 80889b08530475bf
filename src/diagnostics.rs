use serde::Serialize;

use crate::error::EngineError;

/// A failure the resolution path swallowed. Replies never change because of
/// these; they exist so callers can log or inspect what was degraded.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub stage: &'static str,
    pub message: String,
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    NotFound,
    Configuration,
    MalformedPayload,
    MalformedContent,
    Store,
    Transmission,
    IgnoredFile,
}

pub type Diagnostics = Vec<Diagnostic>;

pub fn diagnostic(kind: DiagnosticKind, stage: &'static str, message: impl Into<String>) -> Diagnostic {
    Diagnostic {
        kind,
        stage,
        message: message.into(),
    }
}

/// Records `err` and logs it; lookup misses are expected and only logged at
/// debug level.
pub fn record(diagnostics: &mut Diagnostics, stage: &'static str, err: &EngineError) {
    let kind = err.kind();
    if kind == DiagnosticKind::NotFound {
        tracing::debug!(stage, error = %err, "lookup missed");
    } else {
        tracing::warn!(stage, error = %err, "degraded to no content");
    }
    diagnostics.push(diagnostic(kind, stage, err.to_string()));
}

pub fn summarize(partition: &str, handled_by: Option<&str>, diagnostics: &[Diagnostic]) -> String {
    let mut output = String::new();
    output.push_str(&format!("Partition: {partition}\n"));
    output.push_str(&format!(
        "Handled by: {}\n",
        handled_by.unwrap_or("(no reply)")
    ));
    output.push_str(&format!("Diagnostics: {}\n", diagnostics.len()));

    for diagnostic in diagnostics.iter().take(5) {
        output.push_str(&format!(
            "  - [{}/{}] {}\n",
            diagnostic.stage,
            format_kind(diagnostic.kind),
            diagnostic.message
        ));
    }

    output.trim_end().to_string()
}

fn format_kind(kind: DiagnosticKind) -> &'static str {
    match kind {
        DiagnosticKind::NotFound => "not_found",
        DiagnosticKind::Configuration => "configuration",
        DiagnosticKind::MalformedPayload => "malformed_payload",
        DiagnosticKind::MalformedContent => "malformed_content",
        DiagnosticKind::Store => "store",
        DiagnosticKind::Transmission => "transmission",
        DiagnosticKind::IgnoredFile => "ignored_file",
    }
}
