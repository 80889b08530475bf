use thiserror::Error;

use crate::diagnostics::DiagnosticKind;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
    #[error("malformed content {data_id}: {reason}")]
    MalformedContent { data_id: String, reason: String },
    #[error("store error: {0}")]
    Store(String),
    #[error("transmission failed: {0}")]
    Transmission(String),
}

impl EngineError {
    pub fn malformed_content(data_id: impl Into<String>, reason: impl Into<String>) -> Self {
        EngineError::MalformedContent {
            data_id: data_id.into(),
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> DiagnosticKind {
        match self {
            EngineError::NotFound(_) => DiagnosticKind::NotFound,
            EngineError::Configuration(_) => DiagnosticKind::Configuration,
            EngineError::MalformedPayload(_) => DiagnosticKind::MalformedPayload,
            EngineError::MalformedContent { .. } => DiagnosticKind::MalformedContent,
            EngineError::Store(_) => DiagnosticKind::Store,
            EngineError::Transmission(_) => DiagnosticKind::Transmission,
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
