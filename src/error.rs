use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, AssistantError>;

/// Which external service produced a fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceKind {
    Transcription,
    Completion,
    Synthesis,
}

impl std::fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServiceKind::Transcription => write!(f, "transcription"),
            ServiceKind::Completion => write!(f, "completion"),
            ServiceKind::Synthesis => write!(f, "synthesis"),
        }
    }
}

/// Fault taxonomy for the conversation engine.
///
/// Capture, storage, and configuration faults are fatal to the session.
/// Service faults are retryable; exhausting the retry budget degrades the
/// turn locally (empty transcript, apology answer, text-only persistence)
/// instead of ending the session.
#[derive(Debug, Error)]
pub enum AssistantError {
    /// Device or stream read failure. Ends the session.
    #[error("audio capture fault: {0}")]
    Capture(String),

    /// Network/provider failure from an external service.
    #[error("{kind} service fault: {message}")]
    Service { kind: ServiceKind, message: String },

    /// Session directory or artifact write failure. Ends the session.
    #[error("storage fault at {path}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Corpus/provider configuration problem. Raised at startup, never
    /// mid-conversation.
    #[error("configuration fault: {0}")]
    Config(String),
}

impl AssistantError {
    pub fn service(kind: ServiceKind, message: impl Into<String>) -> Self {
        AssistantError::Service {
            kind,
            message: message.into(),
        }
    }

    pub fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        AssistantError::Storage {
            path: path.into(),
            source,
        }
    }

    /// Service faults may be retried; everything else fails fast.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AssistantError::Service { .. })
    }

    pub fn service_kind(&self) -> Option<ServiceKind> {
        match self {
            AssistantError::Service { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}
