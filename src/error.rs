use thiserror::Error;

#[derive(Debug, Error)]
pub enum QaError {
    #[error("empty signal: {context}")]
    EmptySignal { context: &'static str },
    #[error(
        "captured signal ({captured} samples) is shorter than the reference \
         ({reference} samples) and zero-padding is disabled"
    )]
    LengthMismatch { reference: usize, captured: usize },
    #[error("feature dimension mismatch: expected {expected}, got {actual}")]
    FeatureDimMismatch { expected: usize, actual: usize },
    #[error("invalid configuration: {message}")]
    InvalidConfig { message: String },
    #[error("{context}: {message}")]
    Runtime {
        context: &'static str,
        message: String,
    },
}

impl QaError {
    pub(crate) fn empty_signal(context: &'static str) -> Self {
        Self::EmptySignal { context }
    }

    pub(crate) fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    pub(crate) fn runtime(context: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Runtime {
            context,
            message: err.to_string(),
        }
    }
}
