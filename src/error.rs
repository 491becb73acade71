use thiserror::Error;

/// Failure kinds of a classification request. Retrying is always the caller's call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassifyError {
    /// The engine could not load the model; the classifier is unusable
    #[error("classifier initialization failed: {0}")]
    Initialization(String),

    #[error("invalid pixel buffer: expected {expected} values, got {actual}")]
    InvalidInput { expected: usize, actual: usize },

    /// The engine failed during one call; the same buffer may be retried
    #[error("inference failed: {0}")]
    Inference(String),

    #[error("classifier is not ready yet")]
    NotReady,

    #[error("classifier is closed")]
    Closed,
}

impl ClassifyError {
    pub(crate) fn initialization(err: anyhow::Error) -> Self {
        ClassifyError::Initialization(format!("{err:#}"))
    }

    pub(crate) fn inference(err: anyhow::Error) -> Self {
        ClassifyError::Inference(format!("{err:#}"))
    }
}
