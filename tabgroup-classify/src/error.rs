//! Error types for tabgroup-classify.

use thiserror::Error;

/// Failures while gathering resources or calling the classification service.
///
/// None of these escape [`trigger`](crate::ClassificationOrchestrator::trigger);
/// they are logged and reported through its outcome.
#[derive(Debug, Error)]
pub enum ClassifyError {
    /// The host could not list its current resources.
    #[error("resource enumeration failed: {0}")]
    Enumeration(String),

    /// The classification service rejected the call or could not be reached.
    #[error("classification service error: {0}")]
    Service(String),

    /// The service answered with a body that is not a classification result.
    #[error("malformed classification response: {0}")]
    Decode(String),
}

impl ClassifyError {
    /// Short stage name for log fields.
    pub fn stage(&self) -> &'static str {
        match self {
            ClassifyError::Enumeration(_) => "enumerate",
            ClassifyError::Service(_) | ClassifyError::Decode(_) => "classify",
        }
    }
}
