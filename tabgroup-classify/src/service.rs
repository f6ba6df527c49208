//! Collaborator seams: where resources come from, who classifies them, and
//! who receives the result.

use async_trait::async_trait;
use tokio::sync::mpsc;

use tabgroup_core::{ClassificationRequest, ClassificationResult, ResourceDescriptor};

use crate::error::ClassifyError;

/// Lists the host's current working set (e.g. the tabs of the focused window).
#[async_trait]
pub trait ResourceSource: Send + Sync {
    async fn list_current_resources(&self) -> Result<Vec<ResourceDescriptor>, ClassifyError>;
}

/// External classification service. Opaque: one call, success or failure.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(
        &self,
        request: &ClassificationRequest,
    ) -> Result<ClassificationResult, ClassifyError>;
}

/// Downstream consumer of successful results. Fire-and-forget: `publish`
/// must not block and has no acknowledgement.
pub trait ResultSink: Send + Sync {
    fn publish(&self, result: ClassificationResult);
}

impl<F> ResultSink for F
where
    F: Fn(ClassificationResult) + Send + Sync,
{
    fn publish(&self, result: ClassificationResult) {
        self(result)
    }
}

/// Sink that forwards results over an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<ClassificationResult>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ClassificationResult>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ResultSink for ChannelSink {
    fn publish(&self, result: ClassificationResult) {
        if self.tx.send(result).is_err() {
            tracing::warn!("result receiver dropped; classification result discarded");
        }
    }
}
