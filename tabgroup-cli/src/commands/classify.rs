//! `tabgroup classify --tabs <FILE> --endpoint <URL>`

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::Args;

use tabgroup_classify::{
    ChannelSink, ClassificationOrchestrator, HttpClassifier, JsonFileSource, SkipReason,
    TriggerOutcome, TriggerPolicy,
};

use crate::session::Session;

/// Classify the tabs in a snapshot file.
#[derive(Args, Debug)]
pub struct ClassifyArgs {
    /// JSON file listing the open tabs: `[{"id", "title", "url"}, ...]`.
    #[arg(long, value_name = "FILE")]
    pub tabs: PathBuf,

    /// Classification service URL.
    #[arg(long, env = "TABGROUP_ENDPOINT", value_name = "URL")]
    pub endpoint: String,

    /// Refuse to start while another classification is in flight.
    #[arg(long)]
    pub strict: bool,
}

impl ClassifyArgs {
    pub async fn run(self, session: &Session) -> Result<()> {
        let policy = if self.strict {
            TriggerPolicy::RejectWhileLoading
        } else {
            TriggerPolicy::Permissive
        };
        let (sink, mut results) = ChannelSink::new();
        let orchestrator = ClassificationOrchestrator::new(
            session.store().clone(),
            Arc::new(JsonFileSource::new(self.tabs)),
            Arc::new(HttpClassifier::new(self.endpoint)),
            Arc::new(sink),
        )
        .with_policy(policy);

        match orchestrator.trigger().await {
            TriggerOutcome::Published { .. } => {
                let result = results
                    .try_recv()
                    .context("classification result was not delivered")?;
                println!(
                    "{}",
                    serde_json::to_string_pretty(&result.assignments)
                        .context("failed to serialize classification result")?
                );
                Ok(())
            }
            TriggerOutcome::Skipped(SkipReason::MissingCredential) => {
                println!("No key set. Run `tabgroup config set-key <KEY>` first.");
                Ok(())
            }
            TriggerOutcome::Skipped(SkipReason::NoGroupLabels) => {
                println!("No labels. Run `tabgroup labels add <LABEL>` first.");
                Ok(())
            }
            TriggerOutcome::Busy => {
                println!("A classification is already running.");
                Ok(())
            }
            TriggerOutcome::Failed(err) => Err(anyhow!(err).context("classification failed")),
        }
    }
}
