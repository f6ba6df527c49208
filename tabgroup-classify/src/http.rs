//! JSON-over-HTTP classification client.
//!
//! Request: `POST <endpoint>` with `Authorization: Bearer <credential>` and
//! body `{"resources": [...], "labels": [...]}`.
//! Response: `{"assignments": {"<resource id>": "<label>"}}`.
//!
//! `ureq` is blocking, so each call runs on the blocking pool.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use tabgroup_core::{ClassificationRequest, ClassificationResult, ResourceDescriptor};

use crate::error::ClassifyError;
use crate::service::Classifier;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Serialize)]
struct WireRequest<'a> {
    resources: &'a [ResourceDescriptor],
    labels: &'a [String],
}

/// [`Classifier`] backed by a remote HTTP endpoint.
#[derive(Debug, Clone)]
pub struct HttpClassifier {
    endpoint: String,
    agent: ureq::Agent,
}

impl HttpClassifier {
    pub fn new(endpoint: impl Into<String>) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(CONNECT_TIMEOUT)
            .build();
        Self {
            endpoint: endpoint.into(),
            agent,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Classifier for HttpClassifier {
    async fn classify(
        &self,
        request: &ClassificationRequest,
    ) -> Result<ClassificationResult, ClassifyError> {
        let body = serde_json::to_value(WireRequest {
            resources: &request.resources,
            labels: &request.labels,
        })
        .map_err(|e| ClassifyError::Service(format!("cannot encode request: {e}")))?;
        let authorization = format!("Bearer {}", request.credential);
        let agent = self.agent.clone();
        let endpoint = self.endpoint.clone();

        tokio::task::spawn_blocking(move || post_json(&agent, &endpoint, &authorization, body))
            .await
            .map_err(|e| ClassifyError::Service(format!("request task failed: {e}")))?
    }
}

fn post_json(
    agent: &ureq::Agent,
    endpoint: &str,
    authorization: &str,
    body: serde_json::Value,
) -> Result<ClassificationResult, ClassifyError> {
    let response = agent
        .post(endpoint)
        .set("Authorization", authorization)
        .send_json(body)
        .map_err(|err| match err {
            ureq::Error::Status(code, response) => {
                let detail = response.into_string().unwrap_or_default();
                ClassifyError::Service(format!("HTTP {code}: {}", detail.trim()))
            }
            ureq::Error::Transport(transport) => ClassifyError::Service(transport.to_string()),
        })?;

    response
        .into_json::<ClassificationResult>()
        .map_err(|e| ClassifyError::Decode(e.to_string()))
}
