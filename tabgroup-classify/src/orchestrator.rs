//! Classification trigger with precondition gating and a loading flag.
//!
//! # Loading states
//!
//! ```text
//! Idle ──trigger (preconditions ok)──▶ InFlight ──request settles──▶ Idle
//! ```
//!
//! There is no cancelled state: once started, a request runs until the
//! source and classifier return. The flag is reset by a drop guard, so every
//! exit path (success, failure, or the trigger future being dropped) lands
//! back in `Idle`.
//!
//! Under [`TriggerPolicy::Permissive`] overlapping triggers are not prevented;
//! the host is expected to disable its trigger while [`is_loading`] is true.
//! [`TriggerPolicy::RejectWhileLoading`] enforces single-flight instead.
//!
//! [`is_loading`]: ClassificationOrchestrator::is_loading

use std::sync::Arc;

use tokio::sync::watch;

use tabgroup_core::{ClassificationRequest, ClassificationResult, ConfigStore, Configuration};

use crate::error::ClassifyError;
use crate::service::{Classifier, ResourceSource, ResultSink};

/// Why a trigger did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    MissingCredential,
    NoGroupLabels,
}

/// Re-entrancy handling for [`ClassificationOrchestrator::trigger`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TriggerPolicy {
    /// Every trigger with valid preconditions runs, even while another is in
    /// flight.
    #[default]
    Permissive,
    /// A trigger while a request is in flight returns [`TriggerOutcome::Busy`].
    RejectWhileLoading,
}

/// What a trigger did. Never an error: failures are logged and reported here.
#[derive(Debug)]
pub enum TriggerOutcome {
    /// Preconditions unmet; nothing happened.
    Skipped(SkipReason),
    /// Rejected by [`TriggerPolicy::RejectWhileLoading`]; nothing happened.
    Busy,
    /// The result was handed to the sink.
    Published { assignments: usize },
    /// Enumeration or classification failed; nothing was published.
    Failed(ClassifyError),
}

impl TriggerOutcome {
    pub fn is_published(&self) -> bool {
        matches!(self, TriggerOutcome::Published { .. })
    }
}

/// Drives one classification per trigger. Holds a [`ConfigStore`] handle and
/// reads its snapshot at trigger time.
pub struct ClassificationOrchestrator {
    store: ConfigStore,
    source: Arc<dyn ResourceSource>,
    classifier: Arc<dyn Classifier>,
    sink: Arc<dyn ResultSink>,
    loading: watch::Sender<bool>,
    policy: TriggerPolicy,
}

impl ClassificationOrchestrator {
    pub fn new(
        store: ConfigStore,
        source: Arc<dyn ResourceSource>,
        classifier: Arc<dyn Classifier>,
        sink: Arc<dyn ResultSink>,
    ) -> Self {
        let (loading, _) = watch::channel(false);
        Self {
            store,
            source,
            classifier,
            sink,
            loading,
            policy: TriggerPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: TriggerPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> TriggerPolicy {
        self.policy
    }

    pub fn is_loading(&self) -> bool {
        *self.loading.borrow()
    }

    /// Receiver that observes every loading transition.
    pub fn subscribe_loading(&self) -> watch::Receiver<bool> {
        self.loading.subscribe()
    }

    /// Run one classification if the current configuration allows it.
    pub async fn trigger(&self) -> TriggerOutcome {
        let config = self.store.snapshot();
        if let Some(reason) = unmet_precondition(&config) {
            tracing::debug!(?reason, "classification trigger skipped");
            return TriggerOutcome::Skipped(reason);
        }

        let _loading = match self.policy {
            TriggerPolicy::Permissive => LoadingGuard::enter(&self.loading),
            TriggerPolicy::RejectWhileLoading => match LoadingGuard::try_enter(&self.loading) {
                Some(guard) => guard,
                None => {
                    tracing::debug!("classification already in flight; trigger rejected");
                    return TriggerOutcome::Busy;
                }
            },
        };

        match self.classify_current(config).await {
            Ok(result) => {
                let assignments = result.len();
                self.sink.publish(result);
                tracing::info!(assignments, "classification result published");
                TriggerOutcome::Published { assignments }
            }
            Err(err) => {
                tracing::error!(stage = err.stage(), error = %err, "classification failed");
                TriggerOutcome::Failed(err)
            }
        }
    }

    async fn classify_current(
        &self,
        config: Configuration,
    ) -> Result<ClassificationResult, ClassifyError> {
        let resources = self.source.list_current_resources().await?;
        tracing::debug!(
            resources = resources.len(),
            labels = config.group_labels.len(),
            "requesting classification"
        );
        let request = ClassificationRequest {
            resources,
            labels: config.group_labels,
            credential: config.credential,
        };
        self.classifier.classify(&request).await
    }
}

fn unmet_precondition(config: &Configuration) -> Option<SkipReason> {
    if config.credential.is_empty() {
        Some(SkipReason::MissingCredential)
    } else if config.group_labels.is_empty() {
        Some(SkipReason::NoGroupLabels)
    } else {
        None
    }
}

/// Holds `loading = true` for its lifetime.
struct LoadingGuard<'a> {
    flag: &'a watch::Sender<bool>,
}

impl<'a> LoadingGuard<'a> {
    fn enter(flag: &'a watch::Sender<bool>) -> Self {
        flag.send_replace(true);
        Self { flag }
    }

    /// Set the flag only if it is currently clear.
    fn try_enter(flag: &'a watch::Sender<bool>) -> Option<Self> {
        let entered = flag.send_if_modified(|loading| {
            if *loading {
                false
            } else {
                *loading = true;
                true
            }
        });
        entered.then(|| Self { flag })
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.flag.send_replace(false);
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use tokio::sync::{mpsc, Semaphore};

    use tabgroup_core::{Action, MemoryStorage, ResourceDescriptor};

    use super::*;
    use crate::service::ChannelSink;

    #[derive(Default)]
    struct StubSource {
        resources: Vec<ResourceDescriptor>,
        offline: bool,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ResourceSource for StubSource {
        async fn list_current_resources(&self) -> Result<Vec<ResourceDescriptor>, ClassifyError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.offline {
                return Err(ClassifyError::Enumeration("no browser window".into()));
            }
            Ok(self.resources.clone())
        }
    }

    /// Answers with `reply`, optionally waiting for a permit first.
    struct StubClassifier {
        reply: Result<ClassificationResult, String>,
        gate: Option<Arc<Semaphore>>,
        requests: Mutex<Vec<ClassificationRequest>>,
    }

    impl StubClassifier {
        fn answering(result: ClassificationResult) -> Self {
            Self {
                reply: Ok(result),
                gate: None,
                requests: Mutex::new(Vec::new()),
            }
        }

        fn failing(message: &str) -> Self {
            Self {
                reply: Err(message.to_owned()),
                gate: None,
                requests: Mutex::new(Vec::new()),
            }
        }

        fn gated(mut self, gate: Arc<Semaphore>) -> Self {
            self.gate = Some(gate);
            self
        }
    }

    #[async_trait]
    impl Classifier for StubClassifier {
        async fn classify(
            &self,
            request: &ClassificationRequest,
        ) -> Result<ClassificationResult, ClassifyError> {
            self.requests.lock().unwrap().push(request.clone());
            if let Some(gate) = &self.gate {
                let _permit = gate
                    .acquire()
                    .await
                    .map_err(|_| ClassifyError::Service("gate closed".into()))?;
            }
            self.reply.clone().map_err(ClassifyError::Service)
        }
    }

    struct Harness {
        store: ConfigStore,
        source: Arc<StubSource>,
        classifier: Arc<StubClassifier>,
        results: mpsc::UnboundedReceiver<ClassificationResult>,
        orchestrator: Arc<ClassificationOrchestrator>,
    }

    fn two_tabs() -> Vec<ResourceDescriptor> {
        vec![
            ResourceDescriptor::new("resource1", "Quarterly plan", "https://docs.example/plan"),
            ResourceDescriptor::new("resource2", "Holiday photos", "https://photos.example/"),
        ]
    }

    fn work_personal() -> ClassificationResult {
        [("resource1", "Work"), ("resource2", "Personal")]
            .into_iter()
            .collect()
    }

    fn harness(source: StubSource, classifier: StubClassifier, policy: TriggerPolicy) -> Harness {
        let store = ConfigStore::new(Arc::new(MemoryStorage::new()));
        let source = Arc::new(source);
        let classifier = Arc::new(classifier);
        let (sink, results) = ChannelSink::new();
        let orchestrator = ClassificationOrchestrator::new(
            store.clone(),
            source.clone(),
            classifier.clone(),
            Arc::new(sink),
        )
        .with_policy(policy);
        Harness {
            store,
            source,
            classifier,
            results,
            orchestrator: Arc::new(orchestrator),
        }
    }

    fn ready(h: &Harness) {
        h.store.dispatch(Action::SetCredential("sk-abc".into()));
        h.store
            .dispatch(Action::SetGroupLabels(vec!["Work".into(), "Personal".into()]));
    }

    #[tokio::test]
    async fn missing_credential_skips_without_loading_or_enumeration() {
        let h = harness(
            StubSource::default(),
            StubClassifier::answering(work_personal()),
            TriggerPolicy::Permissive,
        );
        let mut loading = h.orchestrator.subscribe_loading();

        let outcome = h.orchestrator.trigger().await;
        assert!(matches!(outcome, TriggerOutcome::Skipped(SkipReason::MissingCredential)));
        assert!(!loading.has_changed().expect("sender alive"), "loading never set");
        assert_eq!(h.source.calls.load(Ordering::SeqCst), 0);
        assert!(h.classifier.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_labels_skip() {
        let h = harness(
            StubSource::default(),
            StubClassifier::answering(work_personal()),
            TriggerPolicy::Permissive,
        );
        h.store.dispatch(Action::SetCredential("sk-abc".into()));
        h.store.dispatch(Action::SetGroupLabels(vec![]));

        let outcome = h.orchestrator.trigger().await;
        assert!(matches!(outcome, TriggerOutcome::Skipped(SkipReason::NoGroupLabels)));
        assert_eq!(h.source.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn success_publishes_exact_mapping_and_resets_loading() {
        let mut h = harness(
            StubSource {
                resources: two_tabs(),
                ..StubSource::default()
            },
            StubClassifier::answering(work_personal()),
            TriggerPolicy::Permissive,
        );
        ready(&h);

        let outcome = h.orchestrator.trigger().await;
        assert!(matches!(outcome, TriggerOutcome::Published { assignments: 2 }));
        assert_eq!(h.results.recv().await, Some(work_personal()));
        assert!(!h.orchestrator.is_loading());

        let requests = h.classifier.requests.lock().unwrap();
        assert_eq!(requests.len(), 1, "exactly one request");
        assert_eq!(requests[0].resources, two_tabs());
        assert_eq!(requests[0].labels, vec!["Work", "Personal"]);
        assert_eq!(requests[0].credential, "sk-abc");
    }

    #[tokio::test]
    async fn enumeration_failure_is_swallowed() {
        let mut h = harness(
            StubSource {
                offline: true,
                ..StubSource::default()
            },
            StubClassifier::answering(work_personal()),
            TriggerPolicy::Permissive,
        );
        ready(&h);

        let outcome = h.orchestrator.trigger().await;
        assert!(matches!(outcome, TriggerOutcome::Failed(ClassifyError::Enumeration(_))));
        assert!(!h.orchestrator.is_loading());
        assert!(h.classifier.requests.lock().unwrap().is_empty());
        assert!(h.results.try_recv().is_err(), "nothing published");
    }

    #[tokio::test]
    async fn service_failure_is_swallowed() {
        let mut h = harness(
            StubSource {
                resources: two_tabs(),
                ..StubSource::default()
            },
            StubClassifier::failing("HTTP 401"),
            TriggerPolicy::Permissive,
        );
        ready(&h);

        let outcome = h.orchestrator.trigger().await;
        assert!(matches!(outcome, TriggerOutcome::Failed(ClassifyError::Service(_))));
        assert!(!h.orchestrator.is_loading());
        assert!(h.results.try_recv().is_err(), "nothing published");
    }

    #[tokio::test]
    async fn loading_is_true_while_in_flight() {
        let gate = Arc::new(Semaphore::new(0));
        let h = harness(
            StubSource {
                resources: two_tabs(),
                ..StubSource::default()
            },
            StubClassifier::answering(work_personal()).gated(Arc::clone(&gate)),
            TriggerPolicy::Permissive,
        );
        ready(&h);
        let mut loading = h.orchestrator.subscribe_loading();

        let orchestrator = Arc::clone(&h.orchestrator);
        let task = tokio::spawn(async move { orchestrator.trigger().await });

        loading.wait_for(|l| *l).await.expect("enters InFlight");
        assert!(h.orchestrator.is_loading());

        gate.add_permits(1);
        assert!(task.await.expect("join").is_published());
        assert!(!h.orchestrator.is_loading());
    }

    #[tokio::test]
    async fn strict_policy_rejects_while_loading() {
        let gate = Arc::new(Semaphore::new(0));
        let h = harness(
            StubSource {
                resources: two_tabs(),
                ..StubSource::default()
            },
            StubClassifier::answering(work_personal()).gated(Arc::clone(&gate)),
            TriggerPolicy::RejectWhileLoading,
        );
        ready(&h);
        let mut loading = h.orchestrator.subscribe_loading();

        let orchestrator = Arc::clone(&h.orchestrator);
        let first = tokio::spawn(async move { orchestrator.trigger().await });
        loading.wait_for(|l| *l).await.expect("enters InFlight");

        assert!(matches!(h.orchestrator.trigger().await, TriggerOutcome::Busy));
        assert_eq!(h.source.calls.load(Ordering::SeqCst), 1);

        gate.add_permits(1);
        assert!(first.await.expect("join").is_published());
        assert!(!h.orchestrator.is_loading());
    }

    #[tokio::test]
    async fn permissive_policy_lets_overlapping_triggers_run() {
        let gate = Arc::new(Semaphore::new(0));
        let h = harness(
            StubSource {
                resources: two_tabs(),
                ..StubSource::default()
            },
            StubClassifier::answering(work_personal()).gated(Arc::clone(&gate)),
            TriggerPolicy::Permissive,
        );
        ready(&h);
        let mut loading = h.orchestrator.subscribe_loading();

        let orchestrator = Arc::clone(&h.orchestrator);
        let first = tokio::spawn(async move { orchestrator.trigger().await });
        loading.wait_for(|l| *l).await.expect("enters InFlight");

        let orchestrator = Arc::clone(&h.orchestrator);
        let second = tokio::spawn(async move { orchestrator.trigger().await });

        gate.add_permits(2);
        assert!(first.await.expect("join").is_published());
        assert!(second.await.expect("join").is_published());
        assert_eq!(h.source.calls.load(Ordering::SeqCst), 2);
        assert!(!h.orchestrator.is_loading());
    }

    #[tokio::test]
    async fn trigger_uses_configuration_at_trigger_time() {
        let h = harness(
            StubSource {
                resources: two_tabs(),
                ..StubSource::default()
            },
            StubClassifier::answering(work_personal()),
            TriggerPolicy::Permissive,
        );
        ready(&h);
        h.store.add_label("Errands");

        h.orchestrator.trigger().await;
        let requests = h.classifier.requests.lock().unwrap();
        assert_eq!(requests[0].labels, vec!["Work", "Personal", "Errands"]);
    }
}
