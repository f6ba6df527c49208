//! # tabgroup-classify
//!
//! Classification triggering for tabgroup.
//!
//! [`ClassificationOrchestrator::trigger`] gates on the current configuration,
//! enumerates the host's resources, makes one classification call, and hands
//! the result to a [`ResultSink`]. Collaborators are injected as trait objects;
//! [`HttpClassifier`] and [`JsonFileSource`] are the implementations the CLI uses.

pub mod error;
pub mod file_source;
pub mod http;
pub mod orchestrator;
pub mod service;

pub use error::ClassifyError;
pub use file_source::JsonFileSource;
pub use http::HttpClassifier;
pub use orchestrator::{ClassificationOrchestrator, SkipReason, TriggerOutcome, TriggerPolicy};
pub use service::{ChannelSink, Classifier, ResourceSource, ResultSink};
