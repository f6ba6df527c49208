//! tabgroup core library: configuration state and its persistence.
//!
//! Public API surface:
//! - [`types`]: configuration and resource types
//! - [`error`]: [`StorageError`], [`StoreError`]
//! - [`schema`]: logical field → physical storage keys
//! - [`storage`]: the [`Storage`] adapter trait and its backends
//! - [`store`]: [`ConfigStore`], the single owner of in-memory configuration
//! - [`reconcile`]: one-shot startup hydration from storage

pub mod error;
pub mod reconcile;
pub mod schema;
pub mod storage;
pub mod store;
pub mod types;

pub use error::{StorageError, StoreError};
pub use reconcile::{ReconcileOutcome, ReconcileReport, SlotSource, StartupReconciler};
pub use schema::Field;
pub use storage::{JsonFileStorage, MemoryStorage, Storage};
pub use store::{Action, ConfigStore, Dispatched, PersistTicket};
pub use types::{
    default_group_labels, ClassificationRequest, ClassificationResult, Configuration,
    ResourceDescriptor, ResourceId,
};
