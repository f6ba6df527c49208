//! In-memory configuration owner with dual-slot write-through.
//!
//! [`ConfigStore::dispatch`] is the only way configuration changes. It applies
//! the pure [`reduce`] transition, publishes the new snapshot on a
//! `tokio::sync::watch` channel, and spawns one storage write per physical key
//! of the affected field (see [`crate::schema`]). The caller gets the new
//! snapshot immediately; the writes complete in the background.
//!
//! A returned [`PersistTicket`] can be dropped (fire-and-forget) or awaited
//! with [`PersistTicket::confirm`] when the caller needs to know the writes
//! landed, e.g. a CLI about to exit.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::error::{StorageError, StoreError};
use crate::schema::Field;
use crate::storage::Storage;
use crate::types::{default_group_labels, Configuration};

// ---------------------------------------------------------------------------
// 1. Actions and the transition function
// ---------------------------------------------------------------------------

/// A single configuration edit. Each variant replaces exactly one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    SetCredential(String),
    SetAutoClassify(bool),
    SetGroupLabels(Vec<String>),
}

impl Action {
    /// The field this action replaces.
    pub fn field(&self) -> Field {
        match self {
            Action::SetCredential(_) => Field::Credential,
            Action::SetAutoClassify(_) => Field::AutoClassify,
            Action::SetGroupLabels(_) => Field::GroupLabels,
        }
    }

    /// Stored representation of the payload.
    pub fn to_value(&self) -> Value {
        match self {
            Action::SetCredential(credential) => Value::String(credential.clone()),
            Action::SetAutoClassify(enabled) => Value::Bool(*enabled),
            Action::SetGroupLabels(labels) => {
                Value::Array(labels.iter().cloned().map(Value::String).collect())
            }
        }
    }

    /// Rebuild the action for `field` from a stored value.
    ///
    /// Returns `None` for `null` or a value of the wrong shape; both count as
    /// "no usable value in this slot".
    pub fn decode(field: Field, value: &Value) -> Option<Action> {
        match field {
            Field::Credential => value.as_str().map(|s| Action::SetCredential(s.to_owned())),
            Field::AutoClassify => value.as_bool().map(Action::SetAutoClassify),
            Field::GroupLabels => {
                let items = value.as_array()?;
                let labels = items
                    .iter()
                    .map(|item| item.as_str().map(str::to_owned))
                    .collect::<Option<Vec<_>>>()?;
                Some(Action::SetGroupLabels(labels))
            }
        }
    }

    /// The action that restores `field` to its built-in default.
    pub fn default_for(field: Field) -> Action {
        let defaults = Configuration::default();
        match field {
            Field::Credential => Action::SetCredential(defaults.credential),
            Field::AutoClassify => Action::SetAutoClassify(defaults.auto_classify),
            Field::GroupLabels => Action::SetGroupLabels(default_group_labels()),
        }
    }
}

/// Pure transition: `state` with the action's field replaced. No validation.
pub fn reduce(state: &Configuration, action: &Action) -> Configuration {
    let mut next = state.clone();
    match action {
        Action::SetCredential(credential) => next.credential = credential.clone(),
        Action::SetAutoClassify(enabled) => next.auto_classify = *enabled,
        Action::SetGroupLabels(labels) => next.group_labels = labels.clone(),
    }
    next
}

// ---------------------------------------------------------------------------
// 2. Dispatch outcome
// ---------------------------------------------------------------------------

/// Result of one [`ConfigStore::dispatch`].
#[derive(Debug)]
pub struct Dispatched {
    /// Configuration after the action, already published to subscribers.
    pub config: Configuration,
    /// Outstanding slot writes for the action.
    pub ticket: PersistTicket,
}

/// Handle to the background writes issued by one dispatch.
///
/// Dropping the ticket detaches the writes; they still run to completion and
/// log their own failures.
#[derive(Debug)]
pub struct PersistTicket {
    field: Field,
    writes: Vec<(&'static str, JoinHandle<Result<(), StorageError>>)>,
}

impl PersistTicket {
    pub fn field(&self) -> Field {
        self.field
    }

    /// Physical keys being written, newest first.
    pub fn keys(&self) -> Vec<&'static str> {
        self.writes.iter().map(|(key, _)| *key).collect()
    }

    /// Wait for every slot write. All writes are awaited even after a failure;
    /// the first failure is returned.
    pub async fn confirm(self) -> Result<(), StoreError> {
        let mut first_err = None;
        for (key, handle) in self.writes {
            let outcome = match handle.await {
                Ok(Ok(())) => continue,
                Ok(Err(source)) => StoreError::Persist { key, source },
                Err(join_err) => StoreError::WriteTask {
                    key,
                    reason: join_err.to_string(),
                },
            };
            first_err.get_or_insert(outcome);
        }
        match first_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// 3. Store handle
// ---------------------------------------------------------------------------

/// Cloneable handle to the single in-memory [`Configuration`].
///
/// Clones share state; pass a clone to every component that reads or edits
/// configuration.
#[derive(Clone)]
pub struct ConfigStore {
    state: Arc<watch::Sender<Configuration>>,
    storage: Arc<dyn Storage>,
}

impl fmt::Debug for ConfigStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigStore")
            .field("state", &*self.state.borrow())
            .finish_non_exhaustive()
    }
}

impl ConfigStore {
    /// Store holding built-in defaults, writing through to `storage`.
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self::with_initial(storage, Configuration::default())
    }

    pub fn with_initial(storage: Arc<dyn Storage>, initial: Configuration) -> Self {
        let (state, _) = watch::channel(initial);
        Self {
            state: Arc::new(state),
            storage,
        }
    }

    /// Current configuration.
    pub fn snapshot(&self) -> Configuration {
        self.state.borrow().clone()
    }

    /// Receiver that observes every published configuration.
    pub fn subscribe(&self) -> watch::Receiver<Configuration> {
        self.state.subscribe()
    }

    /// Apply `action`, publish the result, and start persisting it to every
    /// key of the affected field.
    ///
    /// # Panics
    ///
    /// Must be called from within a Tokio runtime; slot writes are spawned
    /// onto it.
    pub fn dispatch(&self, action: Action) -> Dispatched {
        let mut next = None;
        self.state.send_modify(|current| {
            *current = reduce(current, &action);
            next = Some(current.clone());
        });
        let config = next.unwrap_or_else(|| self.snapshot());

        let field = action.field();
        tracing::debug!(%field, "configuration updated");
        let ticket = self.persist(field, action.to_value());
        Dispatched { config, ticket }
    }

    /// Append `label`. An empty label is ignored and nothing is dispatched.
    pub fn add_label(&self, label: impl Into<String>) -> Option<Dispatched> {
        let label = label.into();
        if label.is_empty() {
            return None;
        }
        let mut labels = self.snapshot().group_labels;
        labels.push(label);
        Some(self.dispatch(Action::SetGroupLabels(labels)))
    }

    /// Replace the label at `index`.
    pub fn rename_label(
        &self,
        index: usize,
        label: impl Into<String>,
    ) -> Result<Dispatched, StoreError> {
        let mut labels = self.snapshot().group_labels;
        let len = labels.len();
        let slot = labels
            .get_mut(index)
            .ok_or(StoreError::LabelIndex { index, len })?;
        *slot = label.into();
        Ok(self.dispatch(Action::SetGroupLabels(labels)))
    }

    /// Remove the label at `index`, keeping the order of the rest.
    pub fn remove_label(&self, index: usize) -> Result<Dispatched, StoreError> {
        let mut labels = self.snapshot().group_labels;
        if index >= labels.len() {
            return Err(StoreError::LabelIndex {
                index,
                len: labels.len(),
            });
        }
        labels.remove(index);
        Ok(self.dispatch(Action::SetGroupLabels(labels)))
    }

    /// Flip the auto-classify flag.
    pub fn toggle_auto_classify(&self) -> Dispatched {
        let enabled = self.snapshot().auto_classify;
        self.dispatch(Action::SetAutoClassify(!enabled))
    }

    fn persist(&self, field: Field, value: Value) -> PersistTicket {
        let writes = field
            .keys()
            .iter()
            .map(|&key| {
                let storage = Arc::clone(&self.storage);
                let value = value.clone();
                let handle = tokio::spawn(async move {
                    let result = storage.set(key, value).await;
                    if let Err(err) = &result {
                        tracing::warn!(key, error = %err, "failed to persist setting");
                    }
                    result
                });
                (key, handle)
            })
            .collect();
        PersistTicket { field, writes }
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
