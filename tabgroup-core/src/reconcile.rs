//! One-shot startup hydration.
//!
//! Reads every physical key of every field in one batched call, resolves each
//! field newest-key-first (falling back to the built-in default), and replays
//! the result through [`ConfigStore::dispatch`]. The replay rewrites every
//! slot, so an installation that only has legacy keys gains the current keys
//! on its first run.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde_json::Value;

use crate::error::{StorageError, StoreError};
use crate::schema::{all_keys, Field, FIELDS};
use crate::storage::Storage;
use crate::store::{Action, ConfigStore, PersistTicket};
use crate::types::Configuration;

/// Which slot a resolved value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotSource {
    /// The field's current key.
    Current,
    /// An older key of the field.
    Legacy,
    /// No usable stored value; built-in default.
    Default,
}

/// What a successful hydration did.
#[derive(Debug)]
pub struct ReconcileReport {
    /// Configuration after all three replays.
    pub config: Configuration,
    pub sources: BTreeMap<Field, SlotSource>,
    /// One ticket per replayed field.
    pub tickets: Vec<PersistTicket>,
}

impl ReconcileReport {
    pub fn source(&self, field: Field) -> Option<SlotSource> {
        self.sources.get(&field).copied()
    }

    /// Wait for every rewrite issued by the replay. Returns the first failure.
    pub async fn confirm(self) -> Result<(), StoreError> {
        let mut first_err = None;
        for ticket in self.tickets {
            if let Err(err) = ticket.confirm().await {
                first_err.get_or_insert(err);
            }
        }
        match first_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// Outcome of [`StartupReconciler::run`].
#[derive(Debug)]
pub enum ReconcileOutcome {
    Hydrated(ReconcileReport),
    /// The batched read failed; the store was left untouched.
    ReadFailed(StorageError),
    /// This reconciler already ran; nothing was read or dispatched.
    AlreadyRan,
}

/// Hydrates a [`ConfigStore`] from storage exactly once.
pub struct StartupReconciler {
    store: ConfigStore,
    storage: Arc<dyn Storage>,
    ran: AtomicBool,
}

impl StartupReconciler {
    pub fn new(store: ConfigStore, storage: Arc<dyn Storage>) -> Self {
        Self {
            store,
            storage,
            ran: AtomicBool::new(false),
        }
    }

    /// Read, resolve, replay. Only the first call does any work.
    pub async fn run(&self) -> ReconcileOutcome {
        if self.ran.swap(true, Ordering::SeqCst) {
            tracing::debug!("startup reconciliation already ran; skipping");
            return ReconcileOutcome::AlreadyRan;
        }

        let keys = all_keys();
        let found = match self.storage.get_many(&keys).await {
            Ok(found) => found,
            Err(err) => {
                tracing::warn!(error = %err, "startup read failed; keeping default configuration");
                return ReconcileOutcome::ReadFailed(err);
            }
        };

        let mut sources = BTreeMap::new();
        let mut tickets = Vec::with_capacity(FIELDS.len());
        let mut config = self.store.snapshot();
        for (action, source) in resolve(&found) {
            let field = action.field();
            tracing::debug!(%field, ?source, "resolved stored setting");
            sources.insert(field, source);
            let done = self.store.dispatch(action);
            config = done.config;
            tickets.push(done.ticket);
        }

        ReconcileOutcome::Hydrated(ReconcileReport {
            config,
            sources,
            tickets,
        })
    }
}

/// Resolve one action per schema field from a batched read.
///
/// Keys are tried newest first. A missing key or JSON `null` is skipped
/// silently; a value of the wrong type is skipped with a warning.
pub fn resolve(found: &HashMap<String, Value>) -> Vec<(Action, SlotSource)> {
    FIELDS
        .iter()
        .map(|row| {
            row.keys
                .iter()
                .enumerate()
                .find_map(|(rank, key)| {
                    let value = found.get(*key)?;
                    let action = Action::decode(row.field, value);
                    if action.is_none() && !value.is_null() {
                        tracing::warn!(key, field = %row.field, "ignoring stored value with unexpected type");
                    }
                    let source = if rank == 0 {
                        SlotSource::Current
                    } else {
                        SlotSource::Legacy
                    };
                    action.map(|a| (a, source))
                })
                .unwrap_or_else(|| (Action::default_for(row.field), SlotSource::Default))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
