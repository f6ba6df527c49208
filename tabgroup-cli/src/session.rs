//! Per-invocation wiring: storage, store, and startup hydration.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};

use tabgroup_core::{
    ConfigStore, Dispatched, JsonFileStorage, ReconcileOutcome, StartupReconciler, Storage,
};

/// Hydrated configuration for one CLI run.
pub struct Session {
    home: PathBuf,
    store: ConfigStore,
}

impl Session {
    /// Open storage under `home` (or the user's home directory) and hydrate.
    ///
    /// A failed startup read is not fatal: the session continues on defaults,
    /// matching how the library degrades.
    pub async fn open(home: Option<PathBuf>) -> Result<Self> {
        let home = match home {
            Some(home) => home,
            None => dirs::home_dir().context("could not determine home directory")?,
        };
        let storage: Arc<dyn Storage> = Arc::new(JsonFileStorage::at(&home));
        let store = ConfigStore::new(Arc::clone(&storage));

        match StartupReconciler::new(store.clone(), storage).run().await {
            ReconcileOutcome::Hydrated(report) => {
                if let Err(err) = report.confirm().await {
                    tracing::warn!(error = %err, "could not rewrite settings during startup");
                }
            }
            ReconcileOutcome::ReadFailed(err) => {
                eprintln!("warning: could not read saved settings ({err}); using defaults");
            }
            ReconcileOutcome::AlreadyRan => {}
        }

        Ok(Self { home, store })
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    /// Wait for an edit to reach disk before the process exits.
    pub async fn settle(&self, dispatched: Dispatched) -> Result<()> {
        let field = dispatched.ticket.field();
        dispatched
            .ticket
            .confirm()
            .await
            .with_context(|| format!("failed to save {field}"))
    }
}
