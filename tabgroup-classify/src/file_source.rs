//! Resource source that reads a JSON snapshot of the host's open tabs.
//!
//! Accepted shapes: a bare array of resources, or `{"tabs": [...]}` as
//! produced by browser tab-export tools.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;

use tabgroup_core::ResourceDescriptor;

use crate::error::ClassifyError;
use crate::service::ResourceSource;

#[derive(Deserialize)]
#[serde(untagged)]
enum TabsFileCompat {
    Bare(Vec<ResourceDescriptor>),
    Wrapped { tabs: Vec<ResourceDescriptor> },
}

/// [`ResourceSource`] reading a tabs file on every call.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ResourceSource for JsonFileSource {
    async fn list_current_resources(&self) -> Result<Vec<ResourceDescriptor>, ClassifyError> {
        let contents = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| ClassifyError::Enumeration(format!("{}: {e}", self.path.display())))?;
        let parsed: TabsFileCompat = serde_json::from_str(&contents)
            .map_err(|e| ClassifyError::Enumeration(format!("{}: {e}", self.path.display())))?;
        Ok(match parsed {
            TabsFileCompat::Bare(tabs) | TabsFileCompat::Wrapped { tabs } => tabs,
        })
    }
}
