//! Domain types for tabgroup.
//!
//! All types are serializable via serde so they can cross the storage and
//! classification-service boundaries as JSON.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Seed list used when no stored label list exists.
pub const DEFAULT_GROUP_LABELS: [&str; 6] = [
    "Social",
    "Entertainment",
    "Read Material",
    "Education",
    "Productivity",
    "Utilities",
];

/// Owned copy of [`DEFAULT_GROUP_LABELS`].
pub fn default_group_labels() -> Vec<String> {
    DEFAULT_GROUP_LABELS.iter().map(|s| (*s).to_owned()).collect()
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// The persisted user configuration. Always fully populated; "unset" is an
/// empty string or empty list, never a missing field.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Configuration {
    /// Classification-service credential. Empty means unset.
    pub credential: String,
    pub auto_classify: bool,
    /// Ordered, may contain duplicates or empty strings.
    pub group_labels: Vec<String>,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            credential: String::new(),
            auto_classify: true,
            group_labels: default_group_labels(),
        }
    }
}

impl Configuration {
    /// True when both a credential and at least one label are present.
    pub fn can_classify(&self) -> bool {
        !self.credential.is_empty() && !self.group_labels.is_empty()
    }

    /// Credential with everything but the last four characters hidden.
    pub fn masked_credential(&self) -> String {
        mask(&self.credential)
    }
}

impl fmt::Debug for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Configuration")
            .field("credential", &self.masked_credential())
            .field("auto_classify", &self.auto_classify)
            .field("group_labels", &self.group_labels)
            .finish()
    }
}

fn mask(secret: &str) -> String {
    let count = secret.chars().count();
    if count <= 4 {
        return "*".repeat(count);
    }
    let tail: String = secret.chars().skip(count - 4).collect();
    format!("{}{tail}", "*".repeat(count - 4))
}

// ---------------------------------------------------------------------------
// Resources
// ---------------------------------------------------------------------------

/// Host identifier for a resource (tab). Rendered as a string.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(pub String);

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for ResourceId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ResourceId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// One item of the host's current working set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceDescriptor {
    #[serde(deserialize_with = "resource_id_compat")]
    pub id: ResourceId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
}

impl ResourceDescriptor {
    pub fn new(id: impl Into<ResourceId>, title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            url: url.into(),
        }
    }
}

/// Hosts hand out numeric tab ids; stored and exchanged ids are strings.
#[derive(Deserialize)]
#[serde(untagged)]
enum ResourceIdCompat {
    Text(String),
    Number(i64),
}

fn resource_id_compat<'de, D>(deserializer: D) -> Result<ResourceId, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match ResourceIdCompat::deserialize(deserializer)? {
        ResourceIdCompat::Text(s) => ResourceId(s),
        ResourceIdCompat::Number(n) => ResourceId(n.to_string()),
    })
}

// ---------------------------------------------------------------------------
// Classification payloads
// ---------------------------------------------------------------------------

/// Everything a classification service needs for one call. Built fresh per
/// trigger and dropped afterwards.
#[derive(Clone, PartialEq, Eq)]
pub struct ClassificationRequest {
    pub resources: Vec<ResourceDescriptor>,
    pub labels: Vec<String>,
    pub credential: String,
}

impl fmt::Debug for ClassificationRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassificationRequest")
            .field("resources", &self.resources)
            .field("labels", &self.labels)
            .field("credential", &mask(&self.credential))
            .finish()
    }
}

/// Resource → assigned label, ordered by resource id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub assignments: BTreeMap<ResourceId, String>,
}

impl ClassificationResult {
    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    pub fn label_for(&self, id: &ResourceId) -> Option<&str> {
        self.assignments.get(id).map(String::as_str)
    }
}

impl<K, V> FromIterator<(K, V)> for ClassificationResult
where
    K: Into<ResourceId>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            assignments: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
