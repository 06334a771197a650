//! Cached Operation Module
//!
//! Identity of a cached operation and the settings attached to it.

use std::fmt;
use std::sync::Arc;

use serde::{Serialize, Serializer};

use crate::cache::CacheSettings;
use crate::error::Result;

// == Operation Id ==
/// Stable, comparable name of an operation, e.g. `"ReportService::render"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OperationId(Arc<str>);

impl OperationId {
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for OperationId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl From<&str> for OperationId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

// == Cached Operation ==
/// An operation together with its immutable cache settings.
///
/// Built once, usually at service construction, and passed to every call.
#[derive(Debug, Clone)]
pub struct CachedOperation {
    id: OperationId,
    settings: CacheSettings,
}

impl CachedOperation {
    pub fn new(id: impl Into<OperationId>, settings: CacheSettings) -> Self {
        Self {
            id: id.into(),
            settings,
        }
    }

    /// Operation with the default settings.
    pub fn with_defaults(id: impl Into<OperationId>) -> Result<Self> {
        Ok(Self::new(id, CacheSettings::builder().build()?))
    }

    pub fn id(&self) -> &OperationId {
        &self.id
    }

    pub fn settings(&self) -> &CacheSettings {
        &self.settings
    }
}
