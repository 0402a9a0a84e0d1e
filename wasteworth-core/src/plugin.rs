//! Registry for all directory backends and their ports.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::ports::{CollectorDirectory, DirectoryError, RequestLedger};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
/// Identifier under which a backend is registered, e.g. `memory`.
pub struct BackendId(pub String);

impl fmt::Display for BackendId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
/// Metadata describing a backend.
pub struct BackendMeta {
    /// Unique identifier.
    pub id: BackendId,
    /// Human-friendly description for logs.
    pub name: String,
}

/// Collection of ports implementing one storage backend.
pub struct DirectoryBackend {
    /// Static metadata describing the backend.
    pub meta: BackendMeta,
    /// Collector records.
    pub directory: Arc<dyn CollectorDirectory>,
    /// Pickup requests.
    pub ledger: Arc<dyn RequestLedger>,
}

/// Registry that resolves backends by identifier.
pub struct BackendRegistry {
    backends: HashMap<BackendId, DirectoryBackend>,
}

impl BackendRegistry {
    /// Build a registry from the provided backend list.
    #[must_use]
    pub fn new(backends: Vec<DirectoryBackend>) -> Self {
        let backends_map = backends
            .into_iter()
            .map(|backend| (backend.meta.id.clone(), backend))
            .collect();
        Self {
            backends: backends_map,
        }
    }

    /// Metadata for all registered backends.
    #[must_use]
    pub fn backends(&self) -> Vec<BackendMeta> {
        self.backends
            .values()
            .map(|backend| backend.meta.clone())
            .collect()
    }

    /// Take a backend out of the registry.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::UnsupportedBackend`] when no backend is registered.
    pub fn take(&mut self, id: &BackendId) -> Result<DirectoryBackend, DirectoryError> {
        self.backends
            .remove(id)
            .ok_or(DirectoryError::UnsupportedBackend)
    }
}
