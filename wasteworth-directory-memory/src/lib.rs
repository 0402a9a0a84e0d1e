//! In-process directory backend keeping collectors and pickup requests in memory.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::info;

use wasteworth_core::{
    model::{
        AccountStatus, CollectorId, CollectorRecord, ProfileUpdate, RequestDraft, RequestId,
        RequestStatus, ServiceRequest,
    },
    plugin::{BackendId, BackendMeta, DirectoryBackend},
    ports::{CollectorDirectory, DirectoryError, RequestLedger},
};

/// Layout of a seed file: `{ "collectors": [ ... ] }`.
#[derive(Debug, Deserialize)]
struct SeedFile {
    #[serde(default)]
    collectors: Vec<CollectorRecord>,
}

/// Collector directory held in a map keyed by collector id.
pub struct MemoryDirectory {
    collectors: RwLock<BTreeMap<CollectorId, CollectorRecord>>,
}

impl MemoryDirectory {
    /// Create a directory pre-filled with `seed`. Later duplicates of an id win.
    #[must_use]
    pub fn new(seed: Vec<CollectorRecord>) -> Self {
        let collectors = seed
            .into_iter()
            .map(|record| (record.id, record))
            .collect();
        Self {
            collectors: RwLock::new(collectors),
        }
    }
}

#[async_trait]
impl CollectorDirectory for MemoryDirectory {
    async fn active_collectors(&self) -> Result<Vec<CollectorRecord>, DirectoryError> {
        let collectors = self.collectors.read().await;
        Ok(collectors
            .values()
            .filter(|record| record.is_discoverable())
            .cloned()
            .collect())
    }

    async fn collector(&self, id: CollectorId) -> Result<Option<CollectorRecord>, DirectoryError> {
        Ok(self.collectors.read().await.get(&id).cloned())
    }

    async fn upsert_profile(
        &self,
        id: CollectorId,
        update: ProfileUpdate,
    ) -> Result<CollectorRecord, DirectoryError> {
        let mut collectors = self.collectors.write().await;
        let record = match collectors.get_mut(&id) {
            Some(existing) => {
                existing.apply(update);
                existing.clone()
            }
            None => {
                // registration auto-activates accounts
                let created = CollectorRecord::from_profile(id, update, AccountStatus::Active);
                collectors.insert(id, created.clone());
                created
            }
        };
        Ok(record)
    }
}

#[derive(Default)]
struct LedgerState {
    last_id: u64,
    requests: BTreeMap<RequestId, ServiceRequest>,
}

/// Request ledger with sequential ids starting at 1.
#[derive(Default)]
pub struct MemoryLedger {
    state: RwLock<LedgerState>,
}

impl MemoryLedger {
    /// Create an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RequestLedger for MemoryLedger {
    async fn create(&self, draft: RequestDraft) -> Result<ServiceRequest, DirectoryError> {
        let mut state = self.state.write().await;
        state.last_id = state
            .last_id
            .checked_add(1)
            .ok_or_else(|| DirectoryError::Internal("request id space exhausted".into()))?;

        let id = RequestId(state.last_id);
        let request = ServiceRequest::from_draft(id, draft, Utc::now());
        state.requests.insert(id, request.clone());
        Ok(request)
    }

    async fn for_collector(
        &self,
        collector: CollectorId,
        status: Option<RequestStatus>,
    ) -> Result<Vec<ServiceRequest>, DirectoryError> {
        let state = self.state.read().await;
        let mut requests: Vec<ServiceRequest> = state
            .requests
            .values()
            .filter(|request| request.collector_id == collector)
            .filter(|request| status.is_none_or(|wanted| request.status == wanted))
            .cloned()
            .collect();

        requests.sort_by(|left, right| {
            right
                .created_at
                .cmp(&left.created_at)
                .then_with(|| right.id.cmp(&left.id))
        });
        Ok(requests)
    }

    async fn update_status(
        &self,
        id: RequestId,
        status: RequestStatus,
    ) -> Result<ServiceRequest, DirectoryError> {
        let mut state = self.state.write().await;
        let request = state
            .requests
            .get_mut(&id)
            .ok_or(DirectoryError::RequestNotFound(id))?;

        if !request.status.can_transition_to(status) {
            return Err(DirectoryError::InvalidTransition {
                from: request.status,
                to: status,
            });
        }

        request.status = status;
        Ok(request.clone())
    }
}

/// Decode collectors from the JSON seed format.
///
/// # Errors
///
/// Returns [`DirectoryError::InvalidSeed`] when the text is not a valid seed document.
pub fn parse_seed(raw: &str) -> Result<Vec<CollectorRecord>, DirectoryError> {
    serde_json::from_str::<SeedFile>(raw)
        .map(|seed| seed.collectors)
        .map_err(|err| DirectoryError::InvalidSeed(err.to_string()))
}

/// Read and decode a seed file.
///
/// # Errors
///
/// Returns [`DirectoryError::InvalidSeed`] when the file cannot be read or decoded.
pub async fn load_seed(path: &Path) -> Result<Vec<CollectorRecord>, DirectoryError> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|err| DirectoryError::InvalidSeed(format!("{}: {err}", path.display())))?;
    let collectors = parse_seed(&raw)?;
    info!(path = %path.display(), collectors = collectors.len(), "loaded directory seed");
    Ok(collectors)
}

/// Build the backend bundle for the in-memory directory.
#[must_use]
pub fn plugin(seed: Vec<CollectorRecord>) -> DirectoryBackend {
    DirectoryBackend {
        meta: backend_meta(),
        directory: Arc::new(MemoryDirectory::new(seed)),
        ledger: Arc::new(MemoryLedger::new()),
    }
}

fn backend_meta() -> BackendMeta {
    BackendMeta {
        id: BackendId(String::from("memory")),
        name: String::from("In-memory directory"),
    }
}
