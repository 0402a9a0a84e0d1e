//! Directory backend that reads and writes through an upstream directory HTTP API.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use wasteworth_core::{
    model::{
        AccountStatus, AvailabilityStatus, CollectorId, CollectorRecord, ProfileUpdate,
        RequestDraft, RequestId, RequestStatus, ServiceRequest, WasteType,
    },
    plugin::{BackendId, BackendMeta, DirectoryBackend},
    ports::{CollectorDirectory, DirectoryError, RequestLedger},
};

/// Collector row as served by the upstream directory (`/collectors`).
#[derive(Debug, Deserialize)]
struct CollectorRow {
    user_id: u64,
    display_name: String,

    #[serde(default)]
    bio: Option<String>,

    // DECIMAL columns arrive either as numbers or as strings
    #[serde(default)]
    latitude: Option<NumberField>,
    #[serde(default)]
    longitude: Option<NumberField>,
    #[serde(default)]
    service_radius_km: Option<NumberField>,
    #[serde(default)]
    rating_avg: Option<NumberField>,

    #[serde(default)]
    waste_types: Option<WasteTypesField>,

    #[serde(default)]
    availability_status: Option<String>,

    status: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum NumberField {
    Number(f64),
    Text(String),
}

impl NumberField {
    fn value(self) -> Option<f64> {
        match self {
            Self::Number(number) => Some(number),
            Self::Text(text) => text.trim().parse().ok(),
        }
    }
}

/// `waste_types` is a JSON array, or a JSON array encoded into a string column.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WasteTypesField {
    List(Vec<String>),
    Encoded(String),
}

impl WasteTypesField {
    fn into_set(self) -> BTreeSet<WasteType> {
        let tags = match self {
            Self::List(tags) => tags,
            Self::Encoded(raw) => serde_json::from_str::<Vec<String>>(&raw).unwrap_or_default(),
        };
        tags.into_iter()
            .filter(|tag| !tag.trim().is_empty())
            .map(WasteType::from)
            .collect()
    }
}

impl From<CollectorRow> for CollectorRecord {
    fn from(row: CollectorRow) -> Self {
        Self {
            id: CollectorId(row.user_id),
            display_name: row.display_name,
            bio: row.bio,
            latitude: row.latitude.and_then(NumberField::value),
            longitude: row.longitude.and_then(NumberField::value),
            service_radius_km: row.service_radius_km.and_then(NumberField::value),
            availability: row
                .availability_status
                .map(AvailabilityStatus::from)
                .unwrap_or_default(),
            rating_avg: row.rating_avg.and_then(NumberField::value),
            waste_types: row
                .waste_types
                .map(WasteTypesField::into_set)
                .unwrap_or_default(),
            account_status: AccountStatus::from(row.status),
        }
    }
}

/// Body for `PUT /collectors/{id}/profile`.
#[derive(Debug, Serialize)]
struct ProfileBody<'a> {
    display_name: &'a str,
    bio: Option<&'a str>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    service_radius_km: Option<f64>,
    waste_types: Vec<String>,
    availability_status: String,
}

impl<'a> From<&'a ProfileUpdate> for ProfileBody<'a> {
    fn from(update: &'a ProfileUpdate) -> Self {
        Self {
            display_name: &update.display_name,
            bio: update.bio.as_deref(),
            latitude: update.latitude,
            longitude: update.longitude,
            service_radius_km: update.service_radius_km,
            waste_types: update.waste_types.iter().map(ToString::to_string).collect(),
            availability_status: update.availability.to_string(),
        }
    }
}

/// Body for `PUT /requests/{id}/status`.
#[derive(Debug, Serialize)]
struct StatusBody {
    status: RequestStatus,
}

/// Body of a `409 Conflict` answer to a status change.
#[derive(Debug, Deserialize)]
struct TransitionConflict {
    from: RequestStatus,
}

/// Collector directory backed by the upstream API.
pub struct RemoteDirectory {
    client: Client,
    base_url: String,
}

impl RemoteDirectory {
    /// Create a new directory bound to the given HTTP client and API root.
    #[must_use]
    pub fn new(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: normalize_base(base_url),
        }
    }
}

#[async_trait]
impl CollectorDirectory for RemoteDirectory {
    async fn active_collectors(&self) -> Result<Vec<CollectorRecord>, DirectoryError> {
        let req = self
            .client
            .get(format!("{}/collectors", self.base_url))
            .query(&[("status", "active"), ("located", "true")]);

        let rows = fetch_json::<Vec<CollectorRow>>(req).await?;
        debug!(rows = rows.len(), "fetched collector rows");

        Ok(rows.into_iter().map(CollectorRecord::from).collect())
    }

    async fn collector(&self, id: CollectorId) -> Result<Option<CollectorRecord>, DirectoryError> {
        let req = self.client.get(format!("{}/collectors/{id}", self.base_url));
        let row = fetch_optional::<CollectorRow>(req).await?;
        Ok(row.map(CollectorRecord::from))
    }

    async fn upsert_profile(
        &self,
        id: CollectorId,
        update: ProfileUpdate,
    ) -> Result<CollectorRecord, DirectoryError> {
        let req = self
            .client
            .put(format!("{}/collectors/{id}/profile", self.base_url))
            .json(&ProfileBody::from(&update));

        let row = fetch_json::<CollectorRow>(req).await?;
        Ok(CollectorRecord::from(row))
    }
}

/// Request ledger backed by the upstream API.
pub struct RemoteLedger {
    client: Client,
    base_url: String,
}

impl RemoteLedger {
    /// Create a new ledger bound to the given HTTP client and API root.
    #[must_use]
    pub fn new(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: normalize_base(base_url),
        }
    }
}

#[async_trait]
impl RequestLedger for RemoteLedger {
    async fn create(&self, draft: RequestDraft) -> Result<ServiceRequest, DirectoryError> {
        let req = self
            .client
            .post(format!("{}/requests", self.base_url))
            .json(&draft);
        fetch_json(req).await
    }

    async fn for_collector(
        &self,
        collector: CollectorId,
        status: Option<RequestStatus>,
    ) -> Result<Vec<ServiceRequest>, DirectoryError> {
        let mut req = self
            .client
            .get(format!("{}/collectors/{collector}/requests", self.base_url));
        if let Some(status) = status {
            req = req.query(&[("status", status.to_string())]);
        }

        let mut requests = fetch_json::<Vec<ServiceRequest>>(req).await?;
        // older upstreams ignore the status query
        requests.retain(|request| status.is_none_or(|wanted| request.status == wanted));
        // upstream order is not guaranteed
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
        let resp = self
            .client
            .put(format!("{}/requests/{id}/status", self.base_url))
            .json(&StatusBody { status })
            .send()
            .await
            .map_err(map_transport)?;

        match resp.status() {
            StatusCode::NOT_FOUND => Err(DirectoryError::RequestNotFound(id)),
            StatusCode::CONFLICT => {
                let conflict = resp.json::<TransitionConflict>().await.map_err(map_transport)?;
                Err(DirectoryError::InvalidTransition {
                    from: conflict.from,
                    to: status,
                })
            }
            _ => decode(resp).await,
        }
    }
}

/// Build the backend bundle for the upstream directory at `base_url`.
#[must_use]
pub fn plugin(client: Client, base_url: &str) -> DirectoryBackend {
    let directory = Arc::new(RemoteDirectory::new(client.clone(), base_url));
    let ledger = Arc::new(RemoteLedger::new(client, base_url));

    DirectoryBackend {
        meta: backend_meta(),
        directory,
        ledger,
    }
}

fn backend_meta() -> BackendMeta {
    BackendMeta {
        id: BackendId(String::from("remote")),
        name: String::from("Upstream directory API"),
    }
}

fn normalize_base(base_url: &str) -> String {
    base_url.trim().trim_end_matches('/').to_owned()
}

fn map_transport(err: reqwest::Error) -> DirectoryError {
    if err.is_timeout() {
        DirectoryError::Timeout
    } else if err.status() == Some(StatusCode::SERVICE_UNAVAILABLE) {
        DirectoryError::Unavailable(err.to_string())
    } else {
        DirectoryError::from(err)
    }
}

async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T, DirectoryError> {
    resp.error_for_status()
        .map_err(map_transport)?
        .json()
        .await
        .map_err(map_transport)
}

// Small helper to fetch and decode JSON with status handling.
async fn fetch_json<T: DeserializeOwned>(req: RequestBuilder) -> Result<T, DirectoryError> {
    let resp = req.send().await.map_err(map_transport)?;
    decode(resp).await
}

// Like `fetch_json`, but a 404 means "absent" rather than an error.
async fn fetch_optional<T: DeserializeOwned>(
    req: RequestBuilder,
) -> Result<Option<T>, DirectoryError> {
    let resp = req.send().await.map_err(map_transport)?;
    if resp.status() == StatusCode::NOT_FOUND {
        return Ok(None);
    }
    decode(resp).await.map(Some)
}
