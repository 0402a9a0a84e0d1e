//! High-level service facade over one directory backend.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::model::{
    CollectorId, CollectorRecord, ProfileUpdate, RequestDraft, RequestId, RequestStatus,
    ServiceRequest,
};
use crate::plugin::DirectoryBackend;
use crate::ports::{CollectorDirectory, DirectoryError, RequestLedger};
use crate::proximity::{ProximityQuery, ProximityResult, rank_nearby};

#[derive(thiserror::Error, Debug)]
/// Errors surfaced to callers of [`WasteworthService`].
pub enum ServiceError {
    /// The nearby search could not read the directory. Distinct from "nothing found".
    #[error("Collector lookup failed: {0}")]
    LookupFailed(#[source] DirectoryError),
    /// Any other backend failure.
    #[error(transparent)]
    Directory(#[from] DirectoryError),
    /// The collector exists but does not accept requests.
    #[error("Collector {0} is not active")]
    CollectorInactive(CollectorId),
    /// Caller-supplied data failed validation.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Public entry point for discovery, profiles, and pickup requests.
pub struct WasteworthService {
    directory: Arc<dyn CollectorDirectory>,
    ledger: Arc<dyn RequestLedger>,
    lookup_timeout: Option<Duration>,
}

impl WasteworthService {
    /// Create a new service bound to the provided backend.
    #[must_use]
    pub fn new(backend: DirectoryBackend) -> Self {
        Self {
            directory: backend.directory,
            ledger: backend.ledger,
            lookup_timeout: None,
        }
    }

    /// Fail nearby searches whose directory read takes longer than `timeout`.
    #[must_use]
    pub fn with_lookup_timeout(mut self, timeout: Duration) -> Self {
        self.lookup_timeout = Some(timeout);
        self
    }

    /// Active collectors strictly within the query radius, nearest first.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::LookupFailed`] when the directory read fails or
    /// exceeds the lookup timeout. No partial results are returned.
    pub async fn find_nearby(
        &self,
        query: ProximityQuery,
    ) -> Result<Vec<ProximityResult>, ServiceError> {
        if query.is_empty() {
            debug!(radius_km = query.radius_km, "non-positive radius, skipping lookup");
            return Ok(Vec::new());
        }

        let records = self.lookup().await.map_err(|err| {
            warn!(error = %err, "collector lookup failed");
            ServiceError::LookupFailed(err)
        })?;
        let scanned = records.len();

        let results = rank_nearby(&query, records);
        debug!(
            latitude = query.latitude,
            longitude = query.longitude,
            radius_km = query.radius_km,
            scanned,
            matched = results.len(),
            "nearby search finished"
        );

        Ok(results)
    }

    async fn lookup(&self) -> Result<Vec<CollectorRecord>, DirectoryError> {
        let read = self.directory.active_collectors();
        match self.lookup_timeout {
            Some(limit) => tokio::time::timeout(limit, read)
                .await
                .map_err(|_elapsed| DirectoryError::Timeout)?,
            None => read.await,
        }
    }

    /// Profile of a single collector.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::CollectorNotFound`] for unknown ids or any backend failure.
    pub async fn collector_profile(&self, id: CollectorId) -> Result<CollectorRecord, ServiceError> {
        self.directory
            .collector(id)
            .await?
            .ok_or(ServiceError::Directory(DirectoryError::CollectorNotFound(id)))
    }

    /// Create or update a collector's own profile.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::InvalidInput`] for out-of-range coordinates, a
    /// half-set location, a negative service radius, or an empty display name.
    pub async fn update_profile(
        &self,
        id: CollectorId,
        update: ProfileUpdate,
    ) -> Result<CollectorRecord, ServiceError> {
        validate_profile(&update)?;
        let record = self.directory.upsert_profile(id, update).await?;
        debug!(collector = %id, "profile updated");
        Ok(record)
    }

    /// Place a pickup request with an active collector.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::CollectorInactive`] when the collector's account
    /// is not active, or a backend error when the collector is unknown.
    pub async fn create_request(&self, draft: RequestDraft) -> Result<ServiceRequest, ServiceError> {
        if draft.pickup_address.trim().is_empty() {
            return Err(ServiceError::InvalidInput("pickup address is required".into()));
        }
        check_coordinates(draft.latitude, draft.longitude)?;

        let collector = self.collector_profile(draft.collector_id).await?;
        if !collector.account_status.is_active() {
            return Err(ServiceError::CollectorInactive(collector.id));
        }

        let request = self.ledger.create(draft).await?;
        debug!(request = %request.id, collector = %request.collector_id, "request created");
        Ok(request)
    }

    /// Requests addressed to a collector, newest first.
    ///
    /// # Errors
    ///
    /// Returns a backend error when the ledger cannot be read.
    pub async fn requests_for_collector(
        &self,
        id: CollectorId,
        status: Option<RequestStatus>,
    ) -> Result<Vec<ServiceRequest>, ServiceError> {
        Ok(self.ledger.for_collector(id, status).await?)
    }

    /// Accept, decline, complete, or cancel a request.
    ///
    /// # Errors
    ///
    /// Returns a backend error for unknown requests or forbidden transitions.
    pub async fn update_request_status(
        &self,
        id: RequestId,
        status: RequestStatus,
    ) -> Result<ServiceRequest, ServiceError> {
        let request = self.ledger.update_status(id, status).await?;
        debug!(request = %id, status = %status, "request status changed");
        Ok(request)
    }
}

fn validate_profile(update: &ProfileUpdate) -> Result<(), ServiceError> {
    if update.display_name.trim().is_empty() {
        return Err(ServiceError::InvalidInput("display name is required".into()));
    }
    check_coordinates(update.latitude, update.longitude)?;
    if let Some(radius) = update.service_radius_km
        && !(radius.is_finite() && radius >= 0.0)
    {
        return Err(ServiceError::InvalidInput(format!(
            "service radius must be a non-negative number, got {radius}"
        )));
    }
    Ok(())
}

fn check_coordinates(latitude: Option<f64>, longitude: Option<f64>) -> Result<(), ServiceError> {
    match (latitude, longitude) {
        (None, None) => Ok(()),
        (Some(lat), Some(lng))
            if (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lng) =>
        {
            Ok(())
        }
        (Some(lat), Some(lng)) => Err(ServiceError::InvalidInput(format!(
            "coordinates out of range: ({lat}, {lng})"
        ))),
        _ => Err(ServiceError::InvalidInput(
            "latitude and longitude must be set together".into(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use async_trait::async_trait;
    use chrono::Utc;

    use super::*;
    use crate::model::{AccountStatus, AvailabilityStatus};
    use crate::plugin::{BackendId, BackendMeta};

    enum Behavior {
        Records(Vec<CollectorRecord>),
        Fail,
        Hang,
    }

    struct StubDirectory {
        behavior: Behavior,
    }

    #[async_trait]
    impl CollectorDirectory for StubDirectory {
        async fn active_collectors(&self) -> Result<Vec<CollectorRecord>, DirectoryError> {
            match &self.behavior {
                Behavior::Records(records) => Ok(records.clone()),
                Behavior::Fail => Err(DirectoryError::Unavailable("database offline".into())),
                Behavior::Hang => {
                    tokio::time::sleep(Duration::from_secs(60)).await;
                    Ok(Vec::new())
                }
            }
        }

        async fn collector(&self, id: CollectorId) -> Result<Option<CollectorRecord>, DirectoryError> {
            match &self.behavior {
                Behavior::Records(records) => Ok(records.iter().find(|record| record.id == id).cloned()),
                _ => Err(DirectoryError::Unavailable("database offline".into())),
            }
        }

        async fn upsert_profile(
            &self,
            id: CollectorId,
            update: ProfileUpdate,
        ) -> Result<CollectorRecord, DirectoryError> {
            Ok(CollectorRecord::from_profile(id, update, AccountStatus::Active))
        }
    }

    struct StubLedger;

    #[async_trait]
    impl RequestLedger for StubLedger {
        async fn create(&self, draft: RequestDraft) -> Result<ServiceRequest, DirectoryError> {
            Ok(ServiceRequest::from_draft(RequestId(1), draft, Utc::now()))
        }

        async fn for_collector(
            &self,
            _collector: CollectorId,
            _status: Option<RequestStatus>,
        ) -> Result<Vec<ServiceRequest>, DirectoryError> {
            Ok(Vec::new())
        }

        async fn update_status(
            &self,
            id: RequestId,
            _status: RequestStatus,
        ) -> Result<ServiceRequest, DirectoryError> {
            Err(DirectoryError::RequestNotFound(id))
        }
    }

    fn service(behavior: Behavior) -> WasteworthService {
        WasteworthService::new(DirectoryBackend {
            meta: BackendMeta {
                id: BackendId("stub".into()),
                name: "Stub".into(),
            },
            directory: Arc::new(StubDirectory { behavior }),
            ledger: Arc::new(StubLedger),
        })
    }

    fn record(id: u64, lat: f64, lng: f64, status: AccountStatus) -> CollectorRecord {
        CollectorRecord {
            id: CollectorId(id),
            display_name: format!("Collector {id}"),
            bio: None,
            latitude: Some(lat),
            longitude: Some(lng),
            service_radius_km: Some(5.0),
            availability: AvailabilityStatus::Available,
            rating_avg: Some(4.5),
            waste_types: BTreeSet::new(),
            account_status: status,
        }
    }

    fn draft(collector: u64) -> RequestDraft {
        RequestDraft {
            client_id: crate::model::ClientId(10),
            collector_id: CollectorId(collector),
            waste_types: BTreeSet::new(),
            description: String::from("Two bags of bottles"),
            pickup_address: String::from("1 Main St"),
            latitude: None,
            longitude: None,
            desired_pickup_time: None,
        }
    }

    #[tokio::test]
    async fn finds_nearby_collectors() {
        let service = service(Behavior::Records(vec![
            record(1, 0.0, 0.0, AccountStatus::Active),
            record(2, 10.0, 10.0, AccountStatus::Active),
        ]));

        let results = service
            .find_nearby(ProximityQuery::default())
            .await
            .expect("lookup succeeds");

        assert_eq!(results.len(), 1);
    }

    #[tokio::test]
    async fn directory_failure_is_not_an_empty_result() {
        let service = service(Behavior::Fail);
        let err = service
            .find_nearby(ProximityQuery::default())
            .await
            .expect_err("lookup fails");
        assert!(matches!(err, ServiceError::LookupFailed(DirectoryError::Unavailable(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_directory_times_out() {
        let service = service(Behavior::Hang).with_lookup_timeout(Duration::from_millis(50));
        let err = service
            .find_nearby(ProximityQuery::default())
            .await
            .expect_err("lookup times out");
        assert!(matches!(err, ServiceError::LookupFailed(DirectoryError::Timeout)));
    }

    #[tokio::test]
    async fn zero_radius_skips_directory() {
        let service = service(Behavior::Fail);
        let results = service
            .find_nearby(ProximityQuery::new(0.0, 0.0, 0.0))
            .await
            .expect("no lookup needed");
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn profile_validation_rejects_bad_coordinates() {
        let service = service(Behavior::Records(Vec::new()));
        let update = ProfileUpdate {
            display_name: String::from("Haulers"),
            bio: None,
            latitude: Some(91.0),
            longitude: Some(0.0),
            service_radius_km: None,
            waste_types: BTreeSet::new(),
            availability: AvailabilityStatus::Available,
        };
        let err = service
            .update_profile(CollectorId(1), update.clone())
            .await
            .expect_err("latitude out of range");
        assert!(matches!(err, ServiceError::InvalidInput(_)));

        let half_set = ProfileUpdate {
            latitude: Some(1.0),
            longitude: None,
            ..update
        };
        assert!(service.update_profile(CollectorId(1), half_set).await.is_err());
    }

    #[tokio::test]
    async fn requests_only_go_to_active_collectors() {
        let service = service(Behavior::Records(vec![
            record(1, 0.0, 0.0, AccountStatus::Active),
            record(2, 0.0, 0.0, AccountStatus::Suspended),
        ]));

        let created = service.create_request(draft(1)).await.expect("active collector");
        assert_eq!(created.status, RequestStatus::Pending);

        let inactive = service.create_request(draft(2)).await.expect_err("suspended");
        assert!(matches!(inactive, ServiceError::CollectorInactive(CollectorId(2))));

        let missing = service.create_request(draft(3)).await.expect_err("unknown");
        assert!(matches!(
            missing,
            ServiceError::Directory(DirectoryError::CollectorNotFound(CollectorId(3)))
        ));
    }
}
