//! Traits describing directory capabilities and shared helper types.

use async_trait::async_trait;
use reqwest::Error as ReqwestError;

use crate::model::{
    CollectorId, CollectorRecord, ProfileUpdate, RequestDraft, RequestId, RequestStatus,
    ServiceRequest,
};

#[derive(thiserror::Error, Debug)]
/// Errors that can occur while talking to directory backends.
pub enum DirectoryError {
    /// Network layer failed.
    #[error("Network error: {0}")]
    Network(#[from] ReqwestError),
    /// The backend did not answer in time.
    #[error("Directory lookup timed out")]
    Timeout,
    /// The backend is reachable but refuses to serve.
    #[error("Directory unavailable: {0}")]
    Unavailable(String),
    /// No collector with this id exists.
    #[error("Collector {0} not found")]
    CollectorNotFound(CollectorId),
    /// No service request with this id exists.
    #[error("Request {0} not found")]
    RequestNotFound(RequestId),
    /// The request cannot move from its current status to the requested one.
    #[error("Cannot change request status from {from} to {to}")]
    InvalidTransition {
        /// Current status.
        from: RequestStatus,
        /// Rejected target status.
        to: RequestStatus,
    },
    /// Seed data could not be read or decoded.
    #[error("Invalid seed data: {0}")]
    InvalidSeed(String),
    /// No backend is registered under the requested id.
    #[error("Unsupported backend")]
    UnsupportedBackend,
    /// Internal backend error.
    #[error("Internal error: {0}")]
    Internal(String),
}

#[async_trait]
/// Read and profile-maintenance access to collector records.
pub trait CollectorDirectory: Send + Sync {
    /// Active collectors that have both coordinates set.
    ///
    /// Implementations may return a superset; ineligible records are dropped
    /// by the proximity ranking.
    ///
    /// # Errors
    ///
    /// Returns a [`DirectoryError`] when the backend cannot be read.
    async fn active_collectors(&self) -> Result<Vec<CollectorRecord>, DirectoryError>;

    /// Look up a single collector regardless of account status.
    ///
    /// # Errors
    ///
    /// Returns a [`DirectoryError`] when the backend cannot be read.
    async fn collector(&self, id: CollectorId) -> Result<Option<CollectorRecord>, DirectoryError>;

    /// Create or replace the editable part of a collector's profile.
    ///
    /// # Errors
    ///
    /// Returns a [`DirectoryError`] when the backend rejects the write.
    async fn upsert_profile(
        &self,
        id: CollectorId,
        update: ProfileUpdate,
    ) -> Result<CollectorRecord, DirectoryError>;
}

#[async_trait]
/// Storage of pickup requests between clients and collectors.
pub trait RequestLedger: Send + Sync {
    /// Store a new pending request.
    ///
    /// # Errors
    ///
    /// Returns a [`DirectoryError`] when the backend rejects the write.
    async fn create(&self, draft: RequestDraft) -> Result<ServiceRequest, DirectoryError>;

    /// Requests addressed to a collector, newest first, optionally narrowed to one status.
    ///
    /// # Errors
    ///
    /// Returns a [`DirectoryError`] when the backend cannot be read.
    async fn for_collector(
        &self,
        collector: CollectorId,
        status: Option<RequestStatus>,
    ) -> Result<Vec<ServiceRequest>, DirectoryError>;

    /// Move a request to a new status.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::RequestNotFound`] for unknown ids and
    /// [`DirectoryError::InvalidTransition`] when the lifecycle forbids the change.
    async fn update_status(
        &self,
        id: RequestId,
        status: RequestStatus,
    ) -> Result<ServiceRequest, DirectoryError>;
}
