//! Domain data structures for collectors, their profiles, and pickup requests.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
/// Identifier of a collector account in the directory.
pub struct CollectorId(pub u64);

impl fmt::Display for CollectorId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
/// Identifier of a client account placing pickup requests.
pub struct ClientId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
/// Identifier of a service request.
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
/// Waste categories a collector accepts or a client asks to have picked up.
pub enum WasteType {
    /// Plastic packaging and containers.
    Plastic,
    /// Paper and cardboard.
    Paper,
    /// Glass bottles and jars.
    Glass,
    /// Metal scrap and cans.
    Metal,
    /// Organic and garden waste.
    Organic,
    /// Electronic waste.
    Electronic,
    /// Clothes and other textiles.
    Textile,
    /// Residual household waste.
    Residual,
    /// Any tag not known to wasteworth.
    Other(String),
}

impl From<String> for WasteType {
    fn from(raw: String) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "plastic" => Self::Plastic,
            "paper" => Self::Paper,
            "glass" => Self::Glass,
            "metal" => Self::Metal,
            "organic" => Self::Organic,
            "electronic" | "e-waste" => Self::Electronic,
            "textile" => Self::Textile,
            "residual" => Self::Residual,
            _ => Self::Other(raw),
        }
    }
}

impl From<WasteType> for String {
    fn from(waste: WasteType) -> Self {
        waste.to_string()
    }
}

impl fmt::Display for WasteType {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            Self::Plastic => "plastic",
            Self::Paper => "paper",
            Self::Glass => "glass",
            Self::Metal => "metal",
            Self::Organic => "organic",
            Self::Electronic => "electronic",
            Self::Textile => "textile",
            Self::Residual => "residual",
            Self::Other(raw) => raw,
        };
        write!(formatter, "{tag}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
/// Self-reported readiness of a collector to take new requests.
///
/// Stored as free text by collectors, so unknown values are kept verbatim.
pub enum AvailabilityStatus {
    /// Accepting new requests.
    Available,
    /// Working, may accept later.
    Busy,
    /// Not accepting requests.
    #[default]
    Offline,
    /// Unrecognized free-text status.
    Other(String),
}

impl From<String> for AvailabilityStatus {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "available" => Self::Available,
            "busy" => Self::Busy,
            "offline" => Self::Offline,
            _ => Self::Other(raw),
        }
    }
}

impl From<AvailabilityStatus> for String {
    fn from(status: AvailabilityStatus) -> Self {
        status.to_string()
    }
}

impl fmt::Display for AvailabilityStatus {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Available => "available",
            Self::Busy => "busy",
            Self::Offline => "offline",
            Self::Other(raw) => raw,
        };
        write!(formatter, "{label}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
/// Directory-level eligibility of an account.
pub enum AccountStatus {
    /// Visible to clients.
    Active,
    /// Registered but not yet approved.
    #[default]
    Pending,
    /// Blocked by an administrator.
    Suspended,
    /// Any other value stored by the directory.
    Other(String),
}

impl AccountStatus {
    /// Only accounts whose status is exactly `"active"` are eligible for discovery.
    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }
}

impl From<String> for AccountStatus {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "active" => Self::Active,
            "pending" => Self::Pending,
            "suspended" => Self::Suspended,
            _ => Self::Other(raw),
        }
    }
}

impl From<AccountStatus> for String {
    fn from(status: AccountStatus) -> Self {
        status.to_string()
    }
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Active => "active",
            Self::Pending => "pending",
            Self::Suspended => "suspended",
            Self::Other(raw) => raw,
        };
        write!(formatter, "{label}")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Collector profile joined with the owning account's status.
pub struct CollectorRecord {
    /// Account identifier of the collector.
    pub id: CollectorId,
    /// Name shown to clients.
    pub display_name: String,
    /// Optional free-text introduction.
    #[serde(default)]
    pub bio: Option<String>,
    /// Latitude in degrees, if the collector has set a location.
    #[serde(default)]
    pub latitude: Option<f64>,
    /// Longitude in degrees, if the collector has set a location.
    #[serde(default)]
    pub longitude: Option<f64>,
    /// Radius the collector is willing to travel.
    #[serde(default)]
    pub service_radius_km: Option<f64>,
    /// Self-reported availability.
    #[serde(default)]
    pub availability: AvailabilityStatus,
    /// Average rating; absent until the collector has been rated.
    #[serde(default)]
    pub rating_avg: Option<f64>,
    /// Waste categories the collector accepts.
    #[serde(default)]
    pub waste_types: BTreeSet<WasteType>,
    /// Status of the collector's account.
    #[serde(default)]
    pub account_status: AccountStatus,
}

impl CollectorRecord {
    /// Both coordinates when the collector has a complete location.
    #[must_use]
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        Some((self.latitude?, self.longitude?))
    }

    /// Whether the record may appear in nearby-collector results.
    #[must_use]
    pub fn is_discoverable(&self) -> bool {
        self.account_status.is_active() && self.coordinates().is_some()
    }

    /// Create a fresh record from a profile update.
    #[must_use]
    pub fn from_profile(id: CollectorId, update: ProfileUpdate, account_status: AccountStatus) -> Self {
        let mut record = Self {
            id,
            display_name: String::new(),
            bio: None,
            latitude: None,
            longitude: None,
            service_radius_km: None,
            availability: AvailabilityStatus::default(),
            rating_avg: None,
            waste_types: BTreeSet::new(),
            account_status,
        };
        record.apply(update);
        record
    }

    /// Overwrite the collector-editable fields, keeping id, rating, and account status.
    pub fn apply(&mut self, update: ProfileUpdate) {
        self.display_name = update.display_name;
        self.bio = update.bio;
        self.latitude = update.latitude;
        self.longitude = update.longitude;
        self.service_radius_km = update.service_radius_km;
        self.waste_types = update.waste_types;
        self.availability = update.availability;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Fields a collector edits on their own profile.
pub struct ProfileUpdate {
    /// Name shown to clients.
    pub display_name: String,
    /// Optional free-text introduction.
    #[serde(default)]
    pub bio: Option<String>,
    /// Latitude in degrees.
    #[serde(default)]
    pub latitude: Option<f64>,
    /// Longitude in degrees.
    #[serde(default)]
    pub longitude: Option<f64>,
    /// Radius the collector is willing to travel.
    #[serde(default)]
    pub service_radius_km: Option<f64>,
    /// Waste categories the collector accepts.
    #[serde(default)]
    pub waste_types: BTreeSet<WasteType>,
    /// Self-reported availability.
    #[serde(default)]
    pub availability: AvailabilityStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
/// Lifecycle of a pickup request.
pub enum RequestStatus {
    /// Waiting for the collector.
    Pending,
    /// Collector agreed to the pickup.
    Accepted,
    /// Collector turned the request down.
    Declined,
    /// Pickup done.
    Completed,
    /// Withdrawn before completion.
    Cancelled,
}

impl RequestStatus {
    /// Whether a request in this state may move to `next`.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        if self.is_terminal() {
            return false;
        }
        matches!(
            (self, next),
            (
                Self::Pending,
                Self::Accepted | Self::Declined | Self::Cancelled
            ) | (Self::Accepted, Self::Completed | Self::Cancelled)
        )
    }

    /// No further transitions are possible.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Declined | Self::Completed | Self::Cancelled)
    }

    /// Parse the lowercase wire form used in query strings.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "accepted" => Some(Self::Accepted),
            "declined" => Some(Self::Declined),
            "completed" => Some(Self::Completed),
            "cancelled" | "canceled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Declined => "declined",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        };
        write!(formatter, "{label}")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Client input for a new pickup request.
pub struct RequestDraft {
    /// Client placing the request.
    pub client_id: ClientId,
    /// Collector the request is addressed to.
    pub collector_id: CollectorId,
    /// Categories to be picked up.
    #[serde(default)]
    pub waste_types: BTreeSet<WasteType>,
    /// Free-text description of the load.
    #[serde(default)]
    pub description: String,
    /// Where to pick up.
    pub pickup_address: String,
    /// Pickup latitude, if the client shared a location.
    #[serde(default)]
    pub latitude: Option<f64>,
    /// Pickup longitude, if the client shared a location.
    #[serde(default)]
    pub longitude: Option<f64>,
    /// Preferred pickup time in the collector's local time.
    #[serde(default)]
    pub desired_pickup_time: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Stored pickup request.
pub struct ServiceRequest {
    /// Identifier assigned by the ledger.
    pub id: RequestId,
    /// Client placing the request.
    pub client_id: ClientId,
    /// Collector the request is addressed to.
    pub collector_id: CollectorId,
    /// Categories to be picked up.
    pub waste_types: BTreeSet<WasteType>,
    /// Free-text description of the load.
    pub description: String,
    /// Where to pick up.
    pub pickup_address: String,
    /// Pickup latitude.
    pub latitude: Option<f64>,
    /// Pickup longitude.
    pub longitude: Option<f64>,
    /// Preferred pickup time.
    pub desired_pickup_time: Option<NaiveDateTime>,
    /// Current lifecycle state.
    pub status: RequestStatus,
    /// When the ledger stored the request.
    pub created_at: DateTime<Utc>,
}

impl ServiceRequest {
    /// Materialize a draft as a new pending request.
    #[must_use]
    pub fn from_draft(id: RequestId, draft: RequestDraft, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            client_id: draft.client_id,
            collector_id: draft.collector_id,
            waste_types: draft.waste_types,
            description: draft.description,
            pickup_address: draft.pickup_address,
            latitude: draft.latitude,
            longitude: draft.longitude,
            desired_pickup_time: draft.desired_pickup_time,
            status: RequestStatus::Pending,
            created_at,
        }
    }
}
