//! Wire shapes of the HTTP API.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use wasteworth_core::{
    AvailabilityStatus, CollectorId, ProximityResult, RequestStatus, WasteType,
};

/// One entry of the nearby-collectors list rendered on the client map.
///
/// `rating_avg` is `null` for collectors that have not been rated.
#[derive(Debug, Serialize)]
pub(crate) struct NearbyCollector {
    pub user_id: CollectorId,
    pub display_name: String,
    pub waste_types: BTreeSet<WasteType>,
    pub latitude: f64,
    pub longitude: f64,
    pub availability_status: AvailabilityStatus,
    pub rating_avg: Option<f64>,
    pub distance: f64,
}

impl From<ProximityResult> for NearbyCollector {
    fn from(result: ProximityResult) -> Self {
        let collector = result.collector;
        // ranked results always carry both coordinates
        let (latitude, longitude) = collector.coordinates().unwrap_or_default();

        Self {
            user_id: collector.id,
            display_name: collector.display_name,
            waste_types: collector.waste_types,
            latitude,
            longitude,
            availability_status: collector.availability,
            rating_avg: collector.rating_avg,
            distance: result.distance_km,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct StatusUpdate {
    pub status: RequestStatus,
}
