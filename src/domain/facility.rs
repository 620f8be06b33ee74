//! Facility capture/defence records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::FacilityId;

/// Resolved map region metadata for a facility.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct MapRegion {
    /// Facility name, e.g. `"The Crown"`.
    pub facility_name: String,
    /// Facility type, e.g. `"Large Outpost"`.
    pub facility_type: String,
}

/// Whether a facility event was a capture or a defence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum FacilityAction {
    /// Facility was taken.
    Captured,
    /// Facility was held.
    Defended,
}

/// One logical capture or defence, collapsed from per-character reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct FacilityData {
    /// Facility ID.
    pub facility_id: FacilityId,
    /// Time of the first report.
    pub timestamp: DateTime<Utc>,
    /// Region metadata, once resolved.
    pub region: Option<MapRegion>,
    /// Number of participant reports folded into this record.
    pub participants: u32,
}

impl FacilityData {
    /// New record with a single contributing report.
    #[must_use]
    pub const fn new(facility_id: FacilityId, timestamp: DateTime<Utc>) -> Self {
        Self {
            facility_id,
            timestamp,
            region: None,
            participants: 1,
        }
    }
}

/// Entry of the chronological facility feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct FacilityFeedEntry {
    /// Facility ID.
    pub facility_id: FacilityId,
    /// Capture or defence.
    pub action: FacilityAction,
    /// Time of the event.
    pub timestamp: DateTime<Utc>,
    /// Region metadata, once resolved.
    pub region: Option<MapRegion>,
}

impl FacilityFeedEntry {
    /// Renders the display line, e.g. `"20:14 UTC | Captured | The Crown | Large Outpost"`.
    #[must_use]
    pub fn line(&self) -> String {
        let action = match self.action {
            FacilityAction::Captured => "Captured",
            FacilityAction::Defended => "Defended",
        };
        let time = self.timestamp.format("%H:%M UTC");
        match &self.region {
            Some(region) => format!(
                "{time} | {action} | {} | {}",
                region.facility_name, region.facility_type
            ),
            None => format!("{time} | {action} | Facility #{}", self.facility_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn line_falls_back_to_facility_id() {
        let Some(at) = Utc.with_ymd_and_hms(2024, 5, 1, 20, 14, 0).single() else {
            return;
        };
        let mut entry = FacilityFeedEntry {
            facility_id: FacilityId(222_280),
            action: FacilityAction::Captured,
            timestamp: at,
            region: None,
        };
        assert_eq!(entry.line(), "20:14 UTC | Captured | Facility #222280");

        entry.region = Some(MapRegion {
            facility_name: "The Crown".to_string(),
            facility_type: "Large Outpost".to_string(),
        });
        assert_eq!(
            entry.line(),
            "20:14 UTC | Captured | The Crown | Large Outpost"
        );
    }
}
