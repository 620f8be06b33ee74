//! De-duplication of per-character facility capture and defence reports.
//!
//! Every participant present at a capture receives their own
//! `PlayerFacilityCapture`, so one real capture arrives as a burst of N
//! reports. [`FacilityTracker`] folds such a burst into a single logical
//! record and keeps the chronological facility feed.

use chrono::{DateTime, TimeDelta, Utc};

use crate::domain::{FacilityAction, FacilityData, FacilityFeedEntry, FacilityId, MapRegion};

/// How a facility report was classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureOutcome {
    /// First report for this facility since the last different one.
    New,
    /// Same facility again after the recapture window elapsed.
    Recaptured,
    /// Another participant's report of an event already recorded.
    Contribution,
}

impl CaptureOutcome {
    /// Whether the report started a new logical event (feed line, counter,
    /// notice).
    #[must_use]
    pub const fn is_logical(self) -> bool {
        matches!(self, Self::New | Self::Recaptured)
    }
}

/// Last captured/defended facility and the facility feed of one Operation.
#[derive(Debug, Clone)]
pub struct FacilityTracker {
    window: TimeDelta,
    last_captured: Option<FacilityData>,
    last_defended: Option<FacilityData>,
    feed: Vec<FacilityFeedEntry>,
}

impl FacilityTracker {
    /// Creates a tracker with the given recapture window.
    #[must_use]
    pub const fn new(window: TimeDelta) -> Self {
        Self {
            window,
            last_captured: None,
            last_defended: None,
            feed: Vec::new(),
        }
    }

    /// Records a capture report.
    pub fn on_facility_capture(&mut self, facility_id: FacilityId, at: DateTime<Utc>) -> CaptureOutcome {
        self.record(FacilityAction::Captured, facility_id, at)
    }

    /// Records a defence report. Same window rules as captures.
    pub fn on_facility_defend(&mut self, facility_id: FacilityId, at: DateTime<Utc>) -> CaptureOutcome {
        self.record(FacilityAction::Defended, facility_id, at)
    }

    /// Attaches resolved region metadata to every record of `facility_id`
    /// still missing it.
    pub fn resolve_region(&mut self, facility_id: FacilityId, region: &MapRegion) {
        for entry in self
            .feed
            .iter_mut()
            .filter(|e| e.facility_id == facility_id && e.region.is_none())
        {
            entry.region = Some(region.clone());
        }
        for data in [&mut self.last_captured, &mut self.last_defended]
            .into_iter()
            .flatten()
        {
            if data.facility_id == facility_id && data.region.is_none() {
                data.region = Some(region.clone());
            }
        }
    }

    /// Facility feed, oldest first.
    #[must_use]
    pub fn feed(&self) -> &[FacilityFeedEntry] {
        &self.feed
    }

    /// Rendered facility feed lines, oldest first.
    #[must_use]
    pub fn feed_lines(&self) -> Vec<String> {
        self.feed.iter().map(FacilityFeedEntry::line).collect()
    }

    /// Most recent logical capture.
    #[must_use]
    pub const fn last_captured(&self) -> Option<&FacilityData> {
        self.last_captured.as_ref()
    }

    /// Most recent logical defence.
    #[must_use]
    pub const fn last_defended(&self) -> Option<&FacilityData> {
        self.last_defended.as_ref()
    }

    fn record(
        &mut self,
        action: FacilityAction,
        facility_id: FacilityId,
        at: DateTime<Utc>,
    ) -> CaptureOutcome {
        let window = self.window;
        let slot = match action {
            FacilityAction::Captured => &mut self.last_captured,
            FacilityAction::Defended => &mut self.last_defended,
        };

        let outcome = match slot.as_mut() {
            None => CaptureOutcome::New,
            Some(last) if last.facility_id != facility_id => CaptureOutcome::New,
            // Out-of-order reports have negative elapsed time and stay
            // contributions.
            Some(last) if at.signed_duration_since(last.timestamp) > window => {
                CaptureOutcome::Recaptured
            }
            Some(last) => {
                last.participants = last.participants.saturating_add(1);
                tracing::debug!(
                    %facility_id,
                    reports = last.participants,
                    ?action,
                    "folded duplicate facility report"
                );
                CaptureOutcome::Contribution
            }
        };

        if outcome.is_logical() {
            *slot = Some(FacilityData::new(facility_id, at));
            self.feed.push(FacilityFeedEntry {
                facility_id,
                action,
                timestamp: at,
                region: None,
            });
        }
        outcome
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn t0() -> DateTime<Utc> {
        let Some(at) = DateTime::from_timestamp(1_714_594_440, 0) else {
            panic!("valid timestamp");
        };
        at
    }

    fn tracker() -> FacilityTracker {
        FacilityTracker::new(TimeDelta::minutes(15))
    }

    #[test]
    fn burst_of_reports_yields_one_capture() {
        let mut tracker = tracker();
        let facility = FacilityId(222_280);
        let mut logical = 0;
        for offset in 0..12 {
            if tracker
                .on_facility_capture(facility, t0() + TimeDelta::seconds(offset))
                .is_logical()
            {
                logical += 1;
            }
        }
        assert_eq!(logical, 1);
        assert_eq!(tracker.feed().len(), 1);
        let Some(last) = tracker.last_captured() else {
            panic!("capture not recorded");
        };
        assert_eq!(last.participants, 12);
    }

    #[test]
    fn same_facility_after_window_is_recapture() {
        let mut tracker = tracker();
        let facility = FacilityId(222_280);
        assert_eq!(tracker.on_facility_capture(facility, t0()), CaptureOutcome::New);
        assert_eq!(
            tracker.on_facility_capture(facility, t0() + TimeDelta::minutes(16)),
            CaptureOutcome::Recaptured
        );
        assert_eq!(tracker.feed().len(), 2);
    }

    #[test]
    fn exactly_window_apart_is_still_a_contribution() {
        let mut tracker = tracker();
        let facility = FacilityId(1);
        tracker.on_facility_capture(facility, t0());
        assert_eq!(
            tracker.on_facility_capture(facility, t0() + TimeDelta::minutes(15)),
            CaptureOutcome::Contribution
        );
    }

    #[test]
    fn out_of_order_report_is_a_contribution() {
        let mut tracker = tracker();
        let facility = FacilityId(1);
        tracker.on_facility_capture(facility, t0());
        assert_eq!(
            tracker.on_facility_capture(facility, t0() - TimeDelta::minutes(30)),
            CaptureOutcome::Contribution
        );
    }

    #[test]
    fn different_facility_is_new() {
        let mut tracker = tracker();
        tracker.on_facility_capture(FacilityId(1), t0());
        assert_eq!(
            tracker.on_facility_capture(FacilityId(2), t0() + TimeDelta::seconds(5)),
            CaptureOutcome::New
        );
        assert_eq!(
            tracker.on_facility_capture(FacilityId(1), t0() + TimeDelta::seconds(10)),
            CaptureOutcome::New
        );
        assert_eq!(tracker.feed().len(), 3);
    }

    #[test]
    fn defends_are_tracked_separately() {
        let mut tracker = tracker();
        let facility = FacilityId(7);
        tracker.on_facility_capture(facility, t0());
        assert_eq!(
            tracker.on_facility_defend(facility, t0() + TimeDelta::seconds(1)),
            CaptureOutcome::New
        );
        assert!(tracker.last_defended().is_some());
        let actions: Vec<FacilityAction> = tracker.feed().iter().map(|e| e.action).collect();
        assert_eq!(actions, vec![FacilityAction::Captured, FacilityAction::Defended]);
    }

    #[test]
    fn resolved_region_fills_feed_and_last_records() {
        let mut tracker = tracker();
        let facility = FacilityId(222_280);
        tracker.on_facility_capture(facility, t0());
        tracker.on_facility_capture(FacilityId(9), t0());

        let region = MapRegion {
            facility_name: "The Crown".to_string(),
            facility_type: "Large Outpost".to_string(),
        };
        tracker.resolve_region(facility, &region);

        let lines = tracker.feed_lines();
        assert!(lines.first().is_some_and(|l| l.ends_with("The Crown | Large Outpost")));
        assert!(lines.get(1).is_some_and(|l| l.ends_with("Facility #9")));
        assert!(tracker.last_captured().is_some_and(|d| d.region.is_none()));
    }
}
