use crate::domain::model::ShipmentTracking;
use chrono::{DateTime, Duration, Utc};

/// Freshness of a (waybill, courier) pair as seen at request time.
///
/// `Fresh` decays into `Stale` by the clock alone; `Terminal` is absorbing and
/// only entered through a provider fetch that reported a terminal status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackingState {
    Unknown,
    Fresh,
    Stale,
    Terminal,
}

impl TrackingState {
    pub fn of(
        snapshot: Option<&ShipmentTracking>,
        now: DateTime<Utc>,
        refresh_window: Duration,
    ) -> Self {
        match snapshot {
            None => TrackingState::Unknown,
            Some(s) if s.is_terminal() => TrackingState::Terminal,
            Some(s) if now - s.last_tracked_at < refresh_window => TrackingState::Fresh,
            Some(_) => TrackingState::Stale,
        }
    }

    /// Whether the provider must be asked before answering.
    pub fn needs_refresh(self) -> bool {
        matches!(self, TrackingState::Unknown | TrackingState::Stale)
    }
}

/// Time left before a non-terminal snapshot turns stale.
pub fn remaining_freshness(
    snapshot: &ShipmentTracking,
    now: DateTime<Utc>,
    refresh_window: Duration,
) -> Duration {
    let left = refresh_window - (now - snapshot.last_tracked_at);
    if left < Duration::zero() {
        Duration::zero()
    } else {
        left
    }
}
