//! Spoken alert composition and throttling.

use std::time::{Duration, Instant};

use crate::zones::ZoneCounts;

/// Minimum gap between two spoken alerts.
pub const DEFAULT_ALERT_INTERVAL: Duration = Duration::from_millis(3000);

/// Alert history carried across frames. Owned by the frame pipeline.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AlertState {
    pub last_spoken_label: Option<String>,
    /// `None` until the first alert; the interval counts as open.
    pub last_alert_timestamp: Option<Instant>,
}

/// Builds alert text and enforces the minimum interval between alerts.
#[derive(Clone, Copy, Debug)]
pub struct AlertThrottler {
    interval: Duration,
}

impl AlertThrottler {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// True when strictly more than `interval` has passed since the last alert.
    pub fn is_open(&self, now: Instant, state: &AlertState) -> bool {
        match state.last_alert_timestamp {
            None => true,
            Some(last) => now.saturating_duration_since(last) > self.interval,
        }
    }

    /// Return an utterance for `counts` if one is due, recording it in `state`.
    ///
    /// Empty counts never emit and leave the timestamp untouched.
    pub fn maybe_announce(
        &self,
        counts: &ZoneCounts,
        now: Instant,
        state: &mut AlertState,
    ) -> Option<String> {
        if !self.is_open(now, state) {
            return None;
        }
        let utterance = compose(counts)?;
        state.last_alert_timestamp = Some(now);
        state.last_spoken_label = Some(utterance.clone());
        Some(utterance)
    }
}

impl Default for AlertThrottler {
    fn default() -> Self {
        Self::new(DEFAULT_ALERT_INTERVAL)
    }
}

/// "Vehicle 2 on left, 1 on right"; `None` when every zone is empty.
pub fn compose(counts: &ZoneCounts) -> Option<String> {
    let mut parts = Vec::with_capacity(3);
    if counts.left > 0 {
        parts.push(format!("{} on left", counts.left));
    }
    if counts.center > 0 {
        parts.push(format!("{} in center", counts.center));
    }
    if counts.right > 0 {
        parts.push(format!("{} on right", counts.right));
    }
    if parts.is_empty() {
        None
    } else {
        Some(format!("Vehicle {}", parts.join(", ")))
    }
}
