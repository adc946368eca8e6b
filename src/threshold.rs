//! Detection threshold control.
//!
//! Two writers propose thresholds: the brightness tier (discrete, may force a
//! detector reconfiguration) and detection spread (continuous, advisory). Both
//! are pure functions producing a `ThresholdProposal`; the frame pipeline
//! decides which one is applied.

use crate::detect::Detection;

pub const MIN_THRESHOLD: f32 = 0.1;
pub const MAX_THRESHOLD: f32 = 0.9;

const LOW_TIER_CEILING: f64 = 80.0;
const MID_TIER_CEILING: f64 = 150.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BrightnessTier {
    Low,
    Mid,
    High,
}

impl BrightnessTier {
    pub fn from_luminance(avg_luminance: f64) -> Self {
        if avg_luminance < LOW_TIER_CEILING {
            BrightnessTier::Low
        } else if avg_luminance < MID_TIER_CEILING {
            BrightnessTier::Mid
        } else {
            BrightnessTier::High
        }
    }

    pub fn threshold(&self) -> f32 {
        match self {
            BrightnessTier::Low => 0.3,
            BrightnessTier::Mid => 0.5,
            BrightnessTier::High => 0.7,
        }
    }

    /// Tier whose threshold matches `threshold`, if any.
    pub fn for_threshold(threshold: f32) -> Option<Self> {
        [BrightnessTier::Low, BrightnessTier::Mid, BrightnessTier::High]
            .into_iter()
            .find(|tier| tier.threshold() == threshold)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProposalSource {
    Brightness,
    Spread,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ThresholdProposal {
    pub source: ProposalSource,
    pub value: f32,
}

/// Threshold carried across frames. Owned by the frame pipeline.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ThresholdState {
    current_threshold: f32,
    last_applied_tier: BrightnessTier,
}

impl ThresholdState {
    /// Start from `initial`, clamped into `[MIN_THRESHOLD, MAX_THRESHOLD]`.
    pub fn new(initial: f32) -> Self {
        let current_threshold = clamp_threshold(initial);
        Self {
            current_threshold,
            last_applied_tier: BrightnessTier::for_threshold(current_threshold)
                .unwrap_or(BrightnessTier::Mid),
        }
    }

    pub fn current_threshold(&self) -> f32 {
        self.current_threshold
    }

    pub fn last_applied_tier(&self) -> BrightnessTier {
        self.last_applied_tier
    }

    /// Write a proposal into the state.
    pub fn apply(&mut self, proposal: ThresholdProposal) {
        self.current_threshold = clamp_threshold(proposal.value);
        if proposal.source == ProposalSource::Brightness {
            if let Some(tier) = BrightnessTier::for_threshold(self.current_threshold) {
                self.last_applied_tier = tier;
            }
        }
    }
}

impl Default for ThresholdState {
    fn default() -> Self {
        Self::new(BrightnessTier::Mid.threshold())
    }
}

pub fn clamp_threshold(value: f32) -> f32 {
    if value.is_nan() {
        return BrightnessTier::Mid.threshold();
    }
    value.clamp(MIN_THRESHOLD, MAX_THRESHOLD)
}

/// Proposal from the brightness tier of `avg_luminance`.
pub fn brightness_proposal(avg_luminance: f64) -> ThresholdProposal {
    ThresholdProposal {
        source: ProposalSource::Brightness,
        value: BrightnessTier::from_luminance(avg_luminance).threshold(),
    }
}

/// Apply the brightness tier to `state`.
///
/// Returns the new threshold and whether it differs from the previous one. A
/// change means the detector must be reconfigured before the next inference.
pub fn update_from_brightness(avg_luminance: f64, state: &mut ThresholdState) -> (f32, bool) {
    let proposal = brightness_proposal(avg_luminance);
    let changed = proposal.value != state.current_threshold;
    if changed {
        state.apply(proposal);
    }
    (state.current_threshold, changed)
}

/// Proposal from the horizontal spread of detection centers.
///
/// Widely spread detections lower the threshold; a tight cluster raises it.
/// Returns `None` for an empty detection set.
pub fn spread_proposal(detections: &[Detection], image_width: u32) -> Option<ThresholdProposal> {
    let mut centers = detections.iter().map(|d| d.bounding_box.center_x());
    let first = centers.next()?;
    let (min, max) = centers.fold((first, first), |(lo, hi), x| (lo.min(x), hi.max(x)));

    let range = (max - min).max(1.0);
    let norm = range / image_width.max(1) as f32;
    Some(ThresholdProposal {
        source: ProposalSource::Spread,
        value: clamp_threshold(0.3 + 0.4 * (1.0 - norm)),
    })
}

/// Spread-based threshold for the next frame, or `prior` when there are no
/// detections.
pub fn update_from_spread(detections: &[Detection], image_width: u32, prior: f32) -> f32 {
    spread_proposal(detections, image_width)
        .map(|p| p.value)
        .unwrap_or(prior)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::BoundingBox;

    fn at(center_x: f32) -> Detection {
        Detection::labeled(
            BoundingBox::new(center_x - 5.0, 0.0, center_x + 5.0, 10.0),
            "car",
            0.9,
        )
    }

    #[test]
    fn tiers_are_a_step_function() {
        assert_eq!(brightness_proposal(0.0).value, 0.3);
        assert_eq!(brightness_proposal(79.9).value, 0.3);
        assert_eq!(brightness_proposal(80.0).value, 0.5);
        assert_eq!(brightness_proposal(149.99).value, 0.5);
        assert_eq!(brightness_proposal(150.0).value, 0.7);
        assert_eq!(brightness_proposal(255.0).value, 0.7);
    }

    #[test]
    fn brightness_change_is_reported_once() {
        let mut state = ThresholdState::new(0.5);
        assert_eq!(update_from_brightness(79.9, &mut state), (0.3, true));
        assert_eq!(state.last_applied_tier(), BrightnessTier::Low);
        assert_eq!(update_from_brightness(10.0, &mut state), (0.3, false));

        let mut state = ThresholdState::new(0.5);
        assert_eq!(update_from_brightness(80.0, &mut state), (0.5, false));
        assert_eq!(state.current_threshold(), 0.5);
    }

    #[test]
    fn brightness_overrides_spread_written_value() {
        let mut state = ThresholdState::new(0.5);
        state.apply(spread_proposal(&[at(10.0), at(290.0)], 300).unwrap());
        assert!(state.current_threshold() < 0.5);
        assert_eq!(update_from_brightness(100.0, &mut state), (0.5, true));
    }

    #[test]
    fn spread_of_wide_detections() {
        let value = update_from_spread(&[at(10.0), at(290.0)], 300, 0.5);
        let expected = 0.3 + 0.4 * (1.0 - 280.0 / 300.0);
        assert!((value - expected).abs() < 1e-5);
        assert!((value - 0.3267).abs() < 1e-3);
    }

    #[test]
    fn spread_keeps_prior_when_empty() {
        assert_eq!(update_from_spread(&[], 300, 0.42), 0.42);
        assert!(spread_proposal(&[], 300).is_none());
    }

    #[test]
    fn spread_single_detection_uses_unit_range() {
        let value = update_from_spread(&[at(150.0)], 300, 0.5);
        let expected = 0.3 + 0.4 * (1.0 - 1.0 / 300.0);
        assert!((value - expected).abs() < 1e-5);
    }

    #[test]
    fn spread_stays_within_bounds() {
        // Centers outside the frame can push norm past 1.
        let wide = update_from_spread(&[at(-1000.0), at(2000.0)], 300, 0.5);
        assert_eq!(wide, MIN_THRESHOLD);
        for width in [1u32, 2, 3, 300, 4096] {
            for spread in [0.0f32, 0.5, 1.0, 10.0, 299.0] {
                let v = update_from_spread(&[at(0.0), at(spread)], width, 0.5);
                assert!((MIN_THRESHOLD..=MAX_THRESHOLD).contains(&v), "{v}");
            }
        }
    }

    #[test]
    fn state_clamps_initial_threshold() {
        assert_eq!(ThresholdState::new(0.0).current_threshold(), MIN_THRESHOLD);
        assert_eq!(ThresholdState::new(1.0).current_threshold(), MAX_THRESHOLD);
        assert_eq!(ThresholdState::new(f32::NAN).current_threshold(), 0.5);
        assert_eq!(ThresholdState::default().last_applied_tier(), BrightnessTier::Mid);
    }
}
