use std::sync::Arc;

use anyhow::{anyhow, Result};
use image::RgbImage;

use crate::detect::backend::{Detector, DetectorFactory, DetectorOptions};
use crate::detect::result::Detection;

/// Deterministic detector that replays a fixed script of per-frame results.
///
/// Each `detect` call returns the next script entry (cycling), filtered by the
/// configured score threshold and capped at `max_results`, best score first.
pub struct ScriptedDetector {
    script: Arc<Vec<Vec<Detection>>>,
    cursor: usize,
    options: DetectorOptions,
}

impl ScriptedDetector {
    pub fn new(script: Vec<Vec<Detection>>, options: DetectorOptions) -> Self {
        Self {
            script: Arc::new(script),
            cursor: 0,
            options,
        }
    }

    pub fn options(&self) -> &DetectorOptions {
        &self.options
    }
}

impl Detector for ScriptedDetector {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn reconfigure(&mut self, options: &DetectorOptions) -> Result<()> {
        if !(0.0..=1.0).contains(&options.threshold) {
            return Err(anyhow!(
                "score threshold {} outside [0, 1]",
                options.threshold
            ));
        }
        self.options = options.clone();
        Ok(())
    }

    fn detect(&mut self, _image: &RgbImage) -> Result<Vec<Detection>> {
        if self.script.is_empty() {
            return Ok(Vec::new());
        }
        let frame = &self.script[self.cursor % self.script.len()];
        self.cursor = self.cursor.wrapping_add(1);

        let mut kept: Vec<Detection> = frame
            .iter()
            .filter(|det| det.score() >= self.options.threshold)
            .cloned()
            .collect();
        kept.sort_by(|a, b| b.score().total_cmp(&a.score()));
        kept.truncate(self.options.max_results);
        Ok(kept)
    }
}

/// Factory for `ScriptedDetector`; every instance replays the same script.
pub struct ScriptedFactory {
    script: Arc<Vec<Vec<Detection>>>,
}

impl ScriptedFactory {
    pub fn new(script: Vec<Vec<Detection>>) -> Self {
        Self {
            script: Arc::new(script),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }
}

impl DetectorFactory for ScriptedFactory {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn build(&self, options: &DetectorOptions) -> Result<Box<dyn Detector>> {
        let mut detector = ScriptedDetector {
            script: self.script.clone(),
            cursor: 0,
            options: options.clone(),
        };
        detector.reconfigure(options)?;
        Ok(Box::new(detector))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::BoundingBox;

    fn frame() -> RgbImage {
        RgbImage::new(4, 4)
    }

    #[test]
    fn scripted_detector_filters_by_threshold_and_caps_results() {
        let script = vec![vec![
            Detection::labeled(BoundingBox::new(0.0, 0.0, 10.0, 10.0), "car", 0.35),
            Detection::labeled(BoundingBox::new(0.0, 0.0, 10.0, 10.0), "bus", 0.9),
            Detection::labeled(BoundingBox::new(0.0, 0.0, 10.0, 10.0), "truck", 0.6),
        ]];
        let options = DetectorOptions {
            max_results: 1,
            ..DetectorOptions::default()
        };
        let mut detector = ScriptedDetector::new(script, options.clone());

        let r1 = detector.detect(&frame()).unwrap();
        assert_eq!(r1.len(), 1);
        assert_eq!(r1[0].label(), Some("bus"));

        detector
            .reconfigure(&DetectorOptions {
                threshold: 0.3,
                max_results: 5,
                ..options
            })
            .unwrap();
        let r2 = detector.detect(&frame()).unwrap();
        let labels: Vec<_> = r2.iter().filter_map(|d| d.label()).collect();
        assert_eq!(labels, vec!["bus", "truck", "car"]);
    }

    #[test]
    fn scripted_detector_rejects_out_of_range_threshold() {
        let mut detector = ScriptedDetector::new(vec![], DetectorOptions::default());
        let bad = DetectorOptions::default().with_threshold(1.5);
        assert!(detector.reconfigure(&bad).is_err());
        assert_eq!(detector.options().threshold, 0.5);
        assert!(detector.detect(&frame()).unwrap().is_empty());
    }
}
