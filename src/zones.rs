//! Left/center/right zone occupancy.

use crate::detect::Detection;

/// Labels counted by default.
pub const VEHICLE_LABELS: &[&str] = &["car", "truck", "bus", "motorcycle"];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Zone {
    Left,
    Center,
    Right,
}

impl Zone {
    /// Zone of a horizontal position in an image `width` pixels wide.
    ///
    /// Boundaries sit at `width/3` and `2*width/3`; each boundary belongs to
    /// the zone on its right.
    pub fn for_center_x(center_x: f32, width: u32) -> Zone {
        let third = width as f32 / 3.0;
        if center_x < third {
            Zone::Left
        } else if center_x < 2.0 * third {
            Zone::Center
        } else {
            Zone::Right
        }
    }
}

/// Per-frame vehicle counts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ZoneCounts {
    pub left: u32,
    pub center: u32,
    pub right: u32,
}

impl ZoneCounts {
    pub fn get(&self, zone: Zone) -> u32 {
        match zone {
            Zone::Left => self.left,
            Zone::Center => self.center,
            Zone::Right => self.right,
        }
    }

    pub fn increment(&mut self, zone: Zone) {
        match zone {
            Zone::Left => self.left += 1,
            Zone::Center => self.center += 1,
            Zone::Right => self.right += 1,
        }
    }

    pub fn total(&self) -> u32 {
        self.left + self.center + self.right
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

/// Case-insensitive set of labels that count toward zone occupancy.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LabelFilter {
    labels: Vec<String>,
}

impl LabelFilter {
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            labels: labels
                .into_iter()
                .map(|l| l.as_ref().trim().to_lowercase())
                .filter(|l| !l.is_empty())
                .collect(),
        }
    }

    pub fn vehicles() -> Self {
        Self::new(VEHICLE_LABELS)
    }

    pub fn matches(&self, label: &str) -> bool {
        let label = label.to_lowercase();
        self.labels.iter().any(|l| *l == label)
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }
}

impl Default for LabelFilter {
    fn default() -> Self {
        Self::vehicles()
    }
}

/// Count detections whose top-ranked label passes `filter`, by zone.
pub fn classify(detections: &[Detection], image_width: u32, filter: &LabelFilter) -> ZoneCounts {
    let mut counts = ZoneCounts::default();
    for det in detections {
        let Some(label) = det.label() else {
            continue;
        };
        if !filter.matches(label) {
            continue;
        }
        counts.increment(Zone::for_center_x(det.bounding_box.center_x(), image_width));
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::{BoundingBox, Category};

    fn det(label: &str, left: f32, right: f32) -> Detection {
        Detection::labeled(BoundingBox::new(left, 0.0, right, 10.0), label, 0.8)
    }

    #[test]
    fn car_on_the_left() {
        let counts = classify(&[det("car", 10.0, 50.0)], 300, &LabelFilter::vehicles());
        assert_eq!(
            counts,
            ZoneCounts {
                left: 1,
                center: 0,
                right: 0
            }
        );
    }

    #[test]
    fn non_vehicles_are_ignored() {
        let detections = [det("car", 130.0, 170.0), det("person", 230.0, 270.0)];
        let counts = classify(&detections, 300, &LabelFilter::vehicles());
        assert_eq!(counts.center, 1);
        assert_eq!(counts.total(), 1);
    }

    #[test]
    fn only_the_top_category_counts() {
        let d = Detection::new(
            BoundingBox::new(0.0, 0.0, 10.0, 10.0),
            vec![Category::new("person", 0.6), Category::new("car", 0.4)],
        );
        let unlabeled = Detection::new(BoundingBox::new(0.0, 0.0, 10.0, 10.0), vec![]);
        assert!(classify(&[d, unlabeled], 300, &LabelFilter::vehicles()).is_empty());
    }

    #[test]
    fn labels_match_case_insensitively() {
        let counts = classify(
            &[det("TRUCK", 280.0, 300.0), det("Bus", 0.0, 2.0)],
            300,
            &LabelFilter::vehicles(),
        );
        assert_eq!((counts.left, counts.center, counts.right), (1, 0, 1));
    }

    #[test]
    fn boundaries_belong_to_the_right_hand_zone() {
        assert_eq!(Zone::for_center_x(99.999, 300), Zone::Left);
        assert_eq!(Zone::for_center_x(100.0, 300), Zone::Center);
        assert_eq!(Zone::for_center_x(199.999, 300), Zone::Center);
        assert_eq!(Zone::for_center_x(200.0, 300), Zone::Right);
    }

    #[test]
    fn every_column_lands_in_exactly_one_zone() {
        for width in [1u32, 2, 3, 4, 5, 7, 100, 301, 640] {
            let mut counts = ZoneCounts::default();
            for x in 0..width {
                counts.increment(Zone::for_center_x(x as f32, width));
            }
            assert_eq!(counts.total(), width);
            // Zones are contiguous left-to-right.
            let zones: Vec<Zone> = (0..width)
                .map(|x| Zone::for_center_x(x as f32, width))
                .collect();
            assert!(zones.windows(2).all(|w| zone_rank(w[0]) <= zone_rank(w[1])));
        }
    }

    fn zone_rank(zone: Zone) -> u8 {
        match zone {
            Zone::Left => 0,
            Zone::Center => 1,
            Zone::Right => 2,
        }
    }

    #[test]
    fn custom_filter_trims_and_lowercases() {
        let filter = LabelFilter::new([" Person ", "", "Dog"]);
        assert_eq!(filter.labels(), &["person".to_string(), "dog".to_string()]);
        assert!(filter.matches("PERSON"));
        assert!(!filter.matches("car"));
    }
}
