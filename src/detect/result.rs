/// Axis-aligned box in source-image pixel coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BoundingBox {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl BoundingBox {
    pub fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Horizontal midpoint, used for zone assignment and spread.
    pub fn center_x(&self) -> f32 {
        (self.left + self.right) / 2.0
    }

    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }

    pub fn scaled(&self, factor: f32) -> Self {
        Self {
            left: self.left * factor,
            top: self.top * factor,
            right: self.right * factor,
            bottom: self.bottom * factor,
        }
    }
}

/// One (label, score) guess for a detection.
#[derive(Clone, Debug, PartialEq)]
pub struct Category {
    pub label: String,
    pub score: f32,
}

impl Category {
    pub fn new(label: impl Into<String>, score: f32) -> Self {
        Self {
            label: label.into(),
            score,
        }
    }
}

/// A single detector output. Categories are ranked best-first.
#[derive(Clone, Debug, PartialEq)]
pub struct Detection {
    pub bounding_box: BoundingBox,
    pub categories: Vec<Category>,
}

impl Detection {
    pub fn new(bounding_box: BoundingBox, categories: Vec<Category>) -> Self {
        Self {
            bounding_box,
            categories,
        }
    }

    /// Shorthand for a detection with a single category.
    pub fn labeled(bounding_box: BoundingBox, label: &str, score: f32) -> Self {
        Self::new(bounding_box, vec![Category::new(label, score)])
    }

    pub fn top_category(&self) -> Option<&Category> {
        self.categories.first()
    }

    pub fn label(&self) -> Option<&str> {
        self.top_category().map(|c| c.label.as_str())
    }

    pub fn score(&self) -> f32 {
        self.top_category().map(|c| c.score).unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn top_category_drives_label_and_score() {
        let det = Detection::new(
            BoundingBox::new(10.0, 0.0, 50.0, 20.0),
            vec![Category::new("car", 0.8), Category::new("truck", 0.1)],
        );
        assert_eq!(det.label(), Some("car"));
        assert_eq!(det.score(), 0.8);
        assert_eq!(det.bounding_box.center_x(), 30.0);

        let empty = Detection::new(BoundingBox::default(), vec![]);
        assert_eq!(empty.label(), None);
        assert_eq!(empty.score(), 0.0);
    }
}
