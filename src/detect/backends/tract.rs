#![cfg(feature = "backend-tract")]

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use image::imageops::{self, FilterType};
use image::RgbImage;
use tract_onnx::prelude::*;

use crate::detect::backend::{Detector, DetectorFactory, DetectorOptions};
use crate::detect::result::{BoundingBox, Category, Detection};

type Plan = SimplePlan<TypedFact, Box<dyn TypedOp>>;

/// COCO class names, indexed by the model's class id.
const COCO_LABELS: [&str; 80] = [
    "person", "bicycle", "car", "motorcycle", "airplane", "bus", "train", "truck", "boat",
    "traffic light", "fire hydrant", "stop sign", "parking meter", "bench", "bird", "cat", "dog",
    "horse", "sheep", "cow", "elephant", "bear", "zebra", "giraffe", "backpack", "umbrella",
    "handbag", "tie", "suitcase", "frisbee", "skis", "snowboard", "sports ball", "kite",
    "baseball bat", "baseball glove", "skateboard", "surfboard", "tennis racket", "bottle",
    "wine glass", "cup", "fork", "knife", "spoon", "bowl", "banana", "apple", "sandwich",
    "orange", "broccoli", "carrot", "hot dog", "pizza", "donut", "cake", "chair", "couch",
    "potted plant", "bed", "dining table", "toilet", "tv", "laptop", "mouse", "remote",
    "keyboard", "cell phone", "microwave", "oven", "toaster", "sink", "refrigerator", "book",
    "clock", "vase", "scissors", "teddy bear", "hair drier", "toothbrush",
];

/// Tract-based detector for SSD-style ONNX models.
///
/// The model takes a `1x3xSxS` f32 RGB tensor in `[0, 1]` and returns
/// post-processed outputs: boxes `[1, N, 4]` as normalized
/// `(ymin, xmin, ymax, xmax)`, class ids `[1, N]` and scores `[1, N]`.
/// Inference runs on the CPU; delegates other than the default are ignored.
pub struct TractDetector {
    plan: Plan,
    model_path: PathBuf,
    options: DetectorOptions,
}

impl TractDetector {
    pub fn load<P: AsRef<Path>>(model_path: P, options: &DetectorOptions) -> Result<Self> {
        let model_path = model_path.as_ref().to_path_buf();
        let plan = load_plan(&model_path, options.model.input_size())?;
        Ok(Self {
            plan,
            model_path,
            options: options.clone(),
        })
    }

    fn build_input(&self, image: &RgbImage) -> Tensor {
        let size = self.options.model.input_size();
        let resized = imageops::resize(image, size, size, FilterType::Triangle);
        let size = size as usize;
        tract_ndarray::Array4::from_shape_fn((1, 3, size, size), |(_, channel, y, x)| {
            resized.get_pixel(x as u32, y as u32)[channel] as f32 / 255.0
        })
        .into_tensor()
    }

    fn decode(&self, outputs: TVec<TValue>, width: u32, height: u32) -> Result<Vec<Detection>> {
        if outputs.len() < 3 {
            return Err(anyhow!(
                "model produced {} outputs, expected boxes/classes/scores",
                outputs.len()
            ));
        }
        let boxes = outputs[0]
            .to_array_view::<f32>()
            .context("box tensor was not f32")?;
        let classes = outputs[1]
            .to_array_view::<f32>()
            .context("class tensor was not f32")?;
        let scores = outputs[2]
            .to_array_view::<f32>()
            .context("score tensor was not f32")?;

        let boxes: Vec<f32> = boxes.iter().copied().collect();
        let classes: Vec<f32> = classes.iter().copied().collect();
        let scores: Vec<f32> = scores.iter().copied().collect();
        let count = scores.len().min(classes.len()).min(boxes.len() / 4);

        let (w, h) = (width as f32, height as f32);
        let mut detections = Vec::new();
        for i in 0..count {
            let score = scores[i];
            if !score.is_finite() || score < self.options.threshold {
                continue;
            }
            let label = COCO_LABELS
                .get(classes[i].max(0.0) as usize)
                .copied()
                .unwrap_or("unknown");
            let b = &boxes[i * 4..i * 4 + 4];
            let bbox = BoundingBox::new(
                b[1].clamp(0.0, 1.0) * w,
                b[0].clamp(0.0, 1.0) * h,
                b[3].clamp(0.0, 1.0) * w,
                b[2].clamp(0.0, 1.0) * h,
            );
            detections.push(Detection::new(bbox, vec![Category::new(label, score)]));
        }
        detections.sort_by(|a, b| b.score().total_cmp(&a.score()));
        detections.truncate(self.options.max_results);
        Ok(detections)
    }
}

impl Detector for TractDetector {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn reconfigure(&mut self, options: &DetectorOptions) -> Result<()> {
        if options.model != self.options.model {
            self.plan = load_plan(&self.model_path, options.model.input_size())?;
        }
        self.options = options.clone();
        Ok(())
    }

    fn detect(&mut self, image: &RgbImage) -> Result<Vec<Detection>> {
        let input = self.build_input(image);
        let outputs = self
            .plan
            .run(tvec!(input.into()))
            .context("ONNX inference failed")?;
        self.decode(outputs, image.width(), image.height())
    }
}

fn load_plan(model_path: &Path, size: u32) -> Result<Plan> {
    let size = size as usize;
    tract_onnx::onnx()
        .model_for_path(model_path)
        .with_context(|| format!("failed to load ONNX model from {}", model_path.display()))?
        .with_input_fact(0, f32::fact([1, 3, size, size]).into())
        .context("failed to set input fact")?
        .into_optimized()
        .context("failed to optimize ONNX model")?
        .into_runnable()
        .context("failed to build runnable ONNX model")
}

/// Loads `<model_dir>/<model file>` for each new instance.
pub struct TractFactory {
    model_dir: PathBuf,
}

impl TractFactory {
    pub fn new<P: Into<PathBuf>>(model_dir: P) -> Self {
        Self {
            model_dir: model_dir.into(),
        }
    }
}

impl DetectorFactory for TractFactory {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn build(&self, options: &DetectorOptions) -> Result<Box<dyn Detector>> {
        let path = self.model_dir.join(options.model.file_name());
        Ok(Box::new(TractDetector::load(path, options)?))
    }
}
