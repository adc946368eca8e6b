//! Local image directory source.
//!
//! Replays still images (any format the `image` crate decodes with the enabled
//! features) in file-name order. Local paths only; URL schemes are refused.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use image::RgbImage;

use super::{SourceConfig, SourceStats};
use crate::frame::Rotation;

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

pub struct ImageDirSource {
    config: SourceConfig,
    files: Vec<PathBuf>,
    cursor: usize,
}

impl ImageDirSource {
    pub fn open(config: SourceConfig) -> Result<Self> {
        if !is_local_path(&config.path) {
            return Err(anyhow!(
                "image directory source only supports local paths (no URL schemes)"
            ));
        }
        let files = list_images(Path::new(&config.path))?;
        if files.is_empty() {
            return Err(anyhow!("no images found in {}", config.path));
        }
        log::info!(
            "ImageDirSource: {} images in {}",
            files.len(),
            config.path
        );
        Ok(Self {
            config,
            files,
            cursor: 0,
        })
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn next_frame(&mut self) -> Result<Option<(RgbImage, Rotation)>> {
        let Some(path) = self.files.get(self.cursor) else {
            return Ok(None);
        };
        self.cursor += 1;
        let image = image::open(path)
            .with_context(|| format!("failed to decode {}", path.display()))?
            .to_rgb8();
        Ok(Some((image, Rotation::Deg0)))
    }

    pub fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.cursor as u64,
            path: self.config.path.clone(),
        }
    }
}

fn list_images(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("failed to read image directory {}", dir.display()))?;
    let mut files = Vec::new();
    for entry in entries {
        let path = entry?.path();
        let is_image = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                IMAGE_EXTENSIONS
                    .iter()
                    .any(|known| ext.eq_ignore_ascii_case(known))
            });
        if path.is_file() && is_image {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn is_local_path(path: &str) -> bool {
    !path.trim().is_empty() && !path.contains("://")
}
