//! Cascade classifier detection.
//!
//! [`CascadeDetector`] runs a pretrained sliding-window cascade over the grayscale frame.
//! [`NestedDetector`] runs a second detector inside every region found by a first one
//! (eyes inside faces) and maps the inner boxes back to frame coordinates.

use std::path::Path;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::detect::backend::RegionDetector;
use crate::detect::kinds::DetectorKind;
use crate::frame::{DetectionRegion, Frame};

/// Tuning passed to the multi-scale search.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CascadeParams {
    /// Image pyramid step, strictly greater than 1.
    pub scale_factor: f64,
    /// Overlapping candidates required to keep a detection.
    pub min_neighbors: u32,
    /// Smallest square window considered, in pixels.
    pub min_size: u32,
}

impl Default for CascadeParams {
    fn default() -> Self {
        DetectorKind::Face.default_params()
    }
}

impl CascadeParams {
    pub fn validate(&self) -> Result<()> {
        if !self.scale_factor.is_finite() || self.scale_factor <= 1.0 {
            bail!("cascade scale_factor must be > 1 (got {})", self.scale_factor);
        }
        if self.min_size == 0 {
            bail!("cascade min_size must be > 0");
        }
        if self.min_neighbors > i32::MAX as u32 {
            bail!("cascade min_neighbors is out of range");
        }
        Ok(())
    }
}

/// Cascade classifier detector.
pub struct CascadeDetector {
    kind: DetectorKind,
    params: CascadeParams,
    #[cfg(feature = "backend-opencv")]
    classifier: opencv::objdetect::CascadeClassifier,
}

impl CascadeDetector {
    /// Load the cascade file for `kind`.
    pub fn load(kind: DetectorKind, path: &Path, params: CascadeParams) -> Result<Self> {
        params.validate()?;
        kind.ensure_available()?;
        if !path.is_file() {
            bail!(
                "{} cascade not found at {}",
                kind.label().to_lowercase(),
                path.display()
            );
        }

        #[cfg(feature = "backend-opencv")]
        {
            use anyhow::Context;
            use opencv::prelude::*;

            let path_str = path
                .to_str()
                .with_context(|| format!("cascade path {} is not UTF-8", path.display()))?;
            let classifier = opencv::objdetect::CascadeClassifier::new(path_str)
                .with_context(|| format!("failed to load cascade {}", path.display()))?;
            if classifier.empty()? {
                bail!("cascade {} contains no stages", path.display());
            }
            log::info!(
                "CascadeDetector: loaded {} from {}",
                kind.label(),
                path.display()
            );
            Ok(Self {
                kind,
                params,
                classifier,
            })
        }
        #[cfg(not(feature = "backend-opencv"))]
        {
            bail!("cascade detection requires the backend-opencv feature")
        }
    }

    pub fn kind(&self) -> DetectorKind {
        self.kind
    }

    pub fn params(&self) -> CascadeParams {
        self.params
    }

    #[cfg(feature = "backend-opencv")]
    fn detect_gray(&mut self, gray: &image::GrayImage) -> Result<Vec<DetectionRegion>> {
        use anyhow::Context;
        use opencv::core::{Rect, Size, Vector};
        use opencv::prelude::*;

        let mat = crate::cv::gray_to_mat(gray)?;
        let mut rects = Vector::<Rect>::new();
        let min = self.params.min_size as i32;
        self.classifier
            .detect_multi_scale(
                &mat,
                &mut rects,
                self.params.scale_factor,
                self.params.min_neighbors as i32,
                0,
                Size::new(min, min),
                Size::default(),
            )
            .context("cascade detect_multi_scale failed")?;
        Ok(rects
            .iter()
            .map(|rect| DetectionRegion::new(crate::cv::rect_to_region(rect)))
            .collect())
    }

    #[cfg(not(feature = "backend-opencv"))]
    fn detect_gray(&mut self, _gray: &image::GrayImage) -> Result<Vec<DetectionRegion>> {
        bail!("cascade detection requires the backend-opencv feature")
    }
}

impl RegionDetector for CascadeDetector {
    fn name(&self) -> &'static str {
        "cascade"
    }

    fn detect(&mut self, frame: &Frame) -> Result<Vec<DetectionRegion>> {
        self.detect_gray(&frame.to_gray())
    }

    fn detect_in(&mut self, crop: &image::RgbImage) -> Result<Vec<DetectionRegion>> {
        self.detect_gray(&image::imageops::grayscale(crop))
    }
}

/// Outer and inner regions from one nested pass.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NestedRegions {
    pub outer: Vec<DetectionRegion>,
    /// Inner regions in frame coordinates.
    pub inner: Vec<DetectionRegion>,
}

/// Runs `inner` inside each region found by `outer`.
pub struct NestedDetector<O, I> {
    outer: O,
    inner: I,
}

impl<O: RegionDetector, I: RegionDetector> NestedDetector<O, I> {
    pub fn new(outer: O, inner: I) -> Self {
        Self { outer, inner }
    }

    pub fn detect_nested(&mut self, frame: &Frame) -> Result<NestedRegions> {
        let outer = self.outer.detect(frame)?;
        let mut inner = Vec::new();
        for region in &outer {
            let Some(clipped) = region.region.clamp_to(frame.width(), frame.height()) else {
                continue;
            };
            let Some(crop) = frame.crop(clipped) else {
                continue;
            };
            for found in self.inner.detect_in(&crop)? {
                inner.push(DetectionRegion {
                    region: found.region.offset(clipped.x, clipped.y),
                    ..found
                });
            }
        }
        Ok(NestedRegions { outer, inner })
    }
}

impl<O: RegionDetector, I: RegionDetector> RegionDetector for NestedDetector<O, I> {
    fn name(&self) -> &'static str {
        "nested"
    }

    /// Outer regions followed by inner regions.
    fn detect(&mut self, frame: &Frame) -> Result<Vec<DetectionRegion>> {
        let NestedRegions { mut outer, inner } = self.detect_nested(frame)?;
        outer.extend(inner);
        Ok(outer)
    }
}
