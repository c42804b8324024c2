use anyhow::Result;

use crate::frame::{DetectionRegion, Frame};

/// Per-frame region detector.
///
/// Implementations read the frame and return zero or more regions in frame
/// coordinates. Regions are consumed by the annotator within the same iteration; a
/// detector must not hold on to the frame after `detect` returns.
pub trait RegionDetector {
    /// Detector identifier, used in logs.
    fn name(&self) -> &'static str;

    /// Run detection on a frame.
    fn detect(&mut self, frame: &Frame) -> Result<Vec<DetectionRegion>>;

    /// Run detection on a sub-image already cut out of a frame.
    ///
    /// Regions are relative to the sub-image. The default wraps the crop in a
    /// temporary frame.
    fn detect_in(&mut self, crop: &image::RgbImage) -> Result<Vec<DetectionRegion>> {
        let frame = Frame::new(0, crop.clone());
        self.detect(&frame)
    }
}

impl<D: RegionDetector + ?Sized> RegionDetector for Box<D> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn detect(&mut self, frame: &Frame) -> Result<Vec<DetectionRegion>> {
        (**self).detect(frame)
    }

    fn detect_in(&mut self, crop: &image::RgbImage) -> Result<Vec<DetectionRegion>> {
        (**self).detect_in(crop)
    }
}
