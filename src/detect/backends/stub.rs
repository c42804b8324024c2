use anyhow::Result;

use crate::detect::backend::RegionDetector;
use crate::frame::{DetectionRegion, Frame, Region};

/// Deterministic detector for tests and demos.
///
/// Returns the configured boxes on every frame, clipped to the frame. Boxes that fall
/// entirely outside the frame are dropped.
#[derive(Clone, Debug, Default)]
pub struct StubDetector {
    boxes: Vec<Region>,
    calls: u64,
}

impl StubDetector {
    pub fn new(boxes: Vec<Region>) -> Self {
        Self { boxes, calls: 0 }
    }

    /// Number of frames seen so far.
    pub fn calls(&self) -> u64 {
        self.calls
    }
}

impl RegionDetector for StubDetector {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn detect(&mut self, frame: &Frame) -> Result<Vec<DetectionRegion>> {
        self.calls += 1;
        Ok(self
            .boxes
            .iter()
            .filter_map(|region| region.clamp_to(frame.width(), frame.height()))
            .map(DetectionRegion::new)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    #[test]
    fn returns_configured_boxes_every_frame() -> Result<()> {
        let mut detector = StubDetector::new(vec![
            Region::new(1, 1, 4, 4),
            Region::new(90, 90, 4, 4),
            Region::new(8, -2, 4, 4),
        ]);
        let frame = Frame::new(0, RgbImage::new(10, 10));
        for _ in 0..2 {
            let regions = detector.detect(&frame)?;
            let boxes: Vec<_> = regions.iter().map(|r| r.region).collect();
            assert_eq!(boxes, vec![Region::new(1, 1, 4, 4), Region::new(8, 0, 2, 2)]);
        }
        assert_eq!(detector.calls(), 2);
        Ok(())
    }
}
