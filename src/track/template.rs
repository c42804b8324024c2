//! Grayscale template tracker.
//!
//! Keeps the patch selected at init and, on every frame, searches a window around the
//! previous position for the offset with the smallest mean absolute difference.

use anyhow::{bail, Result};
use image::GrayImage;

use super::Tracker;
use crate::frame::{Frame, Region};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TemplateParams {
    /// Maximum displacement searched per frame, in pixels.
    pub search_radius: u32,
    /// Mean absolute difference per pixel above which the target counts as lost.
    pub max_mean_diff: f32,
}

impl Default for TemplateParams {
    fn default() -> Self {
        Self {
            search_radius: 24,
            max_mean_diff: 40.0,
        }
    }
}

pub struct TemplateTracker {
    params: TemplateParams,
    template: Option<GrayImage>,
    last: Region,
}

impl TemplateTracker {
    pub fn new(params: TemplateParams) -> Self {
        Self {
            params,
            template: None,
            last: Region::default(),
        }
    }
}

fn mean_abs_diff(gray: &GrayImage, template: &GrayImage, x: u32, y: u32, limit: u64) -> Option<u64> {
    let mut sum = 0u64;
    for ty in 0..template.height() {
        for tx in 0..template.width() {
            let a = gray.get_pixel(x + tx, y + ty).0[0];
            let b = template.get_pixel(tx, ty).0[0];
            sum += a.abs_diff(b) as u64;
        }
        if sum >= limit {
            return None;
        }
    }
    Some(sum)
}

impl Tracker for TemplateTracker {
    fn name(&self) -> &'static str {
        "template"
    }

    fn init(&mut self, frame: &Frame, region: Region) -> Result<()> {
        let Some(region) = region.clamp_to(frame.width(), frame.height()) else {
            bail!("template region lies outside the frame");
        };
        let gray = frame.to_gray();
        let template = image::imageops::crop_imm(
            &gray,
            region.x as u32,
            region.y as u32,
            region.width,
            region.height,
        )
        .to_image();
        self.template = Some(template);
        self.last = region;
        Ok(())
    }

    fn update(&mut self, frame: &Frame) -> Result<Option<Region>> {
        let Some(template) = self.template.as_ref() else {
            bail!("template tracker used before init");
        };
        let (tw, th) = template.dimensions();
        if tw > frame.width() || th > frame.height() {
            return Ok(None);
        }

        let gray = frame.to_gray();
        let radius = self.params.search_radius as i32;
        let max_x = (frame.width() - tw) as i32;
        let max_y = (frame.height() - th) as i32;
        let x0 = (self.last.x - radius).clamp(0, max_x);
        let x1 = (self.last.x + radius).clamp(0, max_x);
        let y0 = (self.last.y - radius).clamp(0, max_y);
        let y1 = (self.last.y + radius).clamp(0, max_y);

        let mut best: Option<(u64, i32, i32)> = None;
        for y in y0..=y1 {
            for x in x0..=x1 {
                let limit = best.map_or(u64::MAX, |(score, _, _)| score);
                if let Some(score) = mean_abs_diff(&gray, template, x as u32, y as u32, limit) {
                    if best.map_or(true, |(b, _, _)| score < b) {
                        best = Some((score, x, y));
                    }
                }
            }
        }

        let Some((score, x, y)) = best else {
            return Ok(None);
        };
        let mean = score as f32 / (tw as f32 * th as f32);
        if mean > self.params.max_mean_diff {
            return Ok(None);
        }
        self.last = Region::new(x, y, tw, th);
        Ok(Some(self.last))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::{FrameSource, SyntheticConfig, SyntheticSource};
    use image::{Rgb, RgbImage};

    #[test]
    fn follows_the_synthetic_marker() -> Result<()> {
        let mut source = SyntheticSource::new(SyntheticConfig {
            width: 160,
            height: 80,
            frames: 6,
            marker_size: 12,
            step: 5,
            ..SyntheticConfig::default()
        });
        source.connect()?;
        let first = source.next_frame()?.expect("frame");
        let mut tracker = TemplateTracker::new(TemplateParams::default());
        tracker.init(&first, source.marker_region(0))?;

        while let Some(frame) = source.next_frame()? {
            let found = tracker.update(&frame)?;
            assert_eq!(found, Some(source.marker_region(frame.index())));
        }
        Ok(())
    }

    #[test]
    fn vanished_target_is_reported_lost() -> Result<()> {
        let mut pixels = RgbImage::from_pixel(40, 40, Rgb([0, 0, 0]));
        for y in 10..20 {
            for x in 10..20 {
                pixels.put_pixel(x, y, Rgb([255, 255, 255]));
            }
        }
        let mut tracker = TemplateTracker::new(TemplateParams::default());
        tracker.init(&Frame::new(0, pixels), Region::new(10, 10, 10, 10))?;

        let blank = Frame::new(1, RgbImage::from_pixel(40, 40, Rgb([0, 0, 0])));
        assert_eq!(tracker.update(&blank)?, None);
        Ok(())
    }

    #[test]
    fn update_before_init_fails() {
        let mut tracker = TemplateTracker::new(TemplateParams::default());
        assert!(tracker.update(&Frame::new(0, RgbImage::new(4, 4))).is_err());
    }
}
