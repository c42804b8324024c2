//! Color-range detection.
//!
//! A pixel is in range when every channel lies within the inclusive bounds of at least
//! one [`ColorRange`] of a [`RangeSet`]. HSV values follow the 8-bit OpenCV convention:
//! hue in `[0, 180)`, saturation and value in `[0, 255]`. A hue band that wraps around
//! zero (red) is expressed as two ranges.

use anyhow::{bail, Result};
use image::{GrayImage, Luma, Rgb, RgbImage};
use imageproc::region_labelling::{connected_components, Connectivity};
use serde::{Deserialize, Serialize};

use crate::detect::backend::RegionDetector;
use crate::frame::{DetectionRegion, Frame, Region};

/// Mask value for in-range pixels.
pub const MASK_ON: u8 = 255;

/// Largest hue value accepted in a bound (OpenCV stores hue halved).
pub const HUE_MAX: u8 = 180;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ColorSpace {
    Rgb,
    Hsv,
}

/// Inclusive per-channel bounds in one color space.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorRange {
    pub space: ColorSpace,
    pub lower: [u8; 3],
    pub upper: [u8; 3],
}

impl ColorRange {
    pub fn new(space: ColorSpace, lower: [u8; 3], upper: [u8; 3]) -> Result<Self> {
        let range = Self {
            space,
            lower,
            upper,
        };
        range.validate()?;
        Ok(range)
    }

    pub fn hsv(lower: [u8; 3], upper: [u8; 3]) -> Result<Self> {
        Self::new(ColorSpace::Hsv, lower, upper)
    }

    pub fn rgb(lower: [u8; 3], upper: [u8; 3]) -> Result<Self> {
        Self::new(ColorSpace::Rgb, lower, upper)
    }

    pub fn validate(&self) -> Result<()> {
        for channel in 0..3 {
            if self.lower[channel] > self.upper[channel] {
                bail!(
                    "color range lower bound {:?} exceeds upper bound {:?} in channel {}",
                    self.lower,
                    self.upper,
                    channel
                );
            }
        }
        if self.space == ColorSpace::Hsv && self.upper[0] > HUE_MAX {
            bail!("hue bound {} exceeds {}", self.upper[0], HUE_MAX);
        }
        Ok(())
    }

    /// Whether an RGB pixel falls inside this range.
    pub fn contains(&self, pixel: Rgb<u8>) -> bool {
        let value = match self.space {
            ColorSpace::Rgb => pixel.0,
            ColorSpace::Hsv => rgb_to_hsv(pixel),
        };
        (0..3).all(|c| value[c] >= self.lower[c] && value[c] <= self.upper[c])
    }
}

/// Logical OR of color ranges.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RangeSet {
    ranges: Vec<ColorRange>,
}

impl RangeSet {
    pub fn new(ranges: Vec<ColorRange>) -> Result<Self> {
        let set = Self { ranges };
        set.validate()?;
        Ok(set)
    }

    pub fn single(range: ColorRange) -> Self {
        Self {
            ranges: vec![range],
        }
    }

    /// Shades of yellow, used by the object tracker.
    pub fn yellow() -> Self {
        Self::single(ColorRange {
            space: ColorSpace::Hsv,
            lower: [20, 100, 100],
            upper: [30, 255, 255],
        })
    }

    /// Red, which wraps around hue zero.
    pub fn red() -> Self {
        Self {
            ranges: vec![
                ColorRange {
                    space: ColorSpace::Hsv,
                    lower: [0, 120, 70],
                    upper: [10, 255, 255],
                },
                ColorRange {
                    space: ColorSpace::Hsv,
                    lower: [170, 120, 70],
                    upper: [180, 255, 255],
                },
            ],
        }
    }

    pub fn ranges(&self) -> &[ColorRange] {
        &self.ranges
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn validate(&self) -> Result<()> {
        if self.ranges.is_empty() {
            bail!("color range set must contain at least one range");
        }
        for range in &self.ranges {
            range.validate()?;
        }
        Ok(())
    }

    pub fn contains(&self, pixel: Rgb<u8>) -> bool {
        self.ranges.iter().any(|range| range.contains(pixel))
    }
}

/// Named range presets selectable from the command line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ColorPreset {
    Yellow,
    Red,
}

impl ColorPreset {
    pub fn ranges(self) -> RangeSet {
        match self {
            ColorPreset::Yellow => RangeSet::yellow(),
            ColorPreset::Red => RangeSet::red(),
        }
    }
}

/// Convert an RGB pixel to 8-bit HSV (hue halved to fit `[0, 180)`).
pub fn rgb_to_hsv(pixel: Rgb<u8>) -> [u8; 3] {
    let [r, g, b] = pixel.0.map(f32::from);
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let s = if max == 0.0 { 0.0 } else { 255.0 * delta / max };
    let mut h = if delta == 0.0 {
        0.0
    } else if max == r {
        60.0 * (g - b) / delta
    } else if max == g {
        120.0 + 60.0 * (b - r) / delta
    } else {
        240.0 + 60.0 * (r - g) / delta
    };
    if h < 0.0 {
        h += 360.0;
    }
    let h = (h / 2.0).round() as u8 % HUE_MAX;
    [h, s.round() as u8, max as u8]
}

/// Binary mask: [`MASK_ON`] where the pixel is in range, zero elsewhere.
pub fn in_range(pixels: &RgbImage, ranges: &RangeSet) -> GrayImage {
    GrayImage::from_fn(pixels.width(), pixels.height(), |x, y| {
        if ranges.contains(*pixels.get_pixel(x, y)) {
            Luma([MASK_ON])
        } else {
            Luma([0])
        }
    })
}

/// Bounding box of the largest 8-connected foreground region, by pixel count.
///
/// Ties go to the region whose first pixel comes first in raster order. Returns `None`
/// for an empty mask.
pub fn largest_region(mask: &GrayImage) -> Option<Region> {
    let labels = connected_components(mask, Connectivity::Eight, Luma([0u8]));

    struct Stats {
        area: u64,
        first: u64,
        min_x: u32,
        min_y: u32,
        max_x: u32,
        max_y: u32,
    }

    let mut stats: Vec<Stats> = Vec::new();
    for (x, y, label) in labels.enumerate_pixels() {
        let label = label.0[0] as usize;
        if label == 0 {
            continue;
        }
        if stats.len() < label {
            stats.resize_with(label, || Stats {
                area: 0,
                first: u64::MAX,
                min_x: u32::MAX,
                min_y: u32::MAX,
                max_x: 0,
                max_y: 0,
            });
        }
        let entry = &mut stats[label - 1];
        if entry.area == 0 {
            entry.first = y as u64 * mask.width() as u64 + x as u64;
        }
        entry.area += 1;
        entry.min_x = entry.min_x.min(x);
        entry.min_y = entry.min_y.min(y);
        entry.max_x = entry.max_x.max(x);
        entry.max_y = entry.max_y.max(y);
    }

    let mut best: Option<&Stats> = None;
    for entry in stats.iter().filter(|s| s.area > 0) {
        let better = best.map_or(true, |b| {
            entry.area > b.area || (entry.area == b.area && entry.first < b.first)
        });
        if better {
            best = Some(entry);
        }
    }
    best.map(|s| {
        Region::from_corners(
            s.min_x as i32,
            s.min_y as i32,
            s.max_x as i32 + 1,
            s.max_y as i32 + 1,
        )
    })
}

/// Tracks the largest in-range region of each frame.
pub struct ColorTracker {
    ranges: RangeSet,
    last_mask: Option<GrayImage>,
}

impl ColorTracker {
    pub fn new(ranges: RangeSet) -> Result<Self> {
        ranges.validate()?;
        Ok(Self {
            ranges,
            last_mask: None,
        })
    }

    /// Mask computed for the most recent frame.
    pub fn last_mask(&self) -> Option<&GrayImage> {
        self.last_mask.as_ref()
    }
}

impl RegionDetector for ColorTracker {
    fn name(&self) -> &'static str {
        "color-range"
    }

    fn detect(&mut self, frame: &Frame) -> Result<Vec<DetectionRegion>> {
        let mask = in_range(frame.pixels(), &self.ranges);
        let region = largest_region(&mask);
        self.last_mask = Some(mask);
        Ok(region.map(DetectionRegion::new).into_iter().collect())
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const BACKGROUND: Rgb<u8> = Rgb([128, 128, 128]);
    const YELLOW: Rgb<u8> = Rgb([230, 200, 20]);

    fn paint(image: &mut RgbImage, region: Region, color: Rgb<u8>) {
        for y in region.y..region.bottom() {
            for x in region.x..region.right() {
                image.put_pixel(x as u32, y as u32, color);
            }
        }
    }

    #[test]
    fn hsv_conversion_matches_8bit_convention() {
        assert_eq!(rgb_to_hsv(Rgb([255, 0, 0])), [0, 255, 255]);
        assert_eq!(rgb_to_hsv(Rgb([0, 255, 0])), [60, 255, 255]);
        assert_eq!(rgb_to_hsv(Rgb([0, 0, 255])), [120, 255, 255]);
        assert_eq!(rgb_to_hsv(Rgb([128, 128, 128])), [0, 0, 128]);
        assert_eq!(rgb_to_hsv(YELLOW), [26, 233, 230]);
    }

    #[test]
    fn invalid_ranges_are_rejected() {
        assert!(ColorRange::hsv([10, 0, 0], [5, 255, 255]).is_err());
        assert!(ColorRange::hsv([0, 0, 0], [200, 255, 255]).is_err());
        assert!(RangeSet::new(Vec::new()).is_err());
        assert!(ColorRange::rgb([0, 0, 0], [255, 255, 255]).is_ok());
    }

    #[test]
    fn red_wraps_around_zero_hue() {
        let red = RangeSet::red();
        assert!(red.contains(Rgb([220, 10, 10])));
        assert!(red.contains(Rgb([220, 10, 30])));
        assert!(!red.contains(Rgb([10, 220, 10])));
        assert!(!red.contains(BACKGROUND));
    }

    #[test]
    fn single_region_reports_its_bounding_box() -> Result<()> {
        let mut pixels = RgbImage::from_pixel(64, 48, BACKGROUND);
        let blob = Region::new(10, 12, 7, 5);
        paint(&mut pixels, blob, YELLOW);

        let mut tracker = ColorTracker::new(RangeSet::yellow())?;
        let regions = tracker.detect(&Frame::new(0, pixels))?;
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].region, blob);
        let mask = tracker.last_mask().expect("mask");
        assert_eq!(mask.pixels().filter(|p| p.0[0] == MASK_ON).count(), 35);
        Ok(())
    }

    #[test]
    fn no_in_range_pixels_means_no_region() -> Result<()> {
        let pixels = RgbImage::from_pixel(32, 32, BACKGROUND);
        let mask = in_range(&pixels, &RangeSet::yellow());
        assert!(mask.pixels().all(|p| p.0[0] == 0));
        assert_eq!(largest_region(&mask), None);

        let mut tracker = ColorTracker::new(RangeSet::yellow())?;
        assert!(tracker.detect(&Frame::new(0, pixels))?.is_empty());
        Ok(())
    }

    #[test]
    fn largest_region_wins_and_ties_go_to_raster_order() {
        let mut mask = GrayImage::new(20, 20);
        let mut fill = |region: Region| {
            for y in region.y..region.bottom() {
                for x in region.x..region.right() {
                    mask.put_pixel(x as u32, y as u32, Luma([MASK_ON]));
                }
            }
        };
        fill(Region::new(0, 0, 2, 2));
        fill(Region::new(10, 10, 3, 3));
        fill(Region::new(15, 2, 3, 3));
        assert_eq!(largest_region(&mask), Some(Region::new(15, 2, 3, 3)));
    }

    #[test]
    fn diagonal_pixels_are_one_region() {
        let mut mask = GrayImage::new(4, 4);
        mask.put_pixel(0, 0, Luma([MASK_ON]));
        mask.put_pixel(1, 1, Luma([MASK_ON]));
        mask.put_pixel(2, 2, Luma([MASK_ON]));
        assert_eq!(largest_region(&mask), Some(Region::new(0, 0, 3, 3)));
    }
}
