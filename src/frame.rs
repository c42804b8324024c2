//! Frame and region types shared by every stage of the loop.
//!
//! - `Frame`: one decoded image (3-channel RGB) plus its position in the stream.
//! - `Region`: axis-aligned rectangle in frame coordinates.
//! - `DetectionRegion`: a `Region` with an optional label and confidence, produced by a
//!   processor and consumed by the annotator within the same iteration.
//!
//! Frames are owned by the iteration that produced them. A processor that needs a frame
//! beyond that (the chroma-key background) clones it explicitly.

use anyhow::{anyhow, Result};
use image::{imageops, DynamicImage, GrayImage, Rgb, RgbImage};

/// Color frames always carry three channels.
pub const COLOR_CHANNELS: u8 = 3;

/// Color written by [`Frame::mark_origin`].
pub const ORIGIN_MARK: Rgb<u8> = Rgb([255, 0, 0]);

/// Top-left block cleared by [`Frame::black_out_corner`].
pub const CORNER_BLOCK: Region = Region::new(0, 0, 100, 100);

// ----------------------------------------------------------------------------
// Frame
// ----------------------------------------------------------------------------

/// One frame produced by a source.
#[derive(Clone, Debug)]
pub struct Frame {
    index: u64,
    pixels: RgbImage,
}

impl Frame {
    pub fn new(index: u64, pixels: RgbImage) -> Self {
        Self { index, pixels }
    }

    /// Build a frame from tightly packed RGB24 bytes.
    pub fn from_rgb_bytes(index: u64, width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(COLOR_CHANNELS as usize))
            .ok_or_else(|| anyhow!("frame dimensions overflow"))?;
        if data.len() != expected {
            return Err(anyhow!(
                "RGB frame length mismatch: expected {}, got {}",
                expected,
                data.len()
            ));
        }
        let pixels = RgbImage::from_raw(width, height, data)
            .ok_or_else(|| anyhow!("RGB buffer does not fit {}x{}", width, height))?;
        Ok(Self { index, pixels })
    }

    /// Zero-based position of this frame in its stream.
    pub fn index(&self) -> u64 {
        self.index
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn channels(&self) -> u8 {
        COLOR_CHANNELS
    }

    pub fn pixels(&self) -> &RgbImage {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut RgbImage {
        &mut self.pixels
    }

    pub fn into_pixels(self) -> RgbImage {
        self.pixels
    }

    /// Pixel at `(x, y)`, or `None` outside the frame.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgb<u8>> {
        self.pixels.get_pixel_checked(x, y).copied()
    }

    pub fn mark_origin(&mut self) {
        self.fill(Region::new(0, 0, 1, 1), ORIGIN_MARK);
    }

    /// Paint [`CORNER_BLOCK`] black, clipped to the frame.
    pub fn black_out_corner(&mut self) {
        self.fill(CORNER_BLOCK, Rgb([0, 0, 0]));
    }

    /// Gray-on-RGB rendering of a single-channel image, for showing masks.
    pub fn from_gray(index: u64, gray: &GrayImage) -> Self {
        Self::new(index, DynamicImage::ImageLuma8(gray.clone()).into_rgb8())
    }

    /// Single-channel copy for processors that work on luminance.
    pub fn to_gray(&self) -> GrayImage {
        imageops::grayscale(&self.pixels)
    }

    /// Flip around the vertical axis (webcam mirror mode).
    pub fn mirror(&mut self) {
        imageops::flip_horizontal_in_place(&mut self.pixels);
    }

    /// Copy of the pixels inside `region`, clipped to the frame.
    ///
    /// Returns `None` when the region lies entirely outside the frame.
    pub fn crop(&self, region: Region) -> Option<RgbImage> {
        let clipped = region.clamp_to(self.width(), self.height())?;
        Some(
            imageops::crop_imm(
                &self.pixels,
                clipped.x as u32,
                clipped.y as u32,
                clipped.width,
                clipped.height,
            )
            .to_image(),
        )
    }

    /// Paint the part of `region` inside the frame with `color`.
    pub fn fill(&mut self, region: Region, color: Rgb<u8>) {
        let Some(clipped) = region.clamp_to(self.width(), self.height()) else {
            return;
        };
        for y in clipped.y as u32..clipped.bottom() as u32 {
            for x in clipped.x as u32..clipped.right() as u32 {
                self.pixels.put_pixel(x, y, color);
            }
        }
    }
}

// ----------------------------------------------------------------------------
// Region
// ----------------------------------------------------------------------------

/// Axis-aligned rectangle. `x`/`y` may be negative for regions partly off-frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Region {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Region spanning `(x1, y1)` inclusive to `(x2, y2)` exclusive.
    pub fn from_corners(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        let (left, right) = if x1 <= x2 { (x1, x2) } else { (x2, x1) };
        let (top, bottom) = if y1 <= y2 { (y1, y2) } else { (y2, y1) };
        Self {
            x: left,
            y: top,
            width: (right - left) as u32,
            height: (bottom - top) as u32,
        }
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Exclusive right edge.
    pub fn right(&self) -> i32 {
        self.x.saturating_add(self.width as i32)
    }

    /// Exclusive bottom edge.
    pub fn bottom(&self) -> i32 {
        self.y.saturating_add(self.height as i32)
    }

    pub fn offset(&self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            ..*self
        }
    }

    /// Intersection with a `width` x `height` frame, or `None` if nothing remains.
    pub fn clamp_to(&self, width: u32, height: u32) -> Option<Self> {
        let left = self.x.max(0);
        let top = self.y.max(0);
        let right = self.right().min(width as i32);
        let bottom = self.bottom().min(height as i32);
        if right <= left || bottom <= top {
            return None;
        }
        Some(Self::from_corners(left, top, right, bottom))
    }

    /// Same rectangle after the frame is flipped around its vertical axis.
    pub fn mirrored(&self, frame_width: u32) -> Self {
        Self {
            x: frame_width as i32 - self.right(),
            ..*self
        }
    }

    /// Grow by `padding` on every side, clipped to the frame.
    pub fn padded(&self, padding: u32, width: u32, height: u32) -> Option<Self> {
        let pad = padding as i32;
        Self::from_corners(
            self.x - pad,
            self.y - pad,
            self.right() + pad,
            self.bottom() + pad,
        )
        .clamp_to(width, height)
    }
}

/// Region reported by a processor for the current frame.
#[derive(Clone, Debug, PartialEq)]
pub struct DetectionRegion {
    pub region: Region,
    pub label: Option<String>,
    pub confidence: Option<f32>,
}

impl DetectionRegion {
    pub fn new(region: Region) -> Self {
        Self {
            region,
            label: None,
            confidence: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = Some(confidence);
        self
    }
}

impl From<Region> for DetectionRegion {
    fn from(region: Region) -> Self {
        Self::new(region)
    }
}

/// Move regions found on an unmirrored image onto its mirrored rendering.
pub fn mirror_regions(regions: &mut [DetectionRegion], frame_width: u32) {
    for detection in regions {
        detection.region = detection.region.mirrored(frame_width);
    }
}

/// Sort largest first. Equal areas keep their detector order.
pub fn sort_by_area_desc(regions: &mut [DetectionRegion]) {
    regions.sort_by(|a, b| b.region.area().cmp(&a.region.area()));
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fill_is_clipped_to_the_frame() {
        let mut frame = checker(4, 3);
        frame.fill(Region::new(2, 1, 100, 100), Rgb([0, 0, 0]));
        assert_eq!(frame.pixels().get_pixel(1, 1), &Rgb([1, 1, 7]));
        assert_eq!(frame.pixels().get_pixel(2, 1), &Rgb([0, 0, 0]));
        assert_eq!(frame.pixels().get_pixel(3, 2), &Rgb([0, 0, 0]));
        assert_eq!(frame.pixels().get_pixel(3, 0), &Rgb([3, 0, 7]));
    }

    fn checker(width: u32, height: u32) -> Frame {
        let pixels = RgbImage::from_fn(width, height, |x, y| Rgb([x as u8, y as u8, 7]));
        Frame::new(0, pixels)
    }

    #[test]
    fn from_rgb_bytes_validates_length() {
        assert!(Frame::from_rgb_bytes(0, 2, 2, vec![0; 12]).is_ok());
        assert!(Frame::from_rgb_bytes(0, 2, 2, vec![0; 11]).is_err());
    }

    #[test]
    fn mirror_flips_columns() {
        let mut frame = checker(4, 1);
        frame.mirror();
        assert_eq!(frame.pixels().get_pixel(0, 0), &Rgb([3, 0, 7]));
        assert_eq!(frame.pixels().get_pixel(3, 0), &Rgb([0, 0, 7]));
    }

    #[test]
    fn mirrored_region_follows_mirrored_pixels() {
        let mut frame = Frame::new(0, RgbImage::new(100, 50));
        let face = Region::new(10, 10, 20, 20);
        frame.fill(face, Rgb([200, 200, 200]));
        frame.mirror();

        let flipped = face.mirrored(frame.width());
        assert_eq!(flipped, Region::new(70, 10, 20, 20));
        assert_eq!(frame.pixel(70, 10), Some(Rgb([200, 200, 200])));
        assert_eq!(frame.pixel(89, 29), Some(Rgb([200, 200, 200])));
        assert_eq!(frame.pixel(69, 10), Some(Rgb([0, 0, 0])));
        assert_eq!(frame.pixel(90, 10), Some(Rgb([0, 0, 0])));

        let mut regions = vec![DetectionRegion::new(face).with_label("a")];
        mirror_regions(&mut regions, frame.width());
        assert_eq!(regions[0].region, flipped);
        assert_eq!(regions[0].label.as_deref(), Some("a"));
    }

    #[test]
    fn corner_edit_marks_origin_then_clears_block() {
        let paint = Rgb([40, 80, 120]);
        let original = Frame::new(0, RgbImage::from_pixel(120, 110, paint));
        let mut copy = original.clone();

        copy.mark_origin();
        assert_eq!(copy.pixel(0, 0), Some(ORIGIN_MARK));
        assert_eq!(copy.pixel(1, 0), Some(paint));

        copy.black_out_corner();
        for (x, y) in [(0, 0), (99, 0), (0, 99), (99, 99), (50, 50)] {
            assert_eq!(copy.pixel(x, y), Some(Rgb([0, 0, 0])), "({x}, {y})");
        }
        for (x, y) in [(100, 0), (0, 100), (100, 100), (119, 109)] {
            assert_eq!(copy.pixel(x, y), Some(paint), "({x}, {y})");
        }
        assert_eq!(original.pixel(0, 0), Some(paint));
        assert_eq!(copy.pixel(120, 0), None);
    }

    #[test]
    fn corner_block_is_clipped_on_small_frames() {
        let mut frame = checker(30, 20);
        frame.black_out_corner();
        assert!(frame.pixels().pixels().all(|p| *p == Rgb([0, 0, 0])));
    }

    #[test]
    fn crop_clips_to_frame() {
        let frame = checker(10, 10);
        let crop = frame.crop(Region::new(-5, 8, 8, 8)).unwrap();
        assert_eq!(crop.dimensions(), (3, 2));
        assert_eq!(crop.get_pixel(0, 0), &Rgb([0, 8, 7]));

        assert!(frame.crop(Region::new(20, 20, 4, 4)).is_none());
    }

    #[test]
    fn padded_region_stays_inside_frame() {
        let region = Region::new(2, 3, 4, 4);
        assert_eq!(region.padded(20, 10, 12), Some(Region::new(0, 0, 10, 12)));
        assert_eq!(region.padded(1, 100, 100), Some(Region::new(1, 2, 6, 6)));
    }

    #[test]
    fn sort_by_area_is_stable_for_ties() {
        let mut regions = vec![
            DetectionRegion::new(Region::new(0, 0, 2, 2)).with_label("a"),
            DetectionRegion::new(Region::new(0, 0, 4, 4)).with_label("b"),
            DetectionRegion::new(Region::new(5, 5, 2, 2)).with_label("c"),
        ];
        sort_by_area_desc(&mut regions);
        let labels: Vec<_> = regions.iter().map(|r| r.label.as_deref().unwrap()).collect();
        assert_eq!(labels, vec!["b", "a", "c"]);
    }
}
