//! Chroma-key compositing ("invisibility cloak").
//!
//! Pixels of the live frame that match the key color are replaced by the same pixels of
//! a background captured before the loop starts.

use anyhow::{anyhow, bail, Result};
use image::{GrayImage, RgbImage};
use imageproc::distance_transform::Norm;
use imageproc::morphology;

use crate::detect::color::{in_range, MASK_ON};
use crate::detect::RangeSet;
use crate::frame::Frame;
use crate::ingest::FrameSource;

/// Frames read before the background is kept, letting the camera settle exposure.
pub const DEFAULT_WARMUP_FRAMES: u32 = 60;

/// Remove speckle from the mask: open with a 3x3 kernel twice, then dilate once.
pub fn refine_mask(mask: &GrayImage) -> GrayImage {
    let opened = morphology::open(mask, Norm::LInf, 2);
    morphology::dilate(&opened, Norm::LInf, 1)
}

/// Background where `mask` is set, live pixels elsewhere.
pub fn compose(live: &RgbImage, background: &RgbImage, mask: &GrayImage) -> Result<RgbImage> {
    if live.dimensions() != background.dimensions() || live.dimensions() != mask.dimensions() {
        bail!(
            "composite size mismatch: live {:?}, background {:?}, mask {:?}",
            live.dimensions(),
            background.dimensions(),
            mask.dimensions()
        );
    }
    // Equivalent to summing the two masked images with unit weights and zero offset.
    Ok(RgbImage::from_fn(live.width(), live.height(), |x, y| {
        if mask.get_pixel(x, y).0[0] != 0 {
            *background.get_pixel(x, y)
        } else {
            *live.get_pixel(x, y)
        }
    }))
}

/// Read `warmup` frames and keep the last as the static background.
pub fn capture_background<S: FrameSource + ?Sized>(source: &mut S, warmup: u32) -> Result<Frame> {
    let warmup = warmup.max(1);
    let mut background = None;
    for _ in 0..warmup {
        match source.next_frame()? {
            Some(frame) => background = Some(frame),
            None => break,
        }
    }
    let background =
        background.ok_or_else(|| anyhow!("source ended before a background frame was captured"))?;
    log::info!(
        "ChromaKey: captured background from frame {} ({}x{})",
        background.index(),
        background.width(),
        background.height()
    );
    Ok(background)
}

/// Replaces key-colored pixels with a fixed background.
pub struct ChromaKey {
    key: RangeSet,
    background: RgbImage,
    refine: bool,
}

impl ChromaKey {
    pub fn new(key: RangeSet, background: Frame) -> Result<Self> {
        key.validate()?;
        Ok(Self {
            key,
            background: background.into_pixels(),
            refine: true,
        })
    }

    /// Skip the morphological clean-up of the mask.
    pub fn without_refinement(mut self) -> Self {
        self.refine = false;
        self
    }

    pub fn mask(&self, frame: &Frame) -> GrayImage {
        let mask = in_range(frame.pixels(), &self.key);
        if self.refine {
            refine_mask(&mask)
        } else {
            mask
        }
    }

    pub fn apply(&self, frame: &Frame) -> Result<Frame> {
        let mask = self.mask(frame);
        let pixels = compose(frame.pixels(), &self.background, &mask)?;
        Ok(Frame::new(frame.index(), pixels))
    }
}

/// Share of pixels set in a mask, for logging.
pub fn mask_coverage(mask: &GrayImage) -> f32 {
    let total = mask.pixels().len();
    if total == 0 {
        return 0.0;
    }
    let on = mask.pixels().filter(|p| p.0[0] == MASK_ON).count();
    on as f32 / total as f32
}
