//! Synthetic `stub://` source.
//!
//! Produces a fixed number of frames showing a static gray background with a yellow
//! square sliding left to right. The background never changes, so the same stream
//! exercises the color tracker, the chroma-key background capture and the trackers.

use anyhow::Result;
use image::{Rgb, RgbImage};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{FrameSource, SourceStats};
use crate::frame::{Frame, Region};

pub const BACKGROUND: Rgb<u8> = Rgb([128, 128, 128]);
pub const MARKER: Rgb<u8> = Rgb([230, 200, 20]);

/// Configuration for a synthetic source.
#[derive(Clone, Debug)]
pub struct SyntheticConfig {
    pub name: String,
    pub width: u32,
    pub height: u32,
    /// Frames produced before end of stream.
    pub frames: u64,
    /// Side length of the moving square.
    pub marker_size: u32,
    /// Horizontal step per frame, in pixels.
    pub step: u32,
    /// Maximum vertical jitter of the square, in pixels.
    pub jitter: u32,
    pub seed: u64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            name: "stub://scene".to_string(),
            width: 640,
            height: 480,
            frames: 300,
            marker_size: 40,
            step: 4,
            jitter: 0,
            seed: 0,
        }
    }
}

pub struct SyntheticSource {
    config: SyntheticConfig,
    rng: StdRng,
    frame_count: u64,
    connected: bool,
}

impl SyntheticSource {
    pub fn new(config: SyntheticConfig) -> Self {
        Self {
            rng: StdRng::seed_from_u64(config.seed),
            config,
            frame_count: 0,
            connected: false,
        }
    }

    /// Where the marker is drawn in frame `index`.
    pub fn marker_region(&self, index: u64) -> Region {
        let size = self
            .config
            .marker_size
            .min(self.config.width)
            .min(self.config.height);
        let travel = (self.config.width - size).max(1) as u64;
        let x = (index * self.config.step as u64) % travel;
        let y = (self.config.height - size) / 2;
        Region::new(x as i32, y as i32, size, size)
    }

    fn render(&mut self, index: u64) -> RgbImage {
        let mut region = self.marker_region(index);
        if self.config.jitter > 0 {
            let jitter = self.config.jitter as i32;
            let dy = self.rng.gen_range(-jitter..=jitter);
            region = region.offset(0, dy);
        }
        let mut pixels = RgbImage::from_pixel(self.config.width, self.config.height, BACKGROUND);
        if let Some(visible) = region.clamp_to(self.config.width, self.config.height) {
            for y in visible.y..visible.bottom() {
                for x in visible.x..visible.right() {
                    pixels.put_pixel(x as u32, y as u32, MARKER);
                }
            }
        }
        pixels
    }
}

impl FrameSource for SyntheticSource {
    fn describe(&self) -> String {
        self.config.name.clone()
    }

    fn connect(&mut self) -> Result<()> {
        log::info!(
            "SyntheticSource: connected to {} ({}x{}, {} frames)",
            self.config.name,
            self.config.width,
            self.config.height,
            self.config.frames
        );
        self.connected = true;
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        if self.frame_count >= self.config.frames {
            return Ok(None);
        }
        let index = self.frame_count;
        let pixels = self.render(index);
        self.frame_count += 1;
        Ok(Some(Frame::new(index, pixels)))
    }

    fn release(&mut self) {
        if self.connected {
            log::info!("SyntheticSource: released {}", self.config.name);
            self.connected = false;
        }
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frame_count,
            source: self.config.name.clone(),
        }
    }
}
