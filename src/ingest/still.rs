//! Still image exposed as a one-shot source.

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use image::RgbImage;

use super::{FrameSource, SourceStats};
use crate::frame::Frame;

pub struct StillImageSource {
    path: PathBuf,
    image: Option<RgbImage>,
    delivered: bool,
}

impl StillImageSource {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            image: None,
            delivered: false,
        }
    }
}

impl FrameSource for StillImageSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn connect(&mut self) -> Result<()> {
        let decoded = image::open(&self.path)
            .with_context(|| format!("failed to open image {}", self.path.display()))?;
        log::info!(
            "StillImageSource: {} ({}x{}, {} channels)",
            self.path.display(),
            decoded.width(),
            decoded.height(),
            decoded.color().channel_count()
        );
        self.image = Some(decoded.to_rgb8());
        self.delivered = false;
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        if self.delivered {
            return Ok(None);
        }
        let image = self
            .image
            .take()
            .ok_or_else(|| anyhow!("image source not connected; call connect() first"))?;
        self.delivered = true;
        Ok(Some(Frame::new(0, image)))
    }

    fn release(&mut self) {
        self.image = None;
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: u64::from(self.delivered),
            source: self.describe(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn delivers_exactly_one_frame() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("still.png");
        RgbImage::from_pixel(8, 6, Rgb([1, 2, 3])).save(&path)?;

        let mut source = StillImageSource::new(path);
        source.connect()?;
        let frame = source.next_frame()?.expect("one frame");
        assert_eq!((frame.width(), frame.height()), (8, 6));
        assert_eq!(frame.pixels().get_pixel(7, 5), &Rgb([1, 2, 3]));
        assert!(source.next_frame()?.is_none());
        assert_eq!(source.stats().frames_captured, 1);
        Ok(())
    }

    #[test]
    fn missing_file_fails_at_connect() {
        let mut source = StillImageSource::new(PathBuf::from("does/not/exist.png"));
        assert!(source.connect().is_err());
    }
}
