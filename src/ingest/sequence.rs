//! Directory of still images played back as a stream, ordered by file name.

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};

use super::{is_image_path, FrameSource, SourceStats};
use crate::frame::Frame;

pub struct SequenceSource {
    dir: PathBuf,
    files: Vec<PathBuf>,
    position: usize,
    connected: bool,
}

impl SequenceSource {
    pub fn new(dir: PathBuf) -> Self {
        Self {
            dir,
            files: Vec::new(),
            position: 0,
            connected: false,
        }
    }
}

impl FrameSource for SequenceSource {
    fn describe(&self) -> String {
        self.dir.display().to_string()
    }

    fn connect(&mut self) -> Result<()> {
        let entries = std::fs::read_dir(&self.dir)
            .with_context(|| format!("failed to read image directory {}", self.dir.display()))?;
        let mut files = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.is_file() && is_image_path(&path) {
                files.push(path);
            }
        }
        if files.is_empty() {
            return Err(anyhow!("no images found in {}", self.dir.display()));
        }
        files.sort();
        log::info!(
            "SequenceSource: connected to {} ({} images)",
            self.dir.display(),
            files.len()
        );
        self.files = files;
        self.position = 0;
        self.connected = true;
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        if !self.connected {
            return Err(anyhow!("sequence source not connected; call connect() first"));
        }
        let Some(path) = self.files.get(self.position) else {
            return Ok(None);
        };
        let decoded = image::open(path)
            .with_context(|| format!("failed to decode {}", path.display()))?;
        let frame = Frame::new(self.position as u64, decoded.to_rgb8());
        self.position += 1;
        Ok(Some(frame))
    }

    fn release(&mut self) {
        if self.connected {
            log::info!("SequenceSource: released {}", self.dir.display());
        }
        self.connected = false;
        self.files.clear();
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.position as u64,
            source: self.describe(),
        }
    }
}
