//! Frame sources.
//!
//! This module provides the producers that feed the loop controller:
//! - Still images, exposed as a one-shot source
//! - Directories of images, played back in file-name order
//! - Local video files (feature: ingest-file-ffmpeg)
//! - USB/V4L2 cameras (feature: ingest-v4l2)
//! - Synthetic `stub://` scenes (tests and demos)
//!
//! Every source implements [`FrameSource`]. `next_frame` returns `Ok(None)` once the
//! stream is exhausted and `Err` on a device or decode failure. Only the loop controller
//! calls `release`.

mod camera;
mod file;
#[cfg(feature = "ingest-file-ffmpeg")]
mod file_ffmpeg;
#[cfg(feature = "ingest-v4l2")]
mod normalize;
mod sequence;
mod still;
mod synthetic;
#[cfg(feature = "ingest-v4l2")]
mod v4l2;

use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::frame::Frame;

pub use camera::{CameraConfig, CameraSource};
pub use file::{VideoConfig, VideoSource};
pub use still::StillImageSource;
pub use sequence::SequenceSource;
pub use synthetic::{SyntheticConfig, SyntheticSource};

/// File extensions decoded as still images.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "gif"];

/// Default camera device when no input is given.
pub const DEFAULT_CAMERA_DEVICE: &str = "/dev/video0";

/// Frame producer driven by the loop controller.
pub trait FrameSource {
    /// Human-readable source identifier (path, device, or stub URL).
    fn describe(&self) -> String;

    /// Open the underlying device or file.
    fn connect(&mut self) -> Result<()>;

    /// Next frame, `Ok(None)` at end of stream.
    fn next_frame(&mut self) -> Result<Option<Frame>>;

    /// Close the device or file. Must be safe to call more than once.
    fn release(&mut self);

    fn stats(&self) -> SourceStats;
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn describe(&self) -> String {
        (**self).describe()
    }

    fn connect(&mut self) -> Result<()> {
        (**self).connect()
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        (**self).next_frame()
    }

    fn release(&mut self) {
        (**self).release()
    }

    fn stats(&self) -> SourceStats {
        (**self).stats()
    }
}

/// Statistics for a source.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SourceStats {
    pub frames_captured: u64,
    pub source: String,
}

/// What to open, resolved from the optional `--input` flag.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InputSpec {
    Camera(String),
    Image(PathBuf),
    Sequence(PathBuf),
    Video(String),
    Synthetic(String),
}

impl InputSpec {
    /// Resolve an input argument. Absent input means the live camera.
    pub fn resolve(input: Option<&str>, camera_device: &str) -> Self {
        let Some(input) = input.map(str::trim).filter(|s| !s.is_empty()) else {
            return InputSpec::Camera(camera_device.to_string());
        };
        if input.starts_with("stub://") {
            return InputSpec::Synthetic(input.to_string());
        }
        let path = Path::new(input);
        if path.is_dir() {
            return InputSpec::Sequence(path.to_path_buf());
        }
        if is_image_path(path) {
            return InputSpec::Image(path.to_path_buf());
        }
        InputSpec::Video(input.to_string())
    }
}

/// Settings needed to open any source.
#[derive(Clone, Debug)]
pub struct SourceSettings {
    pub input: InputSpec,
    pub mirror: bool,
    pub target_fps: u32,
    pub width: u32,
    pub height: u32,
    /// Frame budget for synthetic sources.
    pub synthetic_frames: u64,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            input: InputSpec::Camera(DEFAULT_CAMERA_DEVICE.to_string()),
            mirror: false,
            target_fps: 30,
            width: 640,
            height: 480,
            synthetic_frames: 300,
        }
    }
}

/// Build the source described by `settings`. The source is not yet connected.
pub fn open_source(settings: &SourceSettings) -> Result<Box<dyn FrameSource>> {
    let source: Box<dyn FrameSource> = match &settings.input {
        InputSpec::Camera(device) => Box::new(CameraSource::new(CameraConfig {
            device: device.clone(),
            target_fps: settings.target_fps,
            width: settings.width,
            height: settings.height,
            synthetic_frames: settings.synthetic_frames,
        })?),
        InputSpec::Image(path) => Box::new(StillImageSource::new(path.clone())),
        InputSpec::Sequence(dir) => Box::new(SequenceSource::new(dir.clone())),
        InputSpec::Video(path) => Box::new(VideoSource::new(VideoConfig {
            path: path.clone(),
            synthetic_frames: settings.synthetic_frames,
        })?),
        InputSpec::Synthetic(name) => Box::new(SyntheticSource::new(SyntheticConfig {
            name: name.clone(),
            width: settings.width,
            height: settings.height,
            frames: settings.synthetic_frames,
            ..SyntheticConfig::default()
        })),
    };
    if settings.mirror {
        Ok(Box::new(Mirrored(source)))
    } else {
        Ok(source)
    }
}

pub fn is_image_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            IMAGE_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// Flips every frame of the wrapped source around the vertical axis.
pub struct Mirrored<S>(pub S);

impl<S: FrameSource> FrameSource for Mirrored<S> {
    fn describe(&self) -> String {
        format!("{} (mirrored)", self.0.describe())
    }

    fn connect(&mut self) -> Result<()> {
        self.0.connect()
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        Ok(self.0.next_frame()?.map(|mut frame| {
            frame.mirror();
            frame
        }))
    }

    fn release(&mut self) {
        self.0.release()
    }

    fn stats(&self) -> SourceStats {
        self.0.stats()
    }
}
