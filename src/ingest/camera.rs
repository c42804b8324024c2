//! Live camera source.
//!
//! `CameraSource` wraps a V4L2 capture device. A device path starting with `stub://`
//! selects the synthetic scene instead, so the live-camera code path can run in tests.

use anyhow::{anyhow, Result};

use super::synthetic::{SyntheticConfig, SyntheticSource};
#[cfg(feature = "ingest-v4l2")]
use super::v4l2::DeviceV4l2Source;
use super::{FrameSource, SourceStats};
use crate::frame::Frame;

/// Configuration for a camera source.
#[derive(Clone, Debug)]
pub struct CameraConfig {
    /// Device path (e.g., "/dev/video0")
    pub device: String,
    /// Requested frame rate. Zero leaves the device default.
    pub target_fps: u32,
    /// Preferred frame width.
    pub width: u32,
    /// Preferred frame height.
    pub height: u32,
    /// Frame budget for `stub://` devices.
    pub synthetic_frames: u64,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            device: super::DEFAULT_CAMERA_DEVICE.to_string(),
            target_fps: 30,
            width: 640,
            height: 480,
            synthetic_frames: 300,
        }
    }
}

/// Camera frame source.
pub struct CameraSource {
    backend: CameraBackend,
}

enum CameraBackend {
    Synthetic(SyntheticSource),
    #[cfg(feature = "ingest-v4l2")]
    Device(DeviceV4l2Source),
}

impl CameraSource {
    pub fn new(config: CameraConfig) -> Result<Self> {
        if config.device.starts_with("stub://") {
            return Ok(Self {
                backend: CameraBackend::Synthetic(SyntheticSource::new(SyntheticConfig {
                    name: config.device.clone(),
                    width: config.width,
                    height: config.height,
                    frames: config.synthetic_frames,
                    ..SyntheticConfig::default()
                })),
            });
        }
        #[cfg(feature = "ingest-v4l2")]
        {
            Ok(Self {
                backend: CameraBackend::Device(DeviceV4l2Source::new(config)),
            })
        }
        #[cfg(not(feature = "ingest-v4l2"))]
        {
            Err(anyhow!(
                "camera device '{}' requires the ingest-v4l2 feature",
                config.device
            ))
        }
    }

    fn inner(&self) -> &dyn FrameSource {
        match &self.backend {
            CameraBackend::Synthetic(source) => source,
            #[cfg(feature = "ingest-v4l2")]
            CameraBackend::Device(source) => source,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn FrameSource {
        match &mut self.backend {
            CameraBackend::Synthetic(source) => source,
            #[cfg(feature = "ingest-v4l2")]
            CameraBackend::Device(source) => source,
        }
    }
}

impl FrameSource for CameraSource {
    fn describe(&self) -> String {
        self.inner().describe()
    }

    fn connect(&mut self) -> Result<()> {
        self.inner_mut()
            .connect()
            .map_err(|err| anyhow!("could not open camera: {err:#}"))
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        self.inner_mut().next_frame()
    }

    fn release(&mut self) {
        self.inner_mut().release()
    }

    fn stats(&self) -> SourceStats {
        self.inner().stats()
    }
}
