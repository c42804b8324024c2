//! V4L2 capture backend for [`super::CameraSource`].
//!
//! Requests RGB3 at the configured size. Drivers that refuse RGB3 usually offer YUYV or
//! NV12, which are converted to RGB24 in memory.

use anyhow::{anyhow, Context, Result};
use ouroboros::self_referencing;

use super::camera::CameraConfig;
use super::normalize::{normalize_to_rgb, PixelFormat};
use super::{FrameSource, SourceStats};
use crate::frame::Frame;

pub(crate) struct DeviceV4l2Source {
    config: CameraConfig,
    state: Option<DeviceV4l2State>,
    frame_count: u64,
    active_width: u32,
    active_height: u32,
    active_format: PixelFormat,
}

#[self_referencing]
struct DeviceV4l2State {
    device: v4l::Device,
    #[borrows(mut device)]
    #[covariant]
    stream: v4l::prelude::MmapStream<'this, v4l::Device>,
}

impl DeviceV4l2Source {
    pub(crate) fn new(config: CameraConfig) -> Self {
        Self {
            active_width: config.width,
            active_height: config.height,
            active_format: PixelFormat::Rgb24,
            config,
            state: None,
            frame_count: 0,
        }
    }
}

impl FrameSource for DeviceV4l2Source {
    fn describe(&self) -> String {
        self.config.device.clone()
    }

    fn connect(&mut self) -> Result<()> {
        use v4l::buffer::Type;
        use v4l::video::Capture;

        let mut device = v4l::Device::with_path(&self.config.device)
            .with_context(|| format!("open v4l2 device {}", self.config.device))?;
        let mut format = device.format().context("read v4l2 format")?;
        format.width = self.config.width;
        format.height = self.config.height;
        format.fourcc = v4l::FourCC::new(b"RGB3");

        let format = match device.set_format(&format) {
            Ok(format) => format,
            Err(err) => {
                log::warn!(
                    "CameraSource: failed to set format on {}: {}",
                    self.config.device,
                    err
                );
                device
                    .format()
                    .context("read v4l2 format after set failure")?
            }
        };

        let pixel_format = PixelFormat::from_fourcc(&format.fourcc.repr).ok_or_else(|| {
            anyhow!(
                "v4l2 device {} delivers unsupported pixel format {}",
                self.config.device,
                format.fourcc
            )
        })?;

        if self.config.target_fps > 0 {
            let params = v4l::video::capture::Parameters::with_fps(self.config.target_fps);
            if let Err(err) = device.set_params(&params) {
                log::warn!(
                    "CameraSource: failed to set fps on {}: {}",
                    self.config.device,
                    err
                );
            }
        }

        self.active_width = format.width;
        self.active_height = format.height;
        self.active_format = pixel_format;

        let state = DeviceV4l2StateBuilder {
            device,
            stream_builder: |device| {
                v4l::prelude::MmapStream::with_buffers(device, Type::VideoCapture, 4)
                    .map_err(|err| anyhow::Error::new(err).context("create v4l2 buffer stream"))
            },
        }
        .try_build()?;
        self.state = Some(state);

        log::info!(
            "CameraSource: connected to {} ({}x{}, {:?})",
            self.config.device,
            self.active_width,
            self.active_height,
            self.active_format
        );
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        use v4l::io::traits::CaptureStream;

        let state = self.state.as_mut().context("v4l2 device not connected")?;
        let (width, height, format) = (self.active_width, self.active_height, self.active_format);
        let captured = state.with_mut(|fields| {
            fields
                .stream
                .next()
                .map(|(buf, _meta)| normalize_to_rgb(buf, width, height, format))
        });
        let pixels = captured
            .map_err(|err| anyhow::Error::new(err).context("capture v4l2 frame"))??;

        let index = self.frame_count;
        self.frame_count += 1;
        Ok(Some(Frame::from_rgb_bytes(index, width, height, pixels)?))
    }

    fn release(&mut self) {
        if self.state.take().is_some() {
            log::info!("CameraSource: released {}", self.config.device);
        }
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frame_count,
            source: self.config.device.clone(),
        }
    }
}
