//! Local file frame source using FFmpeg.
//!
//! Frames are decoded in-memory and converted to RGB24. End of file drains the decoder
//! and then reports end of stream.

use anyhow::{Context, Result};
use ffmpeg_next as ffmpeg;

use super::file::VideoConfig;
use super::{FrameSource, SourceStats};
use crate::frame::Frame;

pub(crate) struct FfmpegFileSource {
    config: VideoConfig,
    input: ffmpeg::format::context::Input,
    stream_index: usize,
    decoder: ffmpeg::codec::decoder::Video,
    scaler: ffmpeg::software::scaling::Context,
    frame_count: u64,
    eof_sent: bool,
    connected: bool,
}

impl FfmpegFileSource {
    pub(crate) fn new(config: VideoConfig) -> Result<Self> {
        ffmpeg::init().context("initialize ffmpeg")?;
        let input = ffmpeg::format::input(&config.path)
            .with_context(|| format!("failed to open video '{}' with ffmpeg", config.path))?;
        let input_stream = input
            .streams()
            .best(ffmpeg::media::Type::Video)
            .ok_or_else(|| anyhow::anyhow!("file has no video track"))?;
        let stream_index = input_stream.index();
        let context = ffmpeg::codec::context::Context::from_parameters(input_stream.parameters())
            .context("load video decoder parameters")?;
        let decoder = context
            .decoder()
            .video()
            .context("open ffmpeg video decoder")?;

        let scaler = ffmpeg::software::scaling::context::Context::get(
            decoder.format(),
            decoder.width(),
            decoder.height(),
            ffmpeg::util::format::pixel::Pixel::RGB24,
            decoder.width(),
            decoder.height(),
            ffmpeg::software::scaling::flag::Flags::BILINEAR,
        )
        .context("create ffmpeg scaler")?;

        Ok(Self {
            config,
            input,
            stream_index,
            decoder,
            scaler,
            frame_count: 0,
            eof_sent: false,
            connected: false,
        })
    }

    fn receive_decoded(&mut self) -> Result<Option<Frame>> {
        let mut decoded = ffmpeg::frame::Video::empty();
        if self.decoder.receive_frame(&mut decoded).is_err() {
            return Ok(None);
        }
        let mut rgb_frame = ffmpeg::frame::Video::empty();
        self.scaler
            .run(&decoded, &mut rgb_frame)
            .context("scale frame to RGB")?;
        let (pixels, width, height) = frame_to_pixels(&rgb_frame)?;

        let index = self.frame_count;
        self.frame_count += 1;
        Ok(Some(Frame::from_rgb_bytes(index, width, height, pixels)?))
    }
}

impl FrameSource for FfmpegFileSource {
    fn describe(&self) -> String {
        self.config.path.clone()
    }

    fn connect(&mut self) -> Result<()> {
        self.connected = true;
        log::info!(
            "VideoSource: opened {} ({}x{}, ffmpeg)",
            self.config.path,
            self.decoder.width(),
            self.decoder.height()
        );
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        if let Some(frame) = self.receive_decoded()? {
            return Ok(Some(frame));
        }

        let mut pending = Vec::new();
        for (stream, packet) in self.input.packets() {
            if stream.index() != self.stream_index {
                continue;
            }
            pending.push(packet);
            break;
        }

        if let Some(packet) = pending.pop() {
            self.decoder
                .send_packet(&packet)
                .context("send packet to ffmpeg decoder")?;
            return match self.receive_decoded()? {
                Some(frame) => Ok(Some(frame)),
                // Decoder needs more input before it emits the next frame.
                None => self.next_frame(),
            };
        }

        if !self.eof_sent {
            self.decoder.send_eof().context("flush ffmpeg decoder")?;
            self.eof_sent = true;
        }
        let frame = self.receive_decoded()?;
        if frame.is_none() {
            log::info!(
                "VideoSource: end of {} after {} frames",
                self.config.path,
                self.frame_count
            );
        }
        Ok(frame)
    }

    fn release(&mut self) {
        if std::mem::take(&mut self.connected) {
            log::info!("VideoSource: released {}", self.config.path);
        }
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frame_count,
            source: self.config.path.clone(),
        }
    }
}

fn frame_to_pixels(frame: &ffmpeg::frame::Video) -> Result<(Vec<u8>, u32, u32)> {
    let width = frame.width();
    let height = frame.height();
    let row_bytes = (width as usize) * 3;
    let stride = frame.stride(0);
    let data = frame.data(0);

    if stride == row_bytes {
        return Ok((data[..row_bytes * height as usize].to_vec(), width, height));
    }

    let mut pixels = Vec::with_capacity(row_bytes * height as usize);
    for row in 0..height as usize {
        let start = row * stride;
        let end = start + row_bytes;
        pixels.extend_from_slice(
            data.get(start..end)
                .context("ffmpeg frame row is out of bounds")?,
        );
    }

    Ok((pixels, width, height))
}
