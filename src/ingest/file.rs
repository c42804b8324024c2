//! Local video file source.
//!
//! `VideoSource` decodes frames from a local video file. `stub://` paths are served by
//! the synthetic scene so the playback path can run without a decoder. Real files need
//! the `ingest-file-ffmpeg` feature.

use anyhow::{anyhow, Result};

#[cfg(feature = "ingest-file-ffmpeg")]
use super::file_ffmpeg::FfmpegFileSource;
use super::synthetic::{SyntheticConfig, SyntheticSource};
use super::{FrameSource, SourceStats};
use crate::frame::Frame;

/// Configuration for a local file source.
#[derive(Clone, Debug)]
pub struct VideoConfig {
    /// Local file path (e.g., "videos/soccer.mp4").
    pub path: String,
    /// Frame budget when the path is a `stub://` URL.
    pub synthetic_frames: u64,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            path: String::new(),
            synthetic_frames: 300,
        }
    }
}

/// Local file frame source.
pub struct VideoSource {
    backend: VideoBackend,
}

enum VideoBackend {
    Synthetic(SyntheticSource),
    #[cfg(feature = "ingest-file-ffmpeg")]
    Ffmpeg(Box<FfmpegFileSource>),
}

impl VideoSource {
    pub fn new(config: VideoConfig) -> Result<Self> {
        if !is_local_file_path(&config.path) {
            return Err(anyhow!(
                "video playback only supports local paths (no URL schemes)"
            ));
        }
        if config.path.starts_with("stub://") {
            Ok(Self {
                backend: VideoBackend::Synthetic(SyntheticSource::new(SyntheticConfig {
                    name: config.path.clone(),
                    frames: config.synthetic_frames,
                    ..SyntheticConfig::default()
                })),
            })
        } else {
            #[cfg(feature = "ingest-file-ffmpeg")]
            {
                Ok(Self {
                    backend: VideoBackend::Ffmpeg(Box::new(FfmpegFileSource::new(config)?)),
                })
            }
            #[cfg(not(feature = "ingest-file-ffmpeg"))]
            {
                Err(anyhow!(
                    "video file '{}' requires the ingest-file-ffmpeg feature",
                    config.path
                ))
            }
        }
    }

    fn inner(&self) -> &dyn FrameSource {
        match &self.backend {
            VideoBackend::Synthetic(source) => source,
            #[cfg(feature = "ingest-file-ffmpeg")]
            VideoBackend::Ffmpeg(source) => source.as_ref(),
        }
    }

    fn inner_mut(&mut self) -> &mut dyn FrameSource {
        match &mut self.backend {
            VideoBackend::Synthetic(source) => source,
            #[cfg(feature = "ingest-file-ffmpeg")]
            VideoBackend::Ffmpeg(source) => source.as_mut(),
        }
    }
}

impl FrameSource for VideoSource {
    fn describe(&self) -> String {
        self.inner().describe()
    }

    fn connect(&mut self) -> Result<()> {
        self.inner_mut().connect()
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

fn is_local_file_path(path: &str) -> bool {
    if path.trim().is_empty() {
        return false;
    }
    if path.starts_with("stub://") {
        return true;
    }
    !path.contains("://")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_urls_and_empty_paths() {
        assert!(VideoSource::new(VideoConfig {
            path: "rtsp://camera/stream".to_string(),
            ..VideoConfig::default()
        })
        .is_err());
        assert!(VideoSource::new(VideoConfig::default()).is_err());
    }

    #[test]
    fn stub_path_plays_synthetic_frames() -> Result<()> {
        let mut source = VideoSource::new(VideoConfig {
            path: "stub://clip".to_string(),
            synthetic_frames: 2,
        })?;
        source.connect()?;
        assert!(source.next_frame()?.is_some());
        assert!(source.next_frame()?.is_some());
        assert!(source.next_frame()?.is_none());
        assert_eq!(source.stats().frames_captured, 2);
        assert_eq!(source.describe(), "stub://clip");
        Ok(())
    }

    #[cfg(not(feature = "ingest-file-ffmpeg"))]
    #[test]
    fn real_files_need_ffmpeg_feature() {
        let err = VideoSource::new(VideoConfig {
            path: "videos/soccer.mp4".to_string(),
            ..VideoConfig::default()
        })
        .err()
        .expect("missing feature must be reported");
        assert!(err.to_string().contains("ingest-file-ffmpeg"));
    }
}
