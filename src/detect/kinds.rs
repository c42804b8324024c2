use std::path::PathBuf;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use super::backends::cascade::CascadeParams;
use crate::ingest::InputSpec;

/// Directory holding the bundled cascade files.
pub const CLASSIFIER_DIR: &str = "classifiers";

/// Pretrained cascade detectors known to the crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum DetectorKind {
    Face,
    CatFace,
    Eye,
}

impl DetectorKind {
    pub fn label(self) -> &'static str {
        match self {
            DetectorKind::Face => "Face",
            DetectorKind::CatFace => "Cat",
            DetectorKind::Eye => "Eye",
        }
    }

    pub fn cascade_file(self) -> &'static str {
        match self {
            DetectorKind::Face => "haarcascade_frontalface_default.xml",
            DetectorKind::CatFace => "haarcascade_frontalcatface.xml",
            DetectorKind::Eye => "haarcascade_eye.xml",
        }
    }

    /// Bundled location of the cascade file.
    pub fn default_cascade_path(self) -> PathBuf {
        PathBuf::from(CLASSIFIER_DIR).join(self.cascade_file())
    }

    /// Parameters tuned for live streams.
    pub fn default_params(self) -> CascadeParams {
        match self {
            DetectorKind::Face => CascadeParams {
                scale_factor: 1.1,
                min_neighbors: 5,
                min_size: 30,
            },
            DetectorKind::CatFace => CascadeParams {
                scale_factor: 1.05,
                min_neighbors: 4,
                min_size: 30,
            },
            DetectorKind::Eye => CascadeParams {
                scale_factor: 1.3,
                min_neighbors: 5,
                min_size: 20,
            },
        }
    }

    /// Parameters tuned for `input`. Face detection is stricter on still images and
    /// recorded video than on a live camera; the other kinds use one set everywhere.
    pub fn params_for(self, input: &InputSpec) -> CascadeParams {
        let live = self.default_params();
        match (self, input) {
            (DetectorKind::Face, InputSpec::Image(_)) => CascadeParams {
                scale_factor: 1.3,
                ..live
            },
            (DetectorKind::Face, InputSpec::Video(_) | InputSpec::Sequence(_)) => CascadeParams {
                scale_factor: 1.5,
                min_neighbors: 8,
                ..live
            },
            _ => live,
        }
    }

    /// Fail early when this build cannot construct the detector.
    pub fn ensure_available(self) -> Result<()> {
        if cfg!(feature = "backend-opencv") {
            Ok(())
        } else {
            bail!(
                "{} detector requires the backend-opencv feature",
                self.label().to_lowercase()
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_bundled_cascades() {
        assert_eq!(
            DetectorKind::CatFace.default_cascade_path(),
            PathBuf::from("classifiers/haarcascade_frontalcatface.xml")
        );
        for kind in [DetectorKind::Face, DetectorKind::CatFace, DetectorKind::Eye] {
            assert!(kind.default_params().validate().is_ok());
        }
    }

    #[test]
    fn face_params_follow_the_input() {
        let image = InputSpec::Image(PathBuf::from("group.jpg"));
        let video = InputSpec::Video("clip.mp4".to_string());
        let camera = InputSpec::Camera("/dev/video0".to_string());

        let on_image = DetectorKind::Face.params_for(&image);
        assert_eq!((on_image.scale_factor, on_image.min_neighbors), (1.3, 5));
        let on_video = DetectorKind::Face.params_for(&video);
        assert_eq!((on_video.scale_factor, on_video.min_neighbors), (1.5, 8));
        let on_camera = DetectorKind::Face.params_for(&camera);
        assert_eq!((on_camera.scale_factor, on_camera.min_neighbors), (1.1, 5));

        assert_eq!(
            DetectorKind::CatFace.params_for(&image),
            DetectorKind::CatFace.default_params()
        );
        assert_eq!(DetectorKind::Eye.params_for(&video), DetectorKind::Eye.default_params());
    }

    #[test]
    fn availability_tracks_the_opencv_feature() {
        let available = DetectorKind::Face.ensure_available();
        if cfg!(feature = "backend-opencv") {
            assert!(available.is_ok());
        } else {
            let err = available.expect_err("opencv missing");
            assert!(err.to_string().contains("backend-opencv"));
        }
    }
}
