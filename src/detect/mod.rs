//! Region detectors.
//!
//! Every detector implements [`RegionDetector`]. Construction failures (missing model
//! file, backend not compiled in, malformed parameters) surface before the loop starts.

mod backend;
mod backends;
pub mod classify;
mod kinds;

pub use backend::RegionDetector;
pub use backends::color;
pub use backends::{
    CascadeDetector, CascadeParams, ColorPreset, ColorRange, ColorSpace, ColorTracker,
    NestedDetector, NestedRegions, RangeSet, StubDetector,
};
#[cfg(feature = "backend-tract")]
pub use backends::{AgeGenderClassifier, SsdFaceDetector};
pub use kinds::{DetectorKind, CLASSIFIER_DIR};

/// Directory holding the bundled DNN models.
pub const MODEL_DIR: &str = "models";

/// Fail early when this build cannot run DNN inference.
pub fn ensure_dnn_available() -> anyhow::Result<()> {
    if cfg!(feature = "backend-tract") {
        Ok(())
    } else {
        anyhow::bail!("DNN inference requires the backend-tract feature")
    }
}
