pub mod cascade;
pub mod color;
mod stub;
#[cfg(feature = "backend-tract")]
mod tract;

pub use cascade::{CascadeDetector, CascadeParams, NestedDetector, NestedRegions};
pub use color::{ColorPreset, ColorRange, ColorSpace, ColorTracker, RangeSet};
pub use stub::StubDetector;
#[cfg(feature = "backend-tract")]
pub use tract::{AgeGenderClassifier, SsdFaceDetector};
