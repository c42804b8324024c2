//! visionkit
//!
//! Frame acquisition, detection, annotation and display, driven by one loop.
//!
//! # Architecture
//!
//! Every demo has the same shape: a **source** produces frames, a **processor** turns
//! each frame into regions or a composite, the **annotator** draws the regions, and a
//! **presenter** shows the result and reports key presses. The **loop controller** owns
//! the source and the presenter and releases both exactly once when the run ends.
//!
//! # Module Structure
//!
//! - `frame`: Frame, Region, DetectionRegion
//! - `ingest`: still image, image sequence, video file, camera and synthetic sources
//! - `detect`: cascade, color-range and DNN detectors behind `RegionDetector`
//! - `composite`: chroma-key compositing
//! - `track`: single-object trackers and the multi-tracker
//! - `annotate`: rectangles and labels
//! - `present`: window and headless presenters
//! - `pipeline`: the loop controller
//! - `cloud`: cloud vision request/response model and client
//! - `config`: layered run configuration
//!
//! Optional backends are behind cargo features: `ingest-file-ffmpeg`, `ingest-v4l2`,
//! `backend-opencv`, `backend-tract` and `cloud-vision`. The default build is pure Rust.

pub mod annotate;
pub mod cloud;
pub mod composite;
pub mod config;
#[cfg(feature = "backend-opencv")]
pub mod cv;
pub mod detect;
pub mod frame;
pub mod ingest;
pub mod pipeline;
pub mod present;
pub mod track;

pub use annotate::{annotated, overlays, render, Overlay, Style};
pub use composite::ChromaKey;
pub use config::{CommonArgs, RunConfig};
pub use detect::{DetectorKind, RegionDetector};
pub use frame::{DetectionRegion, Frame, Region};
pub use ingest::{open_source, FrameSource, InputSpec, SourceSettings};
pub use pipeline::{ExitStatus, LoopController, RunSummary, Views};
pub use present::{open_presenter, HeadlessPresenter, Presenter, PresenterEvent};
pub use track::{MultiTracker, Tracker, TrackerKind};
