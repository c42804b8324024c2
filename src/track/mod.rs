//! Object trackers.
//!
//! A [`Tracker`] follows one object from an initial box. [`MultiTracker`] owns a set of
//! independent trackers; a tracker that loses its target or fails contributes no box for
//! that frame and never disturbs the others.

#[cfg(feature = "backend-opencv")]
mod opencv_trackers;
mod template;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::frame::{DetectionRegion, Frame, Region};

#[cfg(feature = "backend-opencv")]
pub use opencv_trackers::OpencvTracker;
pub use template::{TemplateParams, TemplateTracker};

/// Single-object tracker.
pub trait Tracker {
    fn name(&self) -> &'static str;

    /// Start tracking `region` in `frame`.
    fn init(&mut self, frame: &Frame, region: Region) -> Result<()>;

    /// New position in `frame`, `None` when the target was lost this frame.
    fn update(&mut self, frame: &Frame) -> Result<Option<Region>>;
}

impl<T: Tracker + ?Sized> Tracker for Box<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn init(&mut self, frame: &Frame, region: Region) -> Result<()> {
        (**self).init(frame, region)
    }

    fn update(&mut self, frame: &Frame) -> Result<Option<Region>> {
        (**self).update(frame)
    }
}

/// Tracker algorithms selectable from the command line.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TrackerKind {
    #[default]
    Csrt,
    Kcf,
    Mil,
    /// Native grayscale template matching, available in every build.
    Template,
}

impl TrackerKind {
    pub fn name(self) -> &'static str {
        match self {
            TrackerKind::Csrt => "csrt",
            TrackerKind::Kcf => "kcf",
            TrackerKind::Mil => "mil",
            TrackerKind::Template => "template",
        }
    }

    pub fn requires_opencv(self) -> bool {
        !matches!(self, TrackerKind::Template)
    }

    /// Fail early when this build cannot construct the tracker.
    pub fn ensure_available(self) -> Result<()> {
        if self.requires_opencv() && !cfg!(feature = "backend-opencv") {
            bail!(
                "{} tracker requires the backend-opencv feature (use --tracker template)",
                self.name()
            );
        }
        Ok(())
    }

    pub fn create(self) -> Result<Box<dyn Tracker>> {
        self.ensure_available()?;
        match self {
            TrackerKind::Template => Ok(Box::new(TemplateTracker::new(TemplateParams::default()))),
            #[cfg(feature = "backend-opencv")]
            kind => Ok(Box::new(OpencvTracker::new(kind)?)),
            #[cfg(not(feature = "backend-opencv"))]
            kind => bail!("{} tracker is not available in this build", kind.name()),
        }
    }
}

/// Box reported by one tracker for the current frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TrackedBox {
    pub id: usize,
    pub region: Region,
}

impl From<TrackedBox> for DetectionRegion {
    fn from(tracked: TrackedBox) -> Self {
        DetectionRegion::new(tracked.region)
    }
}

struct TrackerHandle {
    id: usize,
    tracker: Box<dyn Tracker>,
    failures: u64,
}

/// Independent trackers updated together.
#[derive(Default)]
pub struct MultiTracker {
    handles: Vec<TrackerHandle>,
    next_id: usize,
}

impl MultiTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Create a tracker of `kind` on `region` and add it. Returns its id.
    pub fn add(&mut self, kind: TrackerKind, frame: &Frame, region: Region) -> Result<usize> {
        self.add_tracker(kind.create()?, frame, region)
    }

    /// Initialise `tracker` on `region` and add it. Returns its id.
    pub fn add_tracker(
        &mut self,
        mut tracker: Box<dyn Tracker>,
        frame: &Frame,
        region: Region,
    ) -> Result<usize> {
        if region.clamp_to(frame.width(), frame.height()).is_none() {
            bail!("tracker region {:?} lies outside the frame", region);
        }
        tracker.init(frame, region)?;
        let id = self.next_id;
        self.next_id += 1;
        log::info!(
            "MultiTracker: added {} tracker #{} at {:?}",
            tracker.name(),
            id,
            region
        );
        self.handles.push(TrackerHandle {
            id,
            tracker,
            failures: 0,
        });
        Ok(id)
    }

    /// Update every tracker. Lost or failing trackers contribute no box.
    pub fn update(&mut self, frame: &Frame) -> Vec<TrackedBox> {
        let mut boxes = Vec::with_capacity(self.handles.len());
        for handle in &mut self.handles {
            match handle.tracker.update(frame) {
                Ok(Some(region)) => boxes.push(TrackedBox {
                    id: handle.id,
                    region,
                }),
                Ok(None) => {
                    log::debug!("MultiTracker: #{} lost target on frame {}", handle.id, frame.index());
                }
                Err(err) => {
                    handle.failures += 1;
                    log::warn!(
                        "MultiTracker: #{} failed on frame {} ({} failures): {:#}",
                        handle.id,
                        frame.index(),
                        handle.failures,
                        err
                    );
                }
            }
        }
        boxes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    /// Reports a fixed box, or fails / loses the target on chosen frames.
    struct ScriptedTracker {
        region: Region,
        fail_on: Option<u64>,
        lose_on: Option<u64>,
    }

    impl Tracker for ScriptedTracker {
        fn name(&self) -> &'static str {
            "scripted"
        }

        fn init(&mut self, _frame: &Frame, region: Region) -> Result<()> {
            self.region = region;
            Ok(())
        }

        fn update(&mut self, frame: &Frame) -> Result<Option<Region>> {
            if self.fail_on == Some(frame.index()) {
                bail!("scripted failure");
            }
            if self.lose_on == Some(frame.index()) {
                return Ok(None);
            }
            Ok(Some(self.region))
        }
    }

    fn scripted(fail_on: Option<u64>, lose_on: Option<u64>) -> Box<dyn Tracker> {
        Box::new(ScriptedTracker {
            region: Region::default(),
            fail_on,
            lose_on,
        })
    }

    fn frame(index: u64) -> Frame {
        Frame::new(index, RgbImage::new(50, 50))
    }

    #[test]
    fn failing_tracker_is_skipped_and_others_survive() -> Result<()> {
        let mut trackers = MultiTracker::new();
        let a = trackers.add_tracker(scripted(Some(1), None), &frame(0), Region::new(0, 0, 5, 5))?;
        let b = trackers.add_tracker(scripted(None, Some(2)), &frame(0), Region::new(9, 9, 5, 5))?;
        assert_eq!((a, b), (0, 1));

        assert_eq!(trackers.update(&frame(0)).len(), 2);

        let boxes = trackers.update(&frame(1));
        assert_eq!(boxes, vec![TrackedBox { id: b, region: Region::new(9, 9, 5, 5) }]);

        let boxes = trackers.update(&frame(2));
        assert_eq!(boxes, vec![TrackedBox { id: a, region: Region::new(0, 0, 5, 5) }]);

        assert_eq!(trackers.update(&frame(3)).len(), 2);
        assert_eq!(trackers.len(), 2);
        Ok(())
    }

    #[test]
    fn region_outside_frame_is_rejected() {
        let mut trackers = MultiTracker::new();
        let result = trackers.add_tracker(scripted(None, None), &frame(0), Region::new(60, 60, 5, 5));
        assert!(result.is_err());
        assert!(trackers.is_empty());
    }

    #[test]
    fn template_tracker_is_always_available() -> Result<()> {
        TrackerKind::Template.ensure_available()?;
        let tracker = TrackerKind::Template.create()?;
        assert_eq!(tracker.name(), "template");
        if !cfg!(feature = "backend-opencv") {
            assert!(TrackerKind::Csrt.ensure_available().is_err());
        }
        Ok(())
    }
}
