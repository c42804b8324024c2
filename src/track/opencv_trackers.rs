use anyhow::{bail, Context, Result};
use opencv::core::Ptr;
use opencv::prelude::*;
use opencv::tracking::{TrackerCSRT, TrackerCSRT_Params, TrackerKCF, TrackerKCF_Params};
use opencv::video::{TrackerMIL, TrackerMIL_Params};

use super::{Tracker, TrackerKind};
use crate::cv::{frame_to_bgr_mat, rect_to_region, region_to_rect};
use crate::frame::{Frame, Region};

enum Inner {
    Csrt(Ptr<TrackerCSRT>),
    Kcf(Ptr<TrackerKCF>),
    Mil(Ptr<TrackerMIL>),
}

/// Tracker backed by one of OpenCV's built-in algorithms.
pub struct OpencvTracker {
    kind: TrackerKind,
    inner: Inner,
    last: Region,
}

impl OpencvTracker {
    pub fn new(kind: TrackerKind) -> Result<Self> {
        let inner = match kind {
            TrackerKind::Csrt => Inner::Csrt(
                TrackerCSRT::create(&TrackerCSRT_Params::default()?)
                    .context("failed to create CSRT tracker")?,
            ),
            TrackerKind::Kcf => Inner::Kcf(
                TrackerKCF::create(TrackerKCF_Params::default()?)
                    .context("failed to create KCF tracker")?,
            ),
            TrackerKind::Mil => Inner::Mil(
                TrackerMIL::create(TrackerMIL_Params::default()?)
                    .context("failed to create MIL tracker")?,
            ),
            TrackerKind::Template => bail!("template tracker is not an OpenCV tracker"),
        };
        Ok(Self {
            kind,
            inner,
            last: Region::default(),
        })
    }
}

impl Tracker for OpencvTracker {
    fn name(&self) -> &'static str {
        self.kind.name()
    }

    fn init(&mut self, frame: &Frame, region: Region) -> Result<()> {
        let mat = frame_to_bgr_mat(frame)?;
        let rect = region_to_rect(region);
        match &mut self.inner {
            Inner::Csrt(tracker) => tracker.init(&mat, rect),
            Inner::Kcf(tracker) => tracker.init(&mat, rect),
            Inner::Mil(tracker) => tracker.init(&mat, rect),
        }
        .with_context(|| format!("failed to initialise {} tracker", self.kind.name()))?;
        self.last = region;
        Ok(())
    }

    fn update(&mut self, frame: &Frame) -> Result<Option<Region>> {
        let mat = frame_to_bgr_mat(frame)?;
        let mut rect = region_to_rect(self.last);
        let found = match &mut self.inner {
            Inner::Csrt(tracker) => tracker.update(&mat, &mut rect),
            Inner::Kcf(tracker) => tracker.update(&mat, &mut rect),
            Inner::Mil(tracker) => tracker.update(&mat, &mut rect),
        }
        .with_context(|| format!("{} tracker update failed", self.kind.name()))?;
        if !found {
            return Ok(None);
        }
        self.last = rect_to_region(rect);
        Ok(Some(self.last))
    }
}
