use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use anyhow::Result;

use visionkit::annotate::{self, Style, GREEN};
use visionkit::detect::{ColorPreset, ColorTracker, RegionDetector};
use visionkit::ingest::{SourceStats, SyntheticConfig, SyntheticSource};
use visionkit::{
    ExitStatus, Frame, FrameSource, HeadlessPresenter, LoopController, MultiTracker, Region,
    TrackerKind, Views,
};

const TICK: Duration = Duration::from_millis(1);

fn synthetic(frames: u64) -> SyntheticSource {
    SyntheticSource::new(SyntheticConfig {
        width: 160,
        height: 120,
        frames,
        marker_size: 20,
        step: 4,
        ..SyntheticConfig::default()
    })
}

/// Counts lifecycle calls on the wrapped source.
struct CountingSource {
    inner: SyntheticSource,
    connects: Rc<Cell<u32>>,
    releases: Rc<Cell<u32>>,
}

impl FrameSource for CountingSource {
    fn describe(&self) -> String {
        self.inner.describe()
    }

    fn connect(&mut self) -> Result<()> {
        self.connects.set(self.connects.get() + 1);
        self.inner.connect()
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        self.inner.next_frame()
    }

    fn release(&mut self) {
        self.releases.set(self.releases.get() + 1);
        self.inner.release()
    }

    fn stats(&self) -> SourceStats {
        self.inner.stats()
    }
}

#[test]
fn bounded_stream_ends_and_releases_once() -> Result<()> {
    let connects = Rc::new(Cell::new(0));
    let releases = Rc::new(Cell::new(0));
    let source = CountingSource {
        inner: synthetic(3),
        connects: connects.clone(),
        releases: releases.clone(),
    };

    let summary = LoopController::new(source, HeadlessPresenter::new("count"))
        .with_poll_timeout(TICK)
        .run(|frame| Ok(frame.clone()))?;

    assert_eq!(summary.status, ExitStatus::EndOfStream);
    assert_eq!(summary.frames, 3);
    assert_eq!(connects.get(), 1);
    assert_eq!(releases.get(), 1);
    Ok(())
}

#[test]
fn headless_run_writes_main_and_extra_views() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let presenter = HeadlessPresenter::new("Object tracking").with_output_dir(dir.path().to_path_buf())?;
    let mut tracker = ColorTracker::new(ColorPreset::Yellow.ranges())?;
    let style = Style::new(GREEN);

    let summary = LoopController::new(synthetic(2), presenter)
        .with_poll_timeout(TICK)
        .run(|frame| {
            let regions = tracker.detect(frame)?;
            assert_eq!(regions.len(), 1);
            let mut views = Views::new(annotate::annotated(frame, &regions, &style));
            if let Some(mask) = tracker.last_mask() {
                views = views.with_extra("threshold", Frame::from_gray(frame.index(), mask));
            }
            Ok(views)
        })?;

    assert_eq!(summary.frames, 2);
    for name in [
        "object_tracking-000000.png",
        "object_tracking-000001.png",
        "object_tracking-threshold-000000.png",
        "object_tracking-threshold-000001.png",
    ] {
        assert!(dir.path().join(name).is_file(), "missing {name}");
    }
    Ok(())
}

#[test]
fn scripted_quit_key_stops_early() -> Result<()> {
    let presenter = HeadlessPresenter::new("quit").with_key(2, 'q');
    let summary = LoopController::new(synthetic(50), presenter)
        .with_poll_timeout(TICK)
        .run(|frame| Ok(frame.clone()))?;

    assert_eq!(summary.status, ExitStatus::QuitRequested);
    assert_eq!(summary.frames, 2);
    Ok(())
}

#[test]
fn selected_region_is_tracked_across_frames() -> Result<()> {
    let scene = synthetic(6);
    let start = scene.marker_region(0);
    let expected_last = scene.marker_region(5);

    let presenter = HeadlessPresenter::new("Multi Tracking")
        .with_key(1, 's')
        .with_selection(start);
    let trackers = RefCell::new(MultiTracker::new());
    let mut last_boxes = Vec::new();

    let summary = LoopController::new(scene, presenter)
        .with_poll_timeout(TICK)
        .on_key(|key, frame, presenter| {
            assert_eq!(key, 's');
            if let Some(region) = presenter.select_region(frame)? {
                trackers.borrow_mut().add(TrackerKind::Template, frame, region)?;
            }
            Ok(())
        })
        .run(|frame| {
            last_boxes = trackers.borrow_mut().update(frame);
            Ok(frame.clone())
        })?;

    assert_eq!(summary.status, ExitStatus::EndOfStream);
    assert_eq!(trackers.borrow().len(), 1);
    assert_eq!(last_boxes.len(), 1);
    assert_eq!(last_boxes[0].region, expected_last);
    Ok(())
}

#[test]
fn failing_processor_still_releases_source() {
    let releases = Rc::new(Cell::new(0));
    let source = CountingSource {
        inner: synthetic(10),
        connects: Rc::new(Cell::new(0)),
        releases: releases.clone(),
    };

    let result = LoopController::new(source, HeadlessPresenter::new("fail"))
        .with_poll_timeout(TICK)
        .run(|frame| -> Result<Frame> {
            if frame.index() == 1 {
                anyhow::bail!("detector exploded");
            }
            Ok(frame.clone())
        });

    let err = result.expect_err("processing error propagates");
    assert!(format!("{err:#}").contains("detector exploded"));
    assert_eq!(releases.get(), 1);
}

#[test]
fn regions_outside_frame_are_rejected_by_multi_tracker() -> Result<()> {
    let mut scene = synthetic(1);
    scene.connect()?;
    let frame = scene.next_frame()?.expect("frame");
    let mut trackers = MultiTracker::new();
    assert!(trackers
        .add(TrackerKind::Template, &frame, Region::new(500, 500, 10, 10))
        .is_err());
    assert!(trackers.is_empty());
    Ok(())
}
