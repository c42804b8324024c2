//! multi_track - follow several user-selected objects
//!
//! Press `s` to pause on the current frame and select a new object; `q` or ESC quits.
//! Headless runs take their boxes from `tracker.initial_boxes` or
//! `VISIONKIT_TRACKER_BOXES` instead.

use anyhow::Result;
use clap::Parser;
use std::cell::RefCell;

use visionkit::annotate::{self, Style, GREEN};
use visionkit::present::install_interrupt_flag;
use visionkit::{CommonArgs, DetectionRegion, LoopController, MultiTracker, RunConfig, TrackerKind};

const SELECT_KEY: char = 's';

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    #[command(flatten)]
    common: CommonArgs,
    /// Tracker algorithm for new selections.
    #[arg(short, long, value_enum)]
    tracker: Option<TrackerKind>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let cfg = RunConfig::load_with(&args.common, |cfg| {
        cfg.default_title("Multi Tracking");
        if let Some(kind) = args.tracker {
            cfg.tracker.kind = kind;
        }
    })?;
    let kind = cfg.tracker.kind;
    kind.ensure_available()?;

    let trackers = RefCell::new(MultiTracker::new());
    let mut pending = Some(cfg.tracker.initial_boxes.clone());
    let style = Style::new(GREEN);

    let interrupt = install_interrupt_flag()?;
    let source = cfg.open_source()?;
    let presenter = cfg.open_presenter(interrupt)?;

    let summary = LoopController::new(source, presenter)
        .with_poll_timeout(cfg.poll_timeout())
        .on_key(|key, frame, presenter| {
            if key != SELECT_KEY {
                return Ok(());
            }
            match presenter.select_region(frame)? {
                Some(region) => {
                    if let Err(err) = trackers.borrow_mut().add(kind, frame, region) {
                        log::warn!("could not track {:?}: {:#}", region, err);
                    }
                }
                None => log::info!("selection cancelled"),
            }
            Ok(())
        })
        .run(|frame| {
            let mut trackers = trackers.borrow_mut();
            for region in pending.take().unwrap_or_default() {
                if let Err(err) = trackers.add(kind, frame, region) {
                    log::warn!("could not track {:?}: {:#}", region, err);
                }
            }
            let boxes: Vec<DetectionRegion> = trackers
                .update(frame)
                .into_iter()
                .map(DetectionRegion::from)
                .collect();
            Ok(annotate::annotated(frame, &boxes, &style))
        })?;

    log::info!(
        "multi_track finished: {:?} after {} frames, {} tracker(s)",
        summary.status,
        summary.frames,
        trackers.borrow().len()
    );
    Ok(())
}
