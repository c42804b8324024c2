//! color_track - follow the largest region of a color range

use anyhow::Result;
use clap::Parser;

use visionkit::annotate::{self, Style, GREEN};
use visionkit::detect::{ColorPreset, ColorTracker, RegionDetector};
use visionkit::present::install_interrupt_flag;
use visionkit::{CommonArgs, Frame, LoopController, RunConfig, Views};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    #[command(flatten)]
    common: CommonArgs,
    /// Show the in-range mask in a second view.
    #[arg(short, long)]
    threshold: bool,
    /// Color to follow (overrides the configured range).
    #[arg(short, long, value_enum)]
    preset: Option<ColorPreset>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let cfg = RunConfig::load_with(&args.common, |cfg| {
        cfg.default_title("Object tracking");
        if let Some(preset) = args.preset {
            cfg.color.preset = preset;
            cfg.color.custom = None;
        }
    })?;

    let mut tracker = ColorTracker::new(cfg.color.ranges())?;
    let style = Style::new(GREEN);

    let interrupt = install_interrupt_flag()?;
    let source = cfg.open_source()?;
    let presenter = cfg.open_presenter(interrupt)?;

    let summary = LoopController::new(source, presenter)
        .with_poll_timeout(cfg.poll_timeout())
        .run(|frame| {
            let regions = tracker.detect(frame)?;
            let mut views = Views::new(annotate::annotated(frame, &regions, &style));
            if args.threshold {
                if let Some(mask) = tracker.last_mask() {
                    views = views.with_extra("threshold", Frame::from_gray(frame.index(), mask));
                }
            }
            Ok(views)
        })?;

    log::info!(
        "color_track finished: {:?} after {} frames",
        summary.status,
        summary.frames
    );
    Ok(())
}
