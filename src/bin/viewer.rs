//! viewer - show an image, video, image directory or camera stream

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use visionkit::present::install_interrupt_flag;
use visionkit::{CommonArgs, Frame, InputSpec, LoopController, RunConfig, Views};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    #[command(flatten)]
    common: CommonArgs,
    /// Log size, channel count and the first pixel of the first frame, and show a
    /// modified copy next to it.
    #[arg(long)]
    info: bool,
    /// Write the modified copy of the first frame to this path.
    #[arg(long)]
    save: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let cfg = RunConfig::load_with(&args.common, |cfg| {
        let title = match cfg.input_spec() {
            InputSpec::Image(_) => "Image Visualizer",
            InputSpec::Camera(_) => "Webcam Visualizer",
            _ => "Video Visualizer",
        };
        cfg.default_title(title);
    })?;
    let still = matches!(cfg.input_spec(), InputSpec::Image(_));

    let interrupt = install_interrupt_flag()?;
    let source = cfg.open_source()?;
    let presenter = cfg.open_presenter(interrupt)?;

    let mut first = true;
    let summary = LoopController::new(source, presenter)
        .with_poll_timeout(cfg.poll_timeout())
        .hold_last_frame(still)
        .run(|frame| {
            let mut views = Views::new(frame.clone());
            if first && (args.info || args.save.is_some()) {
                let copy = modified_copy(frame, args.info);
                if let Some(path) = &args.save {
                    copy.pixels()
                        .save(path)
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    log::info!("wrote {}", path.display());
                }
                if args.info {
                    views = views.with_extra("Modified Image", copy);
                }
            }
            first = false;
            Ok(views)
        })?;

    log::info!(
        "viewer finished: {:?} after {} frames",
        summary.status,
        summary.frames
    );
    Ok(())
}

/// Copy of `frame` with the first pixel set to red and the top-left block blacked out.
fn modified_copy(frame: &Frame, log_info: bool) -> Frame {
    if log_info {
        log::info!("Width: {} pixels", frame.width());
        log::info!("Height: {} pixels", frame.height());
        log::info!("Channels: {}", frame.channels());
        log_origin(frame);
    }
    let mut copy = frame.clone();
    copy.mark_origin();
    if log_info {
        log_origin(&copy);
    }
    copy.black_out_corner();
    copy
}

fn log_origin(frame: &Frame) {
    if let Some(pixel) = frame.pixel(0, 0) {
        let [r, g, b] = pixel.0;
        log::info!("Pixel at (0,0) - RGB: ({r}, {g}, {b})");
    }
}
