//! cloak - replace a key color with the background captured at startup

use anyhow::Result;
use clap::Parser;

use visionkit::composite::{capture_background, mask_coverage, ChromaKey};
use visionkit::detect::ColorPreset;
use visionkit::present::install_interrupt_flag;
use visionkit::{CommonArgs, LoopController, RunConfig};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    #[command(flatten)]
    common: CommonArgs,
    /// Cloak color.
    #[arg(short, long, value_enum)]
    preset: Option<ColorPreset>,
    /// Frames read before the background is kept.
    #[arg(short, long)]
    warmup: Option<u32>,
    /// Skip the morphological clean-up of the mask.
    #[arg(long)]
    raw_mask: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let cfg = RunConfig::load_with(&args.common, |cfg| {
        cfg.default_title("Harry Potter");
        if let Some(preset) = args.preset {
            cfg.cloak.preset = preset;
        }
        if let Some(warmup) = args.warmup {
            cfg.cloak.warmup_frames = warmup;
        }
        if args.raw_mask {
            cfg.cloak.refine = false;
        }
    })?;
    let ranges = cfg.cloak.preset.ranges();

    let interrupt = install_interrupt_flag()?;
    let source = cfg.open_source()?;
    let presenter = cfg.open_presenter(interrupt)?;

    let summary = LoopController::new(source, presenter)
        .with_poll_timeout(cfg.poll_timeout())
        .run_with_prelude(
            |source| {
                let background = capture_background(source, cfg.cloak.warmup_frames)?;
                let key = ChromaKey::new(ranges, background)?;
                Ok(if cfg.cloak.refine {
                    key
                } else {
                    key.without_refinement()
                })
            },
            |key, frame| {
                if log::log_enabled!(log::Level::Debug) {
                    log::debug!(
                        "frame {}: {:.1}% keyed",
                        frame.index(),
                        mask_coverage(&key.mask(frame)) * 100.0
                    );
                }
                key.apply(frame)
            },
        )?;

    log::info!(
        "cloak finished: {:?} after {} frames",
        summary.status,
        summary.frames
    );
    Ok(())
}
