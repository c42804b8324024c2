//! cascade_detect - Haar cascade detection (faces, cat faces, eyes inside faces)

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use visionkit::annotate::{self, Style, GREEN, RED};
use visionkit::config::RunConfig;
use visionkit::detect::{CascadeDetector, DetectorKind, NestedDetector, RegionDetector};
use visionkit::present::install_interrupt_flag;
use visionkit::{CommonArgs, InputSpec, LoopController};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    #[command(flatten)]
    common: CommonArgs,
    /// Object class to detect.
    #[arg(short, long, value_enum, default_value_t = DetectorKind::Face)]
    kind: DetectorKind,
    /// Cascade file for `--kind` (defaults to the bundled classifier).
    #[arg(short, long)]
    classifier: Option<PathBuf>,
    /// Run a second detector inside every detected region (e.g. `eye`).
    #[arg(long, value_enum)]
    nested: Option<DetectorKind>,
    /// Cascade file for `--nested`.
    #[arg(long)]
    nested_classifier: Option<PathBuf>,
    #[arg(long)]
    scale_factor: Option<f64>,
    #[arg(long)]
    min_neighbors: Option<u32>,
    #[arg(long)]
    min_size: Option<u32>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let cfg = RunConfig::load_with(&args.common, |cfg| {
        cfg.default_title(match (args.kind, args.nested) {
            (_, Some(_)) => "Eyes Tracking",
            (DetectorKind::CatFace, None) => "Cats Detector",
            _ => "Faces Detector",
        });
        if args.scale_factor.is_some() {
            cfg.cascade.scale_factor = args.scale_factor;
        }
        if args.min_neighbors.is_some() {
            cfg.cascade.min_neighbors = args.min_neighbors;
        }
        if args.min_size.is_some() {
            cfg.cascade.min_size = args.min_size;
        }
    })?;

    let outer = load_detector(&cfg, args.kind, args.classifier.as_ref())?;
    let inner = args
        .nested
        .map(|kind| load_detector(&cfg, kind, args.nested_classifier.as_ref()))
        .transpose()?;
    // Labels on still images only, as in the single-image demos.
    let still = matches!(cfg.input_spec(), InputSpec::Image(_));

    let interrupt = install_interrupt_flag()?;
    let source = cfg.open_source()?;
    let presenter = cfg.open_presenter(interrupt)?;
    let controller = LoopController::new(source, presenter)
        .with_poll_timeout(cfg.poll_timeout())
        .hold_last_frame(still);

    let summary = match inner {
        Some(inner) => {
            let mut detector = NestedDetector::new(outer, inner);
            let outer_style = Style::new(RED);
            let inner_style = Style::new(GREEN);
            controller.run(|frame| {
                let found = detector.detect_nested(frame)?;
                let mut out = annotate::annotated(frame, &found.outer, &outer_style);
                annotate::render(&mut out, &annotate::overlays(&found.inner, &inner_style));
                Ok(out)
            })?
        }
        None => {
            let mut detector = outer;
            let mut style = Style::new(RED);
            if still {
                style = style.with_label_prefix(args.kind.label());
            }
            controller.run(|frame| {
                let regions = detector.detect(frame)?;
                log::debug!("frame {}: {} {} region(s)", frame.index(), regions.len(), detector.name());
                Ok(annotate::annotated(frame, &regions, &style))
            })?
        }
    };

    log::info!(
        "cascade_detect finished: {:?} after {} frames",
        summary.status,
        summary.frames
    );
    Ok(())
}

fn load_detector(
    cfg: &RunConfig,
    kind: DetectorKind,
    path: Option<&PathBuf>,
) -> Result<CascadeDetector> {
    kind.ensure_available()?;
    let path = path.cloned().unwrap_or_else(|| cfg.cascade.path(kind));
    CascadeDetector::load(kind, &path, cfg.cascade.params(kind, &cfg.input_spec()))
}
