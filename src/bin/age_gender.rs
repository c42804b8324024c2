//! age_gender - DNN face detection with age bracket and gender per face

use anyhow::Result;
use clap::Parser;

use visionkit::{CommonArgs, RunConfig};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    #[command(flatten)]
    common: CommonArgs,
    /// Minimum face detector confidence.
    #[arg(long)]
    confidence: Option<f32>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let cfg = RunConfig::load_with(&args.common, |cfg| {
        cfg.default_title("Gender Detection");
        if let Some(confidence) = args.confidence {
            cfg.dnn.face_confidence = confidence;
        }
    })?;
    run(&cfg)
}

#[cfg(feature = "backend-tract")]
fn run(cfg: &RunConfig) -> Result<()> {
    use visionkit::annotate::{self, Style, GREEN, YELLOW};
    use visionkit::detect::classify::{face_crop_region, FACE_PADDING};
    use visionkit::detect::{AgeGenderClassifier, RegionDetector, SsdFaceDetector};
    use visionkit::present::install_interrupt_flag;
    use visionkit::{InputSpec, LoopController};

    let mut faces =
        SsdFaceDetector::new(&cfg.dnn.face_model)?.with_threshold(cfg.dnn.face_confidence);
    let classifier = AgeGenderClassifier::new(&cfg.dnn.age_model, &cfg.dnn.gender_model)?;
    let style = Style::new(GREEN).with_text_color(YELLOW);
    let still = matches!(cfg.input_spec(), InputSpec::Image(_));

    let interrupt = install_interrupt_flag()?;
    let source = cfg.open_source()?;
    let presenter = cfg.open_presenter(interrupt)?;

    let summary = LoopController::new(source, presenter)
        .with_poll_timeout(cfg.poll_timeout())
        .hold_last_frame(still)
        .run(|frame| {
            let found = faces.detect(frame)?;
            if found.is_empty() {
                log::debug!("frame {}: no face found", frame.index());
            }
            let mut labeled = Vec::with_capacity(found.len());
            for face in found {
                let crop = face_crop_region(face.region, FACE_PADDING, frame.width(), frame.height())
                    .and_then(|region| frame.crop(region));
                let Some(crop) = crop else {
                    continue;
                };
                let result = classifier.classify(&crop)?;
                log::info!("Gender: {}, Age: {}", result.gender, result.age);
                labeled.push(face.with_label(result.label()));
            }
            Ok(annotate::annotated(frame, &labeled, &style))
        })?;

    log::info!(
        "age_gender finished: {:?} after {} frames",
        summary.status,
        summary.frames
    );
    Ok(())
}

#[cfg(not(feature = "backend-tract"))]
fn run(_cfg: &RunConfig) -> Result<()> {
    visionkit::detect::ensure_dnn_available()
}
