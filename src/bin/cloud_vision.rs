//! cloud_vision - annotate a still image with the Cloud Vision REST API
//!
//! The API key comes from `cloud.api_key` or `VISIONKIT_CLOUD_API_KEY`. `--response`
//! draws a previously saved `images:annotate` response instead of calling the service.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;

use visionkit::annotate::{self, Style, GREEN};
use visionkit::cloud::{AnnotateResponse, ImageResponse, VisionFeature};
use visionkit::frame::mirror_regions;
use visionkit::present::install_interrupt_flag;
use visionkit::{CommonArgs, InputSpec, LoopController, RunConfig};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    #[command(flatten)]
    common: CommonArgs,
    /// Annotation to request.
    #[arg(short, long, value_enum)]
    feature: Option<VisionFeature>,
    /// Maximum number of results per request.
    #[arg(long)]
    max_results: Option<u32>,
    /// Saved JSON response to draw instead of calling the API.
    #[arg(long)]
    response: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let cfg = RunConfig::load_with(&args.common, |cfg| {
        cfg.default_title("Google Cloud Vision API");
        if let Some(feature) = args.feature {
            cfg.cloud.feature = feature;
        }
        if let Some(max) = args.max_results {
            cfg.cloud.max_results = max;
        }
    })?;

    let InputSpec::Image(path) = cfg.input_spec() else {
        bail!("cloud_vision needs a still image (--input <file.jpg>)");
    };
    let feature = cfg.cloud.feature;
    // Responses use the coordinates of the stored file, not of the mirrored frame.
    let mirrored = cfg.source.mirror;
    let response = match &args.response {
        Some(saved) => load_saved_response(saved)?,
        None => request(&cfg, &path)?,
    };
    log_response(feature, &response);

    let style = Style::new(GREEN);
    let interrupt = install_interrupt_flag()?;
    let source = cfg.open_source()?;
    let presenter = cfg.open_presenter(interrupt)?;

    let summary = LoopController::new(source, presenter)
        .with_poll_timeout(cfg.poll_timeout())
        .hold_last_frame(true)
        .run(|frame| {
            let mut regions = response.detections(feature, frame.width(), frame.height());
            if mirrored {
                mirror_regions(&mut regions, frame.width());
            }
            Ok(annotate::annotated(frame, &regions, &style))
        })?;

    log::info!("cloud_vision finished: {:?}", summary.status);
    Ok(())
}

fn load_saved_response(path: &Path) -> Result<ImageResponse> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read response {}", path.display()))?;
    let parsed: AnnotateResponse = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse response {}", path.display()))?;
    parsed.into_single()
}

#[cfg(feature = "cloud-vision")]
fn request(cfg: &RunConfig, image: &Path) -> Result<ImageResponse> {
    use visionkit::cloud::VisionClient;

    let api_key = cfg
        .cloud
        .api_key
        .as_deref()
        .context("cloud vision API key missing (set VISIONKIT_CLOUD_API_KEY)")?;
    let client = VisionClient::new(&cfg.cloud.endpoint, api_key)?;
    client.annotate_file(image, cfg.cloud.feature, cfg.cloud.max_results)
}

#[cfg(not(feature = "cloud-vision"))]
fn request(_cfg: &RunConfig, _image: &Path) -> Result<ImageResponse> {
    bail!("calling the Cloud Vision API requires the cloud-vision feature (or pass --response)")
}

fn log_response(feature: VisionFeature, response: &ImageResponse) {
    match feature {
        VisionFeature::Face => {
            log::info!("Faces: {}", response.face_annotations.len());
            for face in &response.face_annotations {
                log::info!(
                    "  confidence {:.2}: joy {:?}, sorrow {:?}, anger {:?}, surprise {:?}",
                    face.detection_confidence,
                    face.joy_likelihood,
                    face.sorrow_likelihood,
                    face.anger_likelihood,
                    face.surprise_likelihood
                );
            }
        }
        VisionFeature::Landmark => {
            for landmark in &response.landmark_annotations {
                log::info!("Landmark: {} ({:.2})", landmark.description, landmark.score);
            }
        }
        VisionFeature::Logo => {
            for logo in &response.logo_annotations {
                log::info!("Logo: {} ({:.2})", logo.description, logo.score);
            }
        }
        VisionFeature::Text => {
            if let Some(full) = response.text_annotations.first() {
                log::info!("Text:\n{}", full.description);
            }
        }
        VisionFeature::Object => {
            for object in &response.localized_object_annotations {
                log::info!("Object: {} ({:.2})", object.name, object.score);
            }
        }
    }
}
