//! Run configuration.
//!
//! Layers, lowest priority first: compiled-in defaults, the JSON (or `.toml`) file named
//! by `VISIONKIT_CONFIG`, `VISIONKIT_*` environment variables, command-line flags. The
//! result is validated once and read-only afterwards.

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use crate::cloud::{VisionFeature, DEFAULT_ENDPOINT, DEFAULT_MAX_RESULTS};
use crate::composite::DEFAULT_WARMUP_FRAMES;
use crate::detect::classify::FACE_CONFIDENCE;
use crate::detect::{
    CascadeParams, ColorPreset, ColorRange, ColorSpace, DetectorKind, RangeSet, CLASSIFIER_DIR,
    MODEL_DIR,
};
use crate::frame::Region;
use crate::ingest::{self, FrameSource, InputSpec, SourceSettings, DEFAULT_CAMERA_DEVICE};
use crate::pipeline::validate_speed;
use crate::present::{self, Presenter, SurfaceOptions};
use crate::track::TrackerKind;

const DEFAULT_TITLE: &str = "visionkit";
const DEFAULT_SPEED_MS: u64 = 1;
const DEFAULT_TARGET_FPS: u32 = 30;
const DEFAULT_WIDTH: u32 = 640;
const DEFAULT_HEIGHT: u32 = 480;
const DEFAULT_SYNTHETIC_FRAMES: u64 = 300;

pub const FACE_MODEL_FILE: &str = "opencv_face_detector.onnx";
pub const AGE_MODEL_FILE: &str = "age_net.onnx";
pub const GENDER_MODEL_FILE: &str = "gender_net.onnx";

// ---------------------------------------------------------------------------
// Command line
// ---------------------------------------------------------------------------

/// Flags shared by every binary (`#[command(flatten)]`).
#[derive(Debug, Clone, Default, clap::Args)]
pub struct CommonArgs {
    /// Image, video, image directory or stub:// URL. Absent means the live camera.
    #[arg(short, long)]
    pub input: Option<String>,

    /// Camera device used when no input is given.
    #[arg(long)]
    pub camera: Option<String>,

    /// Fullscreen window.
    #[arg(short, long)]
    pub full: bool,

    /// Flip frames horizontally.
    #[arg(short, long)]
    pub mirror: bool,

    /// Delay between frames in ms (1, 5, 10, 15, 25, 50, 100, 150, 200, 250, 300).
    #[arg(short, long)]
    pub speed: Option<u64>,

    /// Run without a window.
    #[arg(long)]
    pub headless: bool,

    /// Write every shown frame as PNG into this directory (headless only).
    #[arg(long)]
    pub output_dir: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Config file
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Default)]
struct RunConfigFile {
    window: Option<WindowConfigFile>,
    source: Option<SourceConfigFile>,
    cascade: Option<CascadeConfigFile>,
    color: Option<ColorConfigFile>,
    cloak: Option<CloakConfigFile>,
    tracker: Option<TrackerConfigFile>,
    dnn: Option<DnnConfigFile>,
    cloud: Option<CloudConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct WindowConfigFile {
    title: Option<String>,
    fullscreen: Option<bool>,
    headless: Option<bool>,
    output_dir: Option<PathBuf>,
    speed_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct SourceConfigFile {
    input: Option<String>,
    camera_device: Option<String>,
    mirror: Option<bool>,
    target_fps: Option<u32>,
    width: Option<u32>,
    height: Option<u32>,
    synthetic_frames: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct CascadeConfigFile {
    classifier_dir: Option<PathBuf>,
    scale_factor: Option<f64>,
    min_neighbors: Option<u32>,
    min_size: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct ColorConfigFile {
    preset: Option<ColorPreset>,
    space: Option<ColorSpace>,
    lower: Option<[u8; 3]>,
    upper: Option<[u8; 3]>,
}

#[derive(Debug, Deserialize, Default)]
struct CloakConfigFile {
    preset: Option<ColorPreset>,
    warmup_frames: Option<u32>,
    refine: Option<bool>,
}

#[derive(Debug, Deserialize, Default)]
struct TrackerConfigFile {
    kind: Option<TrackerKind>,
    /// `[x, y, width, height]` boxes tracked from the first frame.
    initial_boxes: Option<Vec<[i64; 4]>>,
}

#[derive(Debug, Deserialize, Default)]
struct DnnConfigFile {
    model_dir: Option<PathBuf>,
    face_model: Option<PathBuf>,
    age_model: Option<PathBuf>,
    gender_model: Option<PathBuf>,
    face_confidence: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
struct CloudConfigFile {
    endpoint: Option<String>,
    api_key: Option<String>,
    feature: Option<VisionFeature>,
    max_results: Option<u32>,
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub window: WindowSettings,
    pub source: InputSettings,
    pub cascade: CascadeSettings,
    pub color: ColorSettings,
    pub cloak: CloakSettings,
    pub tracker: TrackerSettings,
    pub dnn: DnnSettings,
    pub cloud: CloudSettings,
}

#[derive(Debug, Clone)]
pub struct WindowSettings {
    pub title: String,
    pub fullscreen: bool,
    pub headless: bool,
    pub output_dir: Option<PathBuf>,
    pub speed_ms: u64,
}

#[derive(Debug, Clone)]
pub struct InputSettings {
    pub input: Option<String>,
    pub camera_device: String,
    pub mirror: bool,
    pub target_fps: u32,
    pub width: u32,
    pub height: u32,
    pub synthetic_frames: u64,
}

#[derive(Debug, Clone)]
pub struct CascadeSettings {
    pub classifier_dir: PathBuf,
    /// Overrides applied on top of each detector kind's defaults.
    pub scale_factor: Option<f64>,
    pub min_neighbors: Option<u32>,
    pub min_size: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct ColorSettings {
    pub preset: ColorPreset,
    /// Explicit range; replaces the preset when set.
    pub custom: Option<ColorRange>,
}

#[derive(Debug, Clone)]
pub struct CloakSettings {
    pub preset: ColorPreset,
    pub warmup_frames: u32,
    pub refine: bool,
}

#[derive(Debug, Clone)]
pub struct TrackerSettings {
    pub kind: TrackerKind,
    pub initial_boxes: Vec<Region>,
}

#[derive(Debug, Clone)]
pub struct DnnSettings {
    pub face_model: PathBuf,
    pub age_model: PathBuf,
    pub gender_model: PathBuf,
    pub face_confidence: f32,
}

#[derive(Debug, Clone)]
pub struct CloudSettings {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub feature: VisionFeature,
    pub max_results: u32,
}

impl RunConfig {
    /// Load every layer and validate.
    pub fn load(cli: &CommonArgs) -> Result<Self> {
        Self::load_with(cli, |_| {})
    }

    /// Like [`load`](Self::load), with binary-specific flags applied by `overrides` after
    /// the shared flags and before validation.
    pub fn load_with(cli: &CommonArgs, overrides: impl FnOnce(&mut RunConfig)) -> Result<Self> {
        let config_path = std::env::var("VISIONKIT_CONFIG").ok();
        let file_cfg = match config_path.as_deref().map(str::trim) {
            Some(path) if !path.is_empty() => Some(read_config_file(Path::new(path))?),
            _ => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default())?;
        cfg.apply_env()?;
        cfg.apply_cli(cli);
        overrides(&mut cfg);
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: RunConfigFile) -> Result<Self> {
        let window = file.window.unwrap_or_default();
        let source = file.source.unwrap_or_default();
        let cascade = file.cascade.unwrap_or_default();
        let color = file.color.unwrap_or_default();
        let cloak = file.cloak.unwrap_or_default();
        let tracker = file.tracker.unwrap_or_default();
        let dnn = file.dnn.unwrap_or_default();
        let cloud = file.cloud.unwrap_or_default();

        let custom = match (color.lower, color.upper) {
            (Some(lower), Some(upper)) => Some(ColorRange::new(
                color.space.unwrap_or(ColorSpace::Hsv),
                lower,
                upper,
            )?),
            (None, None) => None,
            _ => return Err(anyhow!("color.lower and color.upper must be given together")),
        };

        let initial_boxes = tracker
            .initial_boxes
            .unwrap_or_default()
            .into_iter()
            .map(region_from_array)
            .collect::<Result<Vec<_>>>()?;

        let model_dir = dnn.model_dir.unwrap_or_else(|| PathBuf::from(MODEL_DIR));

        Ok(Self {
            window: WindowSettings {
                title: window.title.unwrap_or_else(|| DEFAULT_TITLE.to_string()),
                fullscreen: window.fullscreen.unwrap_or(false),
                headless: window.headless.unwrap_or(false),
                output_dir: window.output_dir,
                speed_ms: window.speed_ms.unwrap_or(DEFAULT_SPEED_MS),
            },
            source: InputSettings {
                input: source.input,
                camera_device: source
                    .camera_device
                    .unwrap_or_else(|| DEFAULT_CAMERA_DEVICE.to_string()),
                mirror: source.mirror.unwrap_or(false),
                target_fps: source.target_fps.unwrap_or(DEFAULT_TARGET_FPS),
                width: source.width.unwrap_or(DEFAULT_WIDTH),
                height: source.height.unwrap_or(DEFAULT_HEIGHT),
                synthetic_frames: source.synthetic_frames.unwrap_or(DEFAULT_SYNTHETIC_FRAMES),
            },
            cascade: CascadeSettings {
                classifier_dir: cascade
                    .classifier_dir
                    .unwrap_or_else(|| PathBuf::from(CLASSIFIER_DIR)),
                scale_factor: cascade.scale_factor,
                min_neighbors: cascade.min_neighbors,
                min_size: cascade.min_size,
            },
            color: ColorSettings {
                preset: color.preset.unwrap_or(ColorPreset::Yellow),
                custom,
            },
            cloak: CloakSettings {
                preset: cloak.preset.unwrap_or(ColorPreset::Red),
                warmup_frames: cloak.warmup_frames.unwrap_or(DEFAULT_WARMUP_FRAMES),
                refine: cloak.refine.unwrap_or(true),
            },
            tracker: TrackerSettings {
                kind: tracker.kind.unwrap_or_else(default_tracker_kind),
                initial_boxes,
            },
            dnn: DnnSettings {
                face_model: dnn
                    .face_model
                    .unwrap_or_else(|| model_dir.join(FACE_MODEL_FILE)),
                age_model: dnn.age_model.unwrap_or_else(|| model_dir.join(AGE_MODEL_FILE)),
                gender_model: dnn
                    .gender_model
                    .unwrap_or_else(|| model_dir.join(GENDER_MODEL_FILE)),
                face_confidence: dnn.face_confidence.unwrap_or(FACE_CONFIDENCE),
            },
            cloud: CloudSettings {
                endpoint: cloud
                    .endpoint
                    .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
                api_key: cloud.api_key,
                feature: cloud.feature.unwrap_or(VisionFeature::Face),
                max_results: cloud.max_results.unwrap_or(DEFAULT_MAX_RESULTS),
            },
        })
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(input) = std::env::var("VISIONKIT_INPUT") {
            if !input.trim().is_empty() {
                self.source.input = Some(input);
            }
        }
        if let Ok(device) = std::env::var("VISIONKIT_CAMERA") {
            if !device.trim().is_empty() {
                self.source.camera_device = device;
            }
        }
        if let Ok(value) = std::env::var("VISIONKIT_FULLSCREEN") {
            self.window.fullscreen = parse_bool("VISIONKIT_FULLSCREEN", &value)?;
        }
        if let Ok(value) = std::env::var("VISIONKIT_MIRROR") {
            self.source.mirror = parse_bool("VISIONKIT_MIRROR", &value)?;
        }
        if let Ok(value) = std::env::var("VISIONKIT_HEADLESS") {
            self.window.headless = parse_bool("VISIONKIT_HEADLESS", &value)?;
        }
        if let Ok(speed) = std::env::var("VISIONKIT_SPEED_MS") {
            self.window.speed_ms = speed
                .trim()
                .parse()
                .map_err(|_| anyhow!("VISIONKIT_SPEED_MS must be an integer number of ms"))?;
        }
        if let Ok(dir) = std::env::var("VISIONKIT_OUTPUT_DIR") {
            if !dir.trim().is_empty() {
                self.window.output_dir = Some(PathBuf::from(dir));
            }
        }
        if let Ok(boxes) = std::env::var("VISIONKIT_TRACKER_BOXES") {
            let parsed = split_csv(&boxes)
                .iter()
                .map(|entry| parse_box(entry))
                .collect::<Result<Vec<_>>>()?;
            if !parsed.is_empty() {
                self.tracker.initial_boxes = parsed;
            }
        }
        if let Ok(key) = std::env::var("VISIONKIT_CLOUD_API_KEY") {
            if !key.trim().is_empty() {
                self.cloud.api_key = Some(key);
            }
        }
        Ok(())
    }

    fn apply_cli(&mut self, cli: &CommonArgs) {
        if let Some(input) = &cli.input {
            self.source.input = Some(input.clone());
        }
        if let Some(device) = &cli.camera {
            self.source.camera_device = device.clone();
        }
        if cli.full {
            self.window.fullscreen = true;
        }
        if cli.mirror {
            self.source.mirror = true;
        }
        if let Some(speed) = cli.speed {
            self.window.speed_ms = speed;
        }
        if cli.headless {
            self.window.headless = true;
        }
        if let Some(dir) = &cli.output_dir {
            self.window.output_dir = Some(dir.clone());
        }
    }

    fn validate(&mut self) -> Result<()> {
        validate_speed(self.window.speed_ms)?;
        if self.window.title.trim().is_empty() {
            return Err(anyhow!("window title must not be empty"));
        }
        if self.source.width == 0 || self.source.height == 0 {
            return Err(anyhow!("source width and height must be greater than zero"));
        }
        if self.source.target_fps == 0 {
            return Err(anyhow!("source target_fps must be greater than zero"));
        }
        let input = self.input_spec();
        for kind in [DetectorKind::Face, DetectorKind::CatFace, DetectorKind::Eye] {
            self.cascade
                .params(kind, &input)
                .validate()
                .with_context(|| format!("invalid cascade settings for {}", kind.label()))?;
        }
        self.color.ranges().validate()?;
        if self.cloak.warmup_frames == 0 {
            return Err(anyhow!("cloak warmup_frames must be greater than zero"));
        }
        if !(0.0..=1.0).contains(&self.dnn.face_confidence) {
            return Err(anyhow!("dnn face_confidence must lie in [0, 1]"));
        }
        if self.cloud.max_results == 0 {
            return Err(anyhow!("cloud max_results must be greater than zero"));
        }
        self.source.input = self
            .source
            .input
            .take()
            .map(|input| input.trim().to_string())
            .filter(|input| !input.is_empty());
        Ok(())
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.window.speed_ms)
    }

    pub fn input_spec(&self) -> InputSpec {
        InputSpec::resolve(self.source.input.as_deref(), &self.source.camera_device)
    }

    pub fn source_settings(&self) -> SourceSettings {
        SourceSettings {
            input: self.input_spec(),
            mirror: self.source.mirror,
            target_fps: self.source.target_fps,
            width: self.source.width,
            height: self.source.height,
            synthetic_frames: self.source.synthetic_frames,
        }
    }

    pub fn surface_options(&self) -> SurfaceOptions {
        SurfaceOptions {
            title: self.window.title.clone(),
            fullscreen: self.window.fullscreen,
        }
    }

    /// Use `title` for the window unless one was configured.
    pub fn default_title(&mut self, title: &str) {
        if self.window.title == DEFAULT_TITLE {
            self.window.title = title.to_string();
        }
    }

    /// The configured source, not yet connected.
    pub fn open_source(&self) -> Result<Box<dyn FrameSource>> {
        let settings = self.source_settings();
        log::info!("source: {:?}", settings.input);
        ingest::open_source(&settings)
    }

    pub fn open_presenter(&self, interrupt: Arc<AtomicBool>) -> Result<Box<dyn Presenter>> {
        present::open_presenter(
            &self.surface_options(),
            self.window.headless,
            self.window.output_dir.clone(),
            interrupt,
        )
    }
}

impl CascadeSettings {
    /// Configured overrides on top of the defaults for `kind` on `input`.
    pub fn params(&self, kind: DetectorKind, input: &InputSpec) -> CascadeParams {
        let defaults = kind.params_for(input);
        CascadeParams {
            scale_factor: self.scale_factor.unwrap_or(defaults.scale_factor),
            min_neighbors: self.min_neighbors.unwrap_or(defaults.min_neighbors),
            min_size: self.min_size.unwrap_or(defaults.min_size),
        }
    }

    pub fn path(&self, kind: DetectorKind) -> PathBuf {
        self.classifier_dir.join(kind.cascade_file())
    }
}

impl ColorSettings {
    pub fn ranges(&self) -> RangeSet {
        match self.custom {
            Some(range) => RangeSet::single(range),
            None => self.preset.ranges(),
        }
    }
}

/// Native template tracking when OpenCV trackers are not compiled in.
fn default_tracker_kind() -> TrackerKind {
    if cfg!(feature = "backend-opencv") {
        TrackerKind::Csrt
    } else {
        TrackerKind::Template
    }
}

fn read_config_file(path: &Path) -> Result<RunConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let is_toml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    let cfg = if is_toml {
        toml::from_str(&raw).map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}

fn parse_bool(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(anyhow!("{name} must be a boolean, got '{other}'")),
    }
}

/// `x:y:width:height`
fn parse_box(entry: &str) -> Result<Region> {
    let parts = entry
        .split(':')
        .map(|part| part.trim().parse::<i64>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|_| anyhow!("tracker box '{entry}' must be x:y:width:height integers"))?;
    let values: [i64; 4] = parts
        .try_into()
        .map_err(|_| anyhow!("tracker box '{entry}' must have four fields"))?;
    region_from_array(values)
}

fn region_from_array([x, y, width, height]: [i64; 4]) -> Result<Region> {
    let x = i32::try_from(x).map_err(|_| anyhow!("tracker box x out of range"))?;
    let y = i32::try_from(y).map_err(|_| anyhow!("tracker box y out of range"))?;
    let width = u32::try_from(width)
        .ok()
        .filter(|w| *w > 0)
        .ok_or_else(|| anyhow!("tracker box width must be positive"))?;
    let height = u32::try_from(height)
        .ok()
        .filter(|h| *h > 0)
        .ok_or_else(|| anyhow!("tracker box height must be positive"))?;
    Ok(Region::new(x, y, width, height))
}

fn split_csv(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|entry| entry.trim())
        .filter(|entry| !entry.is_empty())
        .map(|entry| entry.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() -> Result<()> {
        let mut cfg = RunConfig::from_file(RunConfigFile::default())?;
        cfg.validate()?;
        assert_eq!(cfg.window.speed_ms, 1);
        assert_eq!(cfg.cloak.warmup_frames, 60);
        assert_eq!(cfg.color.ranges(), RangeSet::yellow());
        let input = cfg.input_spec();
        assert_eq!(cfg.cascade.params(DetectorKind::Eye, &input).scale_factor, 1.3);
        assert_eq!(cfg.dnn.age_model, PathBuf::from("models/age_net.onnx"));
        assert_eq!(cfg.input_spec(), InputSpec::Camera(DEFAULT_CAMERA_DEVICE.to_string()));
        assert_eq!(cfg.cloud.endpoint, DEFAULT_ENDPOINT);
        Ok(())
    }

    #[test]
    fn cascade_overrides_apply_to_every_kind() -> Result<()> {
        let file: RunConfigFile =
            serde_json::from_str(r#"{"cascade": {"min_neighbors": 8, "classifier_dir": "/opt/cv"}}"#)?;
        let cfg = RunConfig::from_file(file)?;
        let camera = cfg.input_spec();
        let image = InputSpec::Image(PathBuf::from("faces.jpg"));
        assert_eq!(cfg.cascade.params(DetectorKind::Face, &camera).min_neighbors, 8);
        assert_eq!(cfg.cascade.params(DetectorKind::Face, &camera).scale_factor, 1.1);
        assert_eq!(cfg.cascade.params(DetectorKind::Face, &image).min_neighbors, 8);
        assert_eq!(cfg.cascade.params(DetectorKind::Face, &image).scale_factor, 1.3);
        assert_eq!(
            cfg.cascade.path(DetectorKind::CatFace),
            PathBuf::from("/opt/cv/haarcascade_frontalcatface.xml")
        );
        Ok(())
    }

    #[test]
    fn custom_color_range_replaces_preset() -> Result<()> {
        let file: RunConfigFile = serde_json::from_str(
            r#"{"color": {"space": "rgb", "lower": [200, 0, 0], "upper": [255, 60, 60]}}"#,
        )?;
        let cfg = RunConfig::from_file(file)?;
        let ranges = cfg.color.ranges();
        assert_eq!(ranges.ranges().len(), 1);
        assert_eq!(ranges.ranges()[0].space, ColorSpace::Rgb);

        let half: RunConfigFile = serde_json::from_str(r#"{"color": {"lower": [1, 2, 3]}}"#)?;
        assert!(RunConfig::from_file(half).is_err());
        Ok(())
    }

    #[test]
    fn invalid_layers_are_rejected() -> Result<()> {
        let mut cfg = RunConfig::from_file(RunConfigFile::default())?;
        cfg.window.speed_ms = 7;
        assert!(cfg.validate().is_err());

        let mut cfg = RunConfig::from_file(RunConfigFile::default())?;
        cfg.cascade.scale_factor = Some(1.0);
        assert!(cfg.validate().is_err());

        let mut cfg = RunConfig::from_file(RunConfigFile::default())?;
        cfg.cloak.warmup_frames = 0;
        assert!(cfg.validate().is_err());
        Ok(())
    }

    #[test]
    fn tracker_boxes_parse() -> Result<()> {
        assert_eq!(parse_box("10:20:30:40")?, Region::new(10, 20, 30, 40));
        assert!(parse_box("10:20:30").is_err());
        assert!(parse_box("10:20:0:40").is_err());
        assert!(parse_box("a:b:c:d").is_err());
        Ok(())
    }

    #[test]
    fn cli_flags_override_file_values() -> Result<()> {
        let file: RunConfigFile = serde_json::from_str(
            r#"{"window": {"speed_ms": 50}, "source": {"input": "a.mp4"}}"#,
        )?;
        let mut cfg = RunConfig::from_file(file)?;
        cfg.apply_cli(&CommonArgs {
            input: Some("stub://demo".to_string()),
            speed: Some(25),
            mirror: true,
            ..CommonArgs::default()
        });
        cfg.validate()?;
        assert_eq!(cfg.poll_timeout(), Duration::from_millis(25));
        assert!(cfg.source.mirror);
        assert_eq!(cfg.input_spec(), InputSpec::Synthetic("stub://demo".to_string()));
        Ok(())
    }
}
