//! Model-independent pieces of the DNN face pipeline: input blobs, SSD output
//! decoding, face crops and arg-max labelling.

use anyhow::{bail, Result};
use image::{imageops, RgbImage};

use crate::frame::{DetectionRegion, Region};

pub const AGE_LABELS: [&str; 8] = [
    "(0-2)", "(4-6)", "(8-12)", "(15-20)", "(25-32)", "(38-43)", "(48-53)", "(60-100)",
];

pub const GENDER_LABELS: [&str; 2] = ["Male", "Female"];

/// Face detector input side, in pixels.
pub const FACE_INPUT_SIZE: u32 = 300;
/// Per-channel mean subtracted from face detector input (RGB order).
pub const FACE_MEAN: [f32; 3] = [104.0, 117.0, 123.0];
pub const FACE_CONFIDENCE: f32 = 0.7;

/// Age and gender classifier input side, in pixels.
pub const CLASSIFIER_INPUT_SIZE: u32 = 227;
/// Per-channel mean subtracted from classifier input (BGR order).
pub const CLASSIFIER_MEAN: [f32; 3] = [78.426_34, 87.768_914, 114.895_85];

/// Padding added around a face before classification.
pub const FACE_PADDING: u32 = 20;

/// Values per detection row in SSD output: image id, class, confidence, x1, y1, x2, y2.
pub const SSD_ROW_LEN: usize = 7;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelOrder {
    Rgb,
    Bgr,
}

/// Resize to `size`x`size` and lay out as planar CHW floats with `mean` subtracted.
pub fn blob_from_image(pixels: &RgbImage, size: u32, mean: [f32; 3], order: ChannelOrder) -> Vec<f32> {
    let resized = imageops::resize(pixels, size, size, imageops::FilterType::Triangle);
    let plane = (size * size) as usize;
    let mut blob = vec![0.0f32; plane * 3];
    for (i, pixel) in resized.pixels().enumerate() {
        let [r, g, b] = pixel.0;
        let channels = match order {
            ChannelOrder::Rgb => [r, g, b],
            ChannelOrder::Bgr => [b, g, r],
        };
        for (c, value) in channels.into_iter().enumerate() {
            blob[c * plane + i] = value as f32 - mean[c];
        }
    }
    blob
}

/// Decode flattened SSD output into frame-space boxes above `threshold`.
pub fn parse_ssd_detections(
    output: &[f32],
    frame_width: u32,
    frame_height: u32,
    threshold: f32,
) -> Result<Vec<DetectionRegion>> {
    if output.len() % SSD_ROW_LEN != 0 {
        bail!(
            "SSD output length {} is not a multiple of {}",
            output.len(),
            SSD_ROW_LEN
        );
    }
    let w = frame_width as f32;
    let h = frame_height as f32;
    let mut regions = Vec::new();
    for row in output.chunks_exact(SSD_ROW_LEN) {
        let confidence = row[2];
        if !(confidence > threshold) {
            continue;
        }
        let region = Region::from_corners(
            (row[3] * w) as i32,
            (row[4] * h) as i32,
            (row[5] * w) as i32,
            (row[6] * h) as i32,
        );
        if let Some(region) = region.clamp_to(frame_width, frame_height) {
            regions.push(DetectionRegion::new(region).with_confidence(confidence));
        }
    }
    Ok(regions)
}

/// Face box grown by `padding` and clipped to the frame.
pub fn face_crop_region(face: Region, padding: u32, width: u32, height: u32) -> Option<Region> {
    face.padded(padding, width, height)
}

/// Index of the largest score. NaN scores never win.
pub fn argmax(scores: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &score) in scores.iter().enumerate() {
        if score.is_nan() {
            continue;
        }
        if best.map_or(true, |(_, b)| score > b) {
            best = Some((i, score));
        }
    }
    best.map(|(i, _)| i)
}

/// Label at the arg-max of `scores`, which must cover every label.
pub fn pick_label(labels: &'static [&'static str], scores: &[f32]) -> Result<&'static str> {
    if scores.len() != labels.len() {
        bail!(
            "classifier produced {} scores for {} labels",
            scores.len(),
            labels.len()
        );
    }
    match argmax(scores) {
        Some(i) => Ok(labels[i]),
        None => bail!("classifier produced no usable scores"),
    }
}

/// Estimated gender and age bracket for one face.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AgeGender {
    pub gender: &'static str,
    pub age: &'static str,
}

impl AgeGender {
    pub fn label(&self) -> String {
        format!("{},{}", self.gender, self.age)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn argmax_ignores_nan_and_keeps_first_maximum() {
        assert_eq!(argmax(&[0.1, 0.7, 0.7, 0.2]), Some(1));
        assert_eq!(argmax(&[f32::NAN, 0.3]), Some(1));
        assert_eq!(argmax(&[]), None);
    }

    #[test]
    fn labels_follow_arg_max() -> Result<()> {
        let mut age_scores = [0.0f32; 8];
        age_scores[4] = 0.9;
        assert_eq!(pick_label(&AGE_LABELS, &age_scores)?, "(25-32)");
        assert_eq!(pick_label(&GENDER_LABELS, &[0.2, 0.8])?, "Female");
        assert!(pick_label(&GENDER_LABELS, &[1.0]).is_err());

        let result = AgeGender {
            gender: "Male",
            age: "(25-32)",
        };
        assert_eq!(result.label(), "Male,(25-32)");
        Ok(())
    }

    #[test]
    fn ssd_rows_above_threshold_become_regions() -> Result<()> {
        let output = [
            0.0, 1.0, 0.95, 0.125, 0.25, 0.375, 0.625, //
            0.0, 1.0, 0.50, 0.0, 0.0, 0.5, 0.5, //
            0.0, 1.0, 0.80, 0.75, 0.75, 1.25, 1.25, //
        ];
        let regions = parse_ssd_detections(&output, 200, 100, FACE_CONFIDENCE)?;
        assert_eq!(regions.len(), 2);
        assert_eq!(regions[0].region, Region::new(25, 25, 50, 37));
        assert_eq!(regions[0].confidence, Some(0.95));
        assert_eq!(regions[1].region, Region::new(150, 75, 50, 25));

        assert!(parse_ssd_detections(&output[..5], 200, 100, 0.5).is_err());
        Ok(())
    }

    #[test]
    fn face_crop_is_padded_and_clipped() {
        let face = Region::new(10, 50, 40, 40);
        assert_eq!(
            face_crop_region(face, FACE_PADDING, 200, 100),
            Some(Region::new(0, 30, 70, 70))
        );
    }

    #[test]
    fn blob_is_planar_with_mean_removed() {
        let pixels = RgbImage::from_pixel(4, 4, Rgb([10, 20, 30]));
        let blob = blob_from_image(&pixels, 2, [1.0, 2.0, 3.0], ChannelOrder::Bgr);
        assert_eq!(blob.len(), 12);
        assert_eq!(&blob[0..4], &[29.0; 4]);
        assert_eq!(&blob[4..8], &[18.0; 4]);
        assert_eq!(&blob[8..12], &[7.0; 4]);
    }
}
