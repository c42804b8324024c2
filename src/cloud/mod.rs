//! Cloud vision annotation.
//!
//! Request and response types for the REST `images:annotate` call, plus conversions from
//! annotations to [`DetectionRegion`]s. The HTTP client lives behind the `cloud-vision`
//! feature; the model is always available so responses can be parsed and drawn offline.

#[cfg(feature = "cloud-vision")]
mod client;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

use crate::frame::{DetectionRegion, Region};

#[cfg(feature = "cloud-vision")]
pub use client::VisionClient;

pub const DEFAULT_ENDPOINT: &str = "https://vision.googleapis.com/v1/images:annotate";

/// Landmarks at or below this score are not drawn.
pub const LANDMARK_MIN_SCORE: f32 = 0.5;

pub const DEFAULT_MAX_RESULTS: u32 = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum VisionFeature {
    Face,
    Landmark,
    Logo,
    Text,
    Object,
}

impl VisionFeature {
    /// REST feature type.
    pub fn api_name(self) -> &'static str {
        match self {
            VisionFeature::Face => "FACE_DETECTION",
            VisionFeature::Landmark => "LANDMARK_DETECTION",
            VisionFeature::Logo => "LOGO_DETECTION",
            VisionFeature::Text => "TEXT_DETECTION",
            VisionFeature::Object => "OBJECT_LOCALIZATION",
        }
    }
}

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AnnotateRequest {
    pub requests: Vec<ImageRequest>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ImageRequest {
    pub image: ImageContent,
    pub features: Vec<FeatureRequest>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ImageContent {
    /// Base64-encoded image file bytes.
    pub content: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureRequest {
    #[serde(rename = "type")]
    pub kind: String,
    pub max_results: u32,
}

impl AnnotateRequest {
    /// Single-image request for one feature. `content` is already base64-encoded.
    pub fn new(content: String, feature: VisionFeature, max_results: u32) -> Self {
        Self {
            requests: vec![ImageRequest {
                image: ImageContent { content },
                features: vec![FeatureRequest {
                    kind: feature.api_name().to_string(),
                    max_results,
                }],
            }],
        }
    }
}

// ---------------------------------------------------------------------------
// Response
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct AnnotateResponse {
    #[serde(default)]
    pub responses: Vec<ImageResponse>,
}

impl AnnotateResponse {
    /// The response for the single image that was sent, or the error it carries.
    pub fn into_single(self) -> Result<ImageResponse> {
        let response = self
            .responses
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("annotate response contained no results"))?;
        if let Some(status) = &response.error {
            return Err(anyhow!(
                "annotate failed with code {}: {}",
                status.code,
                status.message
            ));
        }
        Ok(response)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImageResponse {
    pub face_annotations: Vec<FaceAnnotation>,
    pub landmark_annotations: Vec<EntityAnnotation>,
    pub logo_annotations: Vec<EntityAnnotation>,
    pub text_annotations: Vec<EntityAnnotation>,
    pub localized_object_annotations: Vec<LocalizedObjectAnnotation>,
    pub error: Option<Status>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Status {
    pub code: i32,
    pub message: String,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Vertex {
    pub x: i32,
    pub y: i32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct NormalizedVertex {
    pub x: f32,
    pub y: f32,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BoundingPoly {
    pub vertices: Vec<Vertex>,
    pub normalized_vertices: Vec<NormalizedVertex>,
}

impl BoundingPoly {
    /// Rectangle spanned by vertices 0 and 2 (top-left and bottom-right).
    pub fn region(&self) -> Option<Region> {
        let a = self.vertices.first()?;
        let b = self.vertices.get(2)?;
        Some(Region::from_corners(a.x, a.y, b.x, b.y))
    }

    /// Same as [`region`](Self::region) for normalized vertices scaled to the image size.
    pub fn normalized_region(&self, width: u32, height: u32) -> Option<Region> {
        let a = self.normalized_vertices.first()?;
        let b = self.normalized_vertices.get(2)?;
        let scale = |v: f32, size: u32| (v * size as f32).round() as i32;
        Some(Region::from_corners(
            scale(a.x, width),
            scale(a.y, height),
            scale(b.x, width),
            scale(b.y, height),
        ))
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Likelihood {
    #[default]
    Unknown,
    VeryUnlikely,
    Unlikely,
    Possible,
    Likely,
    VeryLikely,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FaceAnnotation {
    pub bounding_poly: BoundingPoly,
    pub detection_confidence: f32,
    pub joy_likelihood: Likelihood,
    pub sorrow_likelihood: Likelihood,
    pub anger_likelihood: Likelihood,
    pub surprise_likelihood: Likelihood,
    pub blurred_likelihood: Likelihood,
    pub headwear_likelihood: Likelihood,
}

/// Landmark, logo or text annotation.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EntityAnnotation {
    pub description: String,
    pub score: f32,
    pub bounding_poly: BoundingPoly,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LocalizedObjectAnnotation {
    pub name: String,
    pub score: f32,
    pub bounding_poly: BoundingPoly,
}

impl ImageResponse {
    /// Regions to draw for `feature` on an image of `width`×`height`.
    ///
    /// Faces are unlabeled, landmarks are kept only above [`LANDMARK_MIN_SCORE`], and the
    /// rest carry their description or name as label.
    pub fn detections(&self, feature: VisionFeature, width: u32, height: u32) -> Vec<DetectionRegion> {
        match feature {
            VisionFeature::Face => self
                .face_annotations
                .iter()
                .filter_map(|face| {
                    let region = face.bounding_poly.region()?;
                    Some(DetectionRegion::from(region).with_confidence(face.detection_confidence))
                })
                .collect(),
            VisionFeature::Landmark => entity_detections(
                self.landmark_annotations
                    .iter()
                    .filter(|landmark| landmark.score > LANDMARK_MIN_SCORE),
            ),
            VisionFeature::Logo => entity_detections(self.logo_annotations.iter()),
            VisionFeature::Text => entity_detections(self.text_annotations.iter()),
            VisionFeature::Object => self
                .localized_object_annotations
                .iter()
                .filter_map(|object| {
                    let region = object.bounding_poly.normalized_region(width, height)?;
                    Some(
                        DetectionRegion::from(region)
                            .with_label(object.name.clone())
                            .with_confidence(object.score),
                    )
                })
                .collect(),
        }
    }
}

fn entity_detections<'a>(entities: impl Iterator<Item = &'a EntityAnnotation>) -> Vec<DetectionRegion> {
    entities
        .filter_map(|entity| {
            let region = entity.bounding_poly.region()?;
            Some(
                DetectionRegion::from(region)
                    .with_label(entity.description.clone())
                    .with_confidence(entity.score),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Result<ImageResponse> {
        let response: AnnotateResponse = serde_json::from_str(json)?;
        response.into_single()
    }

    #[test]
    fn request_body_matches_rest_shape() -> Result<()> {
        let request = AnnotateRequest::new("aGk=".to_string(), VisionFeature::Object, 5);
        let value = serde_json::to_value(&request)?;
        assert_eq!(
            value,
            serde_json::json!({
                "requests": [{
                    "image": {"content": "aGk="},
                    "features": [{"type": "OBJECT_LOCALIZATION", "maxResults": 5}]
                }]
            })
        );
        Ok(())
    }

    #[test]
    fn faces_use_vertices_zero_and_two() -> Result<()> {
        let response = parse(
            r#"{"responses":[{"faceAnnotations":[{
                "boundingPoly":{"vertices":[{"x":10,"y":20},{"x":50,"y":20},{"x":50,"y":70},{"x":10,"y":70}]},
                "detectionConfidence":0.75,
                "joyLikelihood":"VERY_LIKELY",
                "headwearLikelihood":"UNLIKELY"
            }]}]}"#,
        )?;
        let face = &response.face_annotations[0];
        assert_eq!(face.joy_likelihood, Likelihood::VeryLikely);
        assert_eq!(face.sorrow_likelihood, Likelihood::Unknown);
        assert_eq!(face.headwear_likelihood, Likelihood::Unlikely);

        let regions = response.detections(VisionFeature::Face, 100, 100);
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].region, Region::new(10, 20, 40, 50));
        assert_eq!(regions[0].confidence, Some(0.75));
        assert_eq!(regions[0].label, None);
        Ok(())
    }

    #[test]
    fn weak_landmarks_are_dropped() -> Result<()> {
        let response = parse(
            r#"{"responses":[{"landmarkAnnotations":[
                {"description":"Notre Dame","score":0.9,
                 "boundingPoly":{"vertices":[{"y":5},{"x":30,"y":5},{"x":30,"y":40},{"y":40}]}},
                {"description":"Somewhere","score":0.5,
                 "boundingPoly":{"vertices":[{"x":1,"y":1},{"x":2,"y":1},{"x":2,"y":2},{"x":1,"y":2}]}}
            ]}]}"#,
        )?;
        let regions = response.detections(VisionFeature::Landmark, 100, 100);
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].region, Region::new(0, 5, 30, 35));
        assert_eq!(regions[0].label.as_deref(), Some("Notre Dame"));
        Ok(())
    }

    #[test]
    fn objects_scale_normalized_vertices() -> Result<()> {
        let response = parse(
            r#"{"responses":[{"localizedObjectAnnotations":[{
                "name":"Duck","score":0.875,
                "boundingPoly":{"normalizedVertices":[{"x":0.25,"y":0.5},{"x":0.75,"y":0.5},{"x":0.75,"y":1.0},{"x":0.25,"y":1.0}]}
            }]}]}"#,
        )?;
        let regions = response.detections(VisionFeature::Object, 200, 100);
        assert_eq!(regions[0].region, Region::new(50, 50, 100, 50));
        assert_eq!(regions[0].label.as_deref(), Some("Duck"));
        Ok(())
    }

    #[test]
    fn short_polygons_are_skipped() -> Result<()> {
        let response = parse(
            r#"{"responses":[{"logoAnnotations":[{"description":"x","score":0.9,
                "boundingPoly":{"vertices":[{"x":1,"y":1}]}}]}]}"#,
        )?;
        assert!(response.detections(VisionFeature::Logo, 10, 10).is_empty());
        Ok(())
    }

    #[test]
    fn error_status_is_reported() {
        let err = parse(r#"{"responses":[{"error":{"code":7,"message":"API key not valid"}}]}"#)
            .unwrap_err();
        assert!(err.to_string().contains("API key not valid"));
        assert!(parse(r#"{"responses":[]}"#).is_err());
    }
}
