use anyhow::Result;
use image::{Rgb, RgbImage};

use visionkit::annotate::{self, Overlay, Style, GREEN, RED};
use visionkit::cloud::{AnnotateResponse, VisionFeature};
use visionkit::composite::{capture_background, mask_coverage, ChromaKey};
use visionkit::detect::{ColorPreset, ColorTracker, NestedDetector, RegionDetector, StubDetector};
use visionkit::frame::{mirror_regions, sort_by_area_desc};
use visionkit::ingest::{SyntheticConfig, SyntheticSource};
use visionkit::{open_source, Frame, FrameSource, InputSpec, Region, SourceSettings};

const GRAY: Rgb<u8> = Rgb([128, 128, 128]);
const YELLOW_PAINT: Rgb<u8> = Rgb([230, 200, 20]);

fn plain(width: u32, height: u32) -> Frame {
    Frame::new(0, RgbImage::from_pixel(width, height, GRAY))
}

#[test]
fn stub_boxes_are_drawn_at_their_coordinates_in_detector_order() -> Result<()> {
    let frame = plain(100, 80);
    let boxes = vec![
        Region::new(5, 20, 20, 20),
        Region::new(40, 30, 30, 30),
        Region::new(75, 5, 10, 10),
    ];
    let mut detector = StubDetector::new(boxes.clone());
    let regions = detector.detect(&frame)?;

    let style = Style::new(RED).with_label_prefix("Face").with_stroke_width(1);
    let overlays = annotate::overlays(&regions, &style);
    let rects: Vec<Region> = overlays
        .iter()
        .filter_map(|overlay| match overlay {
            Overlay::Rect { region, .. } => Some(*region),
            Overlay::Text { .. } => None,
        })
        .collect();
    assert_eq!(rects, boxes);

    let labels: Vec<(&str, i32)> = overlays
        .iter()
        .filter_map(|overlay| match overlay {
            Overlay::Text { text, x, .. } => Some((text.as_str(), *x)),
            Overlay::Rect { .. } => None,
        })
        .collect();
    assert_eq!(labels, [("Face #0", 5), ("Face #1", 40), ("Face #2", 75)]);

    let drawn = annotate::annotated(&frame, &regions, &style);
    assert_eq!(drawn.pixels().get_pixel(40, 45), &RED);
    assert_eq!(drawn.pixels().get_pixel(55, 45), &GRAY);
    assert_eq!(frame.pixels().get_pixel(40, 45), &GRAY);
    Ok(())
}

#[test]
fn area_sort_is_opt_in() -> Result<()> {
    let frame = plain(100, 80);
    let mut detector = StubDetector::new(vec![
        Region::new(5, 20, 20, 20),
        Region::new(40, 30, 30, 30),
    ]);
    let mut regions = detector.detect(&frame)?;
    assert_eq!(regions[0].region, Region::new(5, 20, 20, 20));
    sort_by_area_desc(&mut regions);
    assert_eq!(regions[0].region, Region::new(40, 30, 30, 30));
    Ok(())
}

#[test]
fn saved_face_box_follows_a_mirrored_still() -> Result<()> {
    const FACE: Rgb<u8> = Rgb([200, 200, 200]);
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("face.png");
    let mut stored = RgbImage::new(100, 50);
    for y in 10..30 {
        for x in 10..30 {
            stored.put_pixel(x, y, FACE);
        }
    }
    stored.save(&path)?;

    let mut source = open_source(&SourceSettings {
        input: InputSpec::Image(path),
        mirror: true,
        ..SourceSettings::default()
    })?;
    source.connect()?;
    let frame = source.next_frame()?.expect("still frame");
    source.release();
    assert_eq!(frame.pixels().get_pixel(75, 20), &FACE);
    assert_eq!(frame.pixels().get_pixel(15, 20), &Rgb([0, 0, 0]));

    let saved: AnnotateResponse = serde_json::from_str(
        r#"{"responses":[{"faceAnnotations":[{"detectionConfidence":0.9,
            "boundingPoly":{"vertices":[{"x":10,"y":10},{"x":30,"y":10},{"x":30,"y":30},{"x":10,"y":30}]}}]}]}"#,
    )?;
    let response = saved.into_single()?;
    let mut regions = response.detections(VisionFeature::Face, frame.width(), frame.height());
    mirror_regions(&mut regions, frame.width());
    assert_eq!(regions.len(), 1);
    assert_eq!(regions[0].region, Region::new(70, 10, 20, 20));

    let drawn = annotate::annotated(&frame, &regions, &Style::new(GREEN).with_stroke_width(1));
    let pixels = drawn.pixels();
    assert_eq!(pixels.get_pixel(70, 20), &GREEN);
    assert_eq!(pixels.get_pixel(89, 20), &GREEN);
    assert_eq!(pixels.get_pixel(80, 10), &GREEN);
    assert_eq!(pixels.get_pixel(80, 20), &FACE);
    assert_eq!(pixels.get_pixel(10, 20), &Rgb([0, 0, 0]));
    Ok(())
}

#[test]
fn nested_regions_land_in_frame_coordinates() -> Result<()> {
    let frame = plain(120, 100);
    let outer = StubDetector::new(vec![Region::new(10, 20, 50, 40)]);
    let inner = StubDetector::new(vec![Region::new(5, 6, 8, 4)]);
    let mut nested = NestedDetector::new(outer, inner);

    let found = nested.detect_nested(&frame)?;
    assert_eq!(found.outer.len(), 1);
    assert_eq!(found.inner.len(), 1);
    assert_eq!(found.inner[0].region, Region::new(15, 26, 8, 4));
    Ok(())
}

#[test]
fn color_tracker_boxes_the_synthetic_marker() -> Result<()> {
    let mut scene = SyntheticSource::new(SyntheticConfig {
        width: 200,
        height: 100,
        frames: 3,
        marker_size: 16,
        step: 10,
        ..SyntheticConfig::default()
    });
    scene.connect()?;
    let mut tracker = ColorTracker::new(ColorPreset::Yellow.ranges())?;
    while let Some(frame) = scene.next_frame()? {
        let regions = tracker.detect(&frame)?;
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].region, scene.marker_region(frame.index()));
    }
    Ok(())
}

#[test]
fn color_tracker_reports_nothing_without_the_color() -> Result<()> {
    let mut tracker = ColorTracker::new(ColorPreset::Red.ranges())?;
    assert!(tracker.detect(&plain(64, 48))?.is_empty());
    Ok(())
}

#[test]
fn chroma_key_reveals_captured_background() -> Result<()> {
    let mut background_source = SyntheticSource::new(SyntheticConfig {
        width: 80,
        height: 60,
        frames: 4,
        marker_size: 1,
        step: 0,
        ..SyntheticConfig::default()
    });
    background_source.connect()?;
    let background = capture_background(&mut background_source, 3)?;
    assert_eq!(background.index(), 2);

    let key = ChromaKey::new(ColorPreset::Yellow.ranges(), background)?;
    let mut live = plain(80, 60);
    live.fill(Region::new(30, 10, 20, 20), YELLOW_PAINT);
    live.fill(Region::new(0, 50, 4, 4), GREEN);

    let mask = key.mask(&live);
    let coverage = mask_coverage(&mask);
    assert!(coverage > 0.05 && coverage < 0.15, "coverage {coverage}");

    let out = key.apply(&live)?;
    assert_eq!(out.index(), live.index());
    assert_eq!(out.pixels().get_pixel(40, 20), &GRAY);
    assert_eq!(out.pixels().get_pixel(1, 51), &GREEN);
    Ok(())
}

#[test]
fn background_capture_fails_on_empty_stream() {
    let mut empty = SyntheticSource::new(SyntheticConfig {
        frames: 0,
        ..SyntheticConfig::default()
    });
    assert!(capture_background(&mut empty, 5).is_err());
}
