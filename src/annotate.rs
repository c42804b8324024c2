//! Overlay drawing.
//!
//! [`overlays`] turns detection regions into drawing primitives without touching pixels;
//! [`render`] rasterises them onto a frame through embedded-graphics.

use std::convert::Infallible;

use embedded_graphics::{
    draw_target::DrawTarget,
    mono_font::{ascii::FONT_6X10, MonoTextStyle},
    pixelcolor::Rgb888,
    prelude::*,
    primitives::{PrimitiveStyle, Rectangle},
    text::{Baseline, Text},
};
use image::{Rgb, RgbImage};

use crate::frame::{DetectionRegion, Frame, Region};

pub const RED: Rgb<u8> = Rgb([255, 0, 0]);
pub const GREEN: Rgb<u8> = Rgb([0, 255, 0]);
pub const YELLOW: Rgb<u8> = Rgb([255, 255, 0]);

/// Vertical gap between a label's baseline and the top of its box.
pub const LABEL_OFFSET: i32 = 10;

const FONT_HEIGHT: i32 = 10;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Style {
    pub color: Rgb<u8>,
    pub stroke_width: u32,
    /// Numbered label prefix ("Face" gives "Face #0", "Face #1", ...).
    pub label_prefix: Option<String>,
    pub text_color: Rgb<u8>,
}

impl Style {
    pub fn new(color: Rgb<u8>) -> Self {
        Self {
            color,
            stroke_width: 2,
            label_prefix: None,
            text_color: color,
        }
    }

    pub fn with_label_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.label_prefix = Some(prefix.into());
        self
    }

    pub fn with_text_color(mut self, color: Rgb<u8>) -> Self {
        self.text_color = color;
        self
    }

    pub fn with_stroke_width(mut self, width: u32) -> Self {
        self.stroke_width = width;
        self
    }
}

impl Default for Style {
    fn default() -> Self {
        Self::new(GREEN)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Overlay {
    Rect {
        region: Region,
        color: Rgb<u8>,
        stroke_width: u32,
    },
    /// Text whose baseline starts at `(x, y)`.
    Text {
        x: i32,
        y: i32,
        text: String,
        color: Rgb<u8>,
    },
}

/// One rectangle per region, plus a label when the region has one or the style numbers
/// regions. Processor-supplied labels win over numbering.
pub fn overlays(regions: &[DetectionRegion], style: &Style) -> Vec<Overlay> {
    let mut out = Vec::with_capacity(regions.len() * 2);
    for (i, detection) in regions.iter().enumerate() {
        let region = detection.region;
        out.push(Overlay::Rect {
            region,
            color: style.color,
            stroke_width: style.stroke_width,
        });
        let label = detection.label.clone().or_else(|| {
            style
                .label_prefix
                .as_ref()
                .map(|prefix| format!("{prefix} #{i}"))
        });
        if let Some(text) = label {
            out.push(Overlay::Text {
                x: region.x.max(0),
                y: (region.y - LABEL_OFFSET).max(FONT_HEIGHT),
                text,
                color: style.text_color,
            });
        }
    }
    out
}

/// Draw `overlays` onto `frame`. Anything outside the frame is clipped.
pub fn render(frame: &mut Frame, overlays: &[Overlay]) {
    let mut target = Target(frame.pixels_mut());
    for overlay in overlays {
        let result = match overlay {
            Overlay::Rect {
                region,
                color,
                stroke_width,
            } => Rectangle::new(
                Point::new(region.x, region.y),
                Size::new(region.width, region.height),
            )
            .into_styled(PrimitiveStyle::with_stroke(to_rgb888(*color), *stroke_width))
            .draw(&mut target),
            Overlay::Text { x, y, text, color } => {
                let style = MonoTextStyle::new(&FONT_6X10, to_rgb888(*color));
                Text::with_baseline(text, Point::new(*x, *y), style, Baseline::Alphabetic)
                    .draw(&mut target)
                    .map(|_| ())
            }
        };
        match result {
            Ok(()) => {}
            Err(infallible) => match infallible {},
        }
    }
}

/// Copy of `frame` with `regions` drawn in `style`.
pub fn annotated(frame: &Frame, regions: &[DetectionRegion], style: &Style) -> Frame {
    let mut out = frame.clone();
    render(&mut out, &overlays(regions, style));
    out
}

fn to_rgb888(color: Rgb<u8>) -> Rgb888 {
    let [r, g, b] = color.0;
    Rgb888::new(r, g, b)
}

struct Target<'a>(&'a mut RgbImage);

impl OriginDimensions for Target<'_> {
    fn size(&self) -> Size {
        Size::new(self.0.width(), self.0.height())
    }
}

impl DrawTarget for Target<'_> {
    type Color = Rgb888;

    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = embedded_graphics::Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            if point.x >= 0
                && (point.x as u32) < self.0.width()
                && point.y >= 0
                && (point.y as u32) < self.0.height()
            {
                self.0.put_pixel(
                    point.x as u32,
                    point.y as u32,
                    Rgb([color.r(), color.g(), color.b()]),
                );
            }
        }

        Ok(())
    }
}
