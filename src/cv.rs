//! Conversions between crate frames and OpenCV matrices.
//!
//! OpenCV stores color pixels in BGR order; frames are RGB. Matrices are always built
//! continuous so the byte views below cover the whole image.

use anyhow::{anyhow, Context, Result};
use image::{GrayImage, RgbImage};
use opencv::core::{Mat, Rect, Scalar, CV_8UC1, CV_8UC3};
use opencv::prelude::*;

use crate::frame::{Frame, Region};

pub fn gray_to_mat(gray: &GrayImage) -> Result<Mat> {
    let mut mat = Mat::new_rows_cols_with_default(
        gray.height() as i32,
        gray.width() as i32,
        CV_8UC1,
        Scalar::all(0.0),
    )
    .context("allocate grayscale matrix")?;
    mat.data_bytes_mut()
        .context("grayscale matrix is not continuous")?
        .copy_from_slice(gray.as_raw());
    Ok(mat)
}

pub fn rgb_to_bgr_mat(pixels: &RgbImage) -> Result<Mat> {
    let mut mat = Mat::new_rows_cols_with_default(
        pixels.height() as i32,
        pixels.width() as i32,
        CV_8UC3,
        Scalar::all(0.0),
    )
    .context("allocate color matrix")?;
    let data = mat
        .data_bytes_mut()
        .context("color matrix is not continuous")?;
    for (dst, src) in data.chunks_exact_mut(3).zip(pixels.as_raw().chunks_exact(3)) {
        dst[0] = src[2];
        dst[1] = src[1];
        dst[2] = src[0];
    }
    Ok(mat)
}

pub fn frame_to_bgr_mat(frame: &Frame) -> Result<Mat> {
    rgb_to_bgr_mat(frame.pixels())
}

/// Copy an 8-bit BGR matrix back into an RGB frame.
pub fn bgr_mat_to_frame(index: u64, mat: &Mat) -> Result<Frame> {
    if mat.typ() != CV_8UC3 {
        return Err(anyhow!("expected an 8-bit 3-channel matrix, got type {}", mat.typ()));
    }
    let owned;
    let mat = if mat.is_continuous() {
        mat
    } else {
        owned = mat.try_clone().context("copy matrix")?;
        &owned
    };
    let data = mat.data_bytes().context("read matrix bytes")?;
    let mut rgb = Vec::with_capacity(data.len());
    for bgr in data.chunks_exact(3) {
        rgb.extend_from_slice(&[bgr[2], bgr[1], bgr[0]]);
    }
    Frame::from_rgb_bytes(index, mat.cols() as u32, mat.rows() as u32, rgb)
}

pub fn region_to_rect(region: Region) -> Rect {
    Rect::new(region.x, region.y, region.width as i32, region.height as i32)
}

pub fn rect_to_region(rect: Rect) -> Region {
    Region::new(
        rect.x,
        rect.y,
        rect.width.max(0) as u32,
        rect.height.max(0) as u32,
    )
}
