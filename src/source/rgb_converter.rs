use std::convert::TryFrom;

use anyhow::{Result, anyhow};
use nokhwa::{Buffer, utils::FrameFormat};
use rayon::prelude::*;
use yuv::{
    YuvBiPlanarImage, YuvConversionMode, YuvPackedImage, YuvRange, YuvStandardMatrix,
    yuv_nv12_to_rgb, yuyv422_to_rgb,
};
use zune_jpeg::{
    JpegDecoder,
    zune_core::{bytestream::ZCursor, colorspace::ColorSpace, options::DecoderOptions},
};

use crate::types::Rgb;

#[derive(Debug)]
pub struct RgbImage {
    pub pixels: Vec<Rgb>,
    pub width: u32,
    pub height: u32,
}

pub fn convert_camera_frame(frame: &Buffer) -> Result<RgbImage> {
    let resolution = frame.resolution();
    let width = resolution.width_x;
    let height = resolution.height_y;
    let data = frame.buffer();

    let packed = match frame.source_frame_format() {
        FrameFormat::NV12 => nv12_to_rgb(data, width, height)?,
        FrameFormat::YUYV => yuyv_to_rgb(data, width, height)?,
        FrameFormat::MJPEG => mjpeg_to_rgb(data, width, height)?,
        FrameFormat::RAWRGB | FrameFormat::RAWBGR | FrameFormat::GRAY => {
            return convert_raw(frame.source_frame_format(), data, width, height);
        }
    };

    Ok(RgbImage {
        pixels: pack_rgb(&packed),
        width,
        height,
    })
}

/// Uncompressed formats, converted straight into pixels.
fn convert_raw(format: FrameFormat, data: &[u8], width: u32, height: u32) -> Result<RgbImage> {
    let pixels = match format {
        FrameFormat::RAWRGB => rgb_like_to_pixels(data, width, height, false)?,
        FrameFormat::RAWBGR => rgb_like_to_pixels(data, width, height, true)?,
        FrameFormat::GRAY => gray_to_pixels(data, width, height)?,
        other => return Err(anyhow!("{other:?} is not an uncompressed format")),
    };

    Ok(RgbImage {
        pixels,
        width,
        height,
    })
}

fn pack_rgb(bytes: &[u8]) -> Vec<Rgb> {
    bytes
        .par_chunks_exact(3)
        .map(|c| [c[0], c[1], c[2]])
        .collect()
}

fn nv12_to_rgb(data: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
    let y_plane_len = width as usize * height as usize;
    let uv_plane_len = y_plane_len / 2;

    if data.len() < y_plane_len + uv_plane_len {
        return Err(anyhow!(
            "NV12 buffer too small: got {}, expected {}",
            data.len(),
            y_plane_len + uv_plane_len
        ));
    }

    let image = YuvBiPlanarImage {
        y_plane: &data[..y_plane_len],
        y_stride: width,
        uv_plane: &data[y_plane_len..y_plane_len + uv_plane_len],
        uv_stride: width,
        width,
        height,
    };
    let mut rgb = vec![0u8; y_plane_len * 3];

    yuv_nv12_to_rgb(
        &image,
        &mut rgb,
        width * 3,
        YuvRange::Full,
        YuvStandardMatrix::Bt709,
        YuvConversionMode::Balanced,
    )
    .map_err(|err| anyhow!("NV12 to RGB failed: {err:?}"))?;

    Ok(rgb)
}

fn yuyv_to_rgb(data: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
    let expected_len = width as usize * height as usize * 2;
    if data.len() < expected_len {
        return Err(anyhow!(
            "YUYV buffer too small: got {}, expected {}",
            data.len(),
            expected_len
        ));
    }

    let packed = YuvPackedImage {
        yuy: data,
        yuy_stride: width * 2,
        width,
        height,
    };
    let mut rgb = vec![0u8; width as usize * height as usize * 3];

    yuyv422_to_rgb(
        &packed,
        &mut rgb,
        width * 3,
        YuvRange::Full,
        YuvStandardMatrix::Bt709,
    )
    .map_err(|err| anyhow!("YUYV422 to RGB failed: {err:?}"))?;

    Ok(rgb)
}

fn mjpeg_to_rgb(data: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
    let options = DecoderOptions::default().jpeg_set_out_colorspace(ColorSpace::RGB);
    let mut decoder = JpegDecoder::new_with_options(ZCursor::new(data), options);
    let rgb = decoder
        .decode()
        .map_err(|err| anyhow!("MJPEG decode failed: {err:?}"))?;

    let expected_len = usize::try_from(width)
        .and_then(|w| usize::try_from(height).map(|h| w * h * 3))
        .map_err(|_| anyhow!("MJPEG dimensions do not fit usize"))?;
    if rgb.len() < expected_len {
        return Err(anyhow!(
            "MJPEG decode produced too few bytes: got {}, expected {}",
            rgb.len(),
            expected_len
        ));
    }

    Ok(rgb)
}

fn rgb_like_to_pixels(data: &[u8], width: u32, height: u32, swap_rb: bool) -> Result<Vec<Rgb>> {
    let pixel_count = width as usize * height as usize;
    if data.len() < pixel_count * 3 {
        return Err(anyhow!(
            "RGB buffer too small: got {}, expected {}",
            data.len(),
            pixel_count * 3
        ));
    }

    Ok(data[..pixel_count * 3]
        .par_chunks_exact(3)
        .map(|src| {
            if swap_rb {
                [src[2], src[1], src[0]]
            } else {
                [src[0], src[1], src[2]]
            }
        })
        .collect())
}

fn gray_to_pixels(data: &[u8], width: u32, height: u32) -> Result<Vec<Rgb>> {
    let pixel_count = width as usize * height as usize;
    if data.len() < pixel_count {
        return Err(anyhow!(
            "GRAY buffer too small: got {}, expected {}",
            data.len(),
            pixel_count
        ));
    }

    Ok(data[..pixel_count]
        .par_iter()
        .map(|&value| [value, value, value])
        .collect())
}
