use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result, anyhow};
use image::{RgbaImage, codecs::jpeg::JpegEncoder};

use crate::types::{CapturedImage, Frame};

/// Fixed encode quality for captured stills.
const JPEG_QUALITY: u8 = 95;

/// Freeze one frame into an encoded still with a generated identifier.
pub fn encode_frame(frame: &Frame) -> Result<CapturedImage> {
    let img = RgbaImage::from_raw(frame.width, frame.height, frame.rgba.clone())
        .ok_or_else(|| anyhow!("frame buffer does not match {}x{}", frame.width, frame.height))?;

    let mut jpeg = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut jpeg, JPEG_QUALITY);
    image::DynamicImage::ImageRgba8(img)
        .to_rgb8()
        .write_with_encoder(encoder)
        .context("failed to encode captured frame as jpeg")?;

    Ok(CapturedImage {
        id: generate_id(),
        jpeg,
        width: frame.width,
        height: frame.height,
    })
}

fn generate_id() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    format!("photo-{millis}")
}
