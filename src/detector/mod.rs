mod ort;

use anyhow::{Result, anyhow};
use image::{RgbaImage, imageops, imageops::FilterType};
use ndarray::Array4;

pub use self::ort::OrtHandDetector;
use crate::types::{Frame, HAND_LANDMARK_COUNT, HandDetection, Landmark};

/// Model input edge length; frames are letterboxed into this square.
const INPUT_SIZE: u32 = 224;

/// Detections below this confidence count as "no hand in frame".
const MIN_CONFIDENCE: f32 = 0.2;

/// The opaque hand-landmark model boundary: one frame in, zero or one hands
/// out. Implementations run on the session thread; the session owns the
/// handle exclusively for its lifetime.
pub trait HandDetector: Send {
    fn detect(&mut self, frame: &Frame) -> Result<Option<HandDetection>>;
}

#[derive(Clone, Debug)]
struct Letterbox {
    scale: f32,
    pad_x: f32,
    pad_y: f32,
    orig_w: u32,
    orig_h: u32,
}

/// Resize the frame into a padded square tensor, remembering the transform
/// so landmarks can be projected back into frame pixels.
fn prepare_frame(frame: &Frame) -> Result<(Array4<f32>, Letterbox)> {
    let Some(img) = RgbaImage::from_raw(frame.width, frame.height, frame.rgba.clone()) else {
        return Err(anyhow!("failed to build RGBA image from frame"));
    };

    let scale = INPUT_SIZE as f32 / (frame.width.max(frame.height) as f32);
    let new_w = (frame.width as f32 * scale).round().max(1.0) as u32;
    let new_h = (frame.height as f32 * scale).round().max(1.0) as u32;
    let resized = imageops::resize(&img, new_w, new_h, FilterType::CatmullRom);

    let pad_x = (INPUT_SIZE.saturating_sub(new_w) / 2) as i64;
    let pad_y = (INPUT_SIZE.saturating_sub(new_h) / 2) as i64;
    let mut canvas =
        RgbaImage::from_pixel(INPUT_SIZE, INPUT_SIZE, image::Rgba([0u8, 0u8, 0u8, 255u8]));
    imageops::replace(&mut canvas, &resized, pad_x, pad_y);

    let mut input = Array4::<f32>::zeros((1, INPUT_SIZE as usize, INPUT_SIZE as usize, 3));
    for (x, y, pixel) in canvas.enumerate_pixels() {
        input[[0, y as usize, x as usize, 0]] = pixel.0[0] as f32 / 255.0;
        input[[0, y as usize, x as usize, 1]] = pixel.0[1] as f32 / 255.0;
        input[[0, y as usize, x as usize, 2]] = pixel.0[2] as f32 / 255.0;
    }

    let letterbox = Letterbox {
        scale,
        pad_x: pad_x as f32,
        pad_y: pad_y as f32,
        orig_w: frame.width,
        orig_h: frame.height,
    };

    Ok((input, letterbox))
}

/// The model emits landmarks as a flat `[x, y, z]` run in letterbox pixel
/// space; split it into 21 points.
fn decode_landmarks(flat: &[f32]) -> Result<Vec<Landmark>> {
    if flat.len() < HAND_LANDMARK_COUNT * 3 {
        return Err(anyhow!(
            "unexpected landmarks length: got {}, need {}",
            flat.len(),
            HAND_LANDMARK_COUNT * 3
        ));
    }

    Ok(flat
        .chunks_exact(3)
        .take(HAND_LANDMARK_COUNT)
        .map(|chunk| [chunk[0], chunk[1], chunk[2]])
        .collect())
}

/// Landmarks scaled into the unit square, the coordinate space the finger
/// classifier expects.
fn normalize_landmarks(landmarks: &[Landmark]) -> Vec<Landmark> {
    let inv = 1.0 / INPUT_SIZE as f32;
    landmarks
        .iter()
        .map(|[x, y, z]| [x * inv, y * inv, z * inv])
        .collect()
}

/// Map letterbox-space landmarks back onto the original frame for overlay
/// drawing, clamped to the frame bounds.
fn project_landmarks(landmarks: &[Landmark], letterbox: &Letterbox) -> Vec<(f32, f32)> {
    landmarks
        .iter()
        .map(|[x, y, _z]| {
            let px = (x - letterbox.pad_x) / letterbox.scale;
            let py = (y - letterbox.pad_y) / letterbox.scale;
            let cx = px.clamp(0.0, (letterbox.orig_w.saturating_sub(1)) as f32);
            let cy = py.clamp(0.0, (letterbox.orig_h.saturating_sub(1)) as f32);
            (cx, cy)
        })
        .collect()
}
