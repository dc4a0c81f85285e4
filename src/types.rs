use std::time::Instant;

/// One tracked hand landmark in normalized image coordinates, `[x, y, z]`.
pub type Landmark = [f32; 3];

/// A detected hand is exactly this many landmarks, in MediaPipe's fixed
/// anatomical order (wrist, thumb joints, then four fingers base to tip).
pub const HAND_LANDMARK_COUNT: usize = 21;

#[derive(Clone, Debug)]
pub struct Frame {
    pub rgba: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub timestamp: Instant,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Handedness {
    Left,
    Right,
}

impl Handedness {
    pub fn label(&self) -> &'static str {
        match self {
            Handedness::Left => "left",
            Handedness::Right => "right",
        }
    }
}

/// One detector result for a single frame: raw landmarks in normalized
/// coordinates plus the same points projected into frame pixel space for
/// overlay drawing.
#[derive(Clone, Debug)]
pub struct HandDetection {
    pub landmarks: Vec<Landmark>,
    pub projected: Vec<(f32, f32)>,
    pub confidence: f32,
}

/// An encoded still handed to the consumer, produced at most once per session.
#[derive(Clone, Debug)]
pub struct CapturedImage {
    pub id: String,
    pub jpeg: Vec<u8>,
    pub width: u32,
    pub height: u32,
}
