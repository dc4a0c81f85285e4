use crate::types::{HAND_LANDMARK_COUNT, Handedness, Landmark};

// MediaPipe landmark indices used by the counting heuristic.
const WRIST: usize = 0;
const THUMB_IP: usize = 3;
const THUMB_TIP: usize = 4;
const MIDDLE_MCP: usize = 9;

// (tip, pip) index pairs for index, middle, ring, pinky.
const FINGER_JOINTS: [(usize, usize); 4] = [(8, 6), (12, 10), (16, 14), (20, 18)];

/// Guess which hand we are looking at by comparing the middle-finger base to
/// the wrist along x. This is a mirroring-dependent proxy, not a true
/// anatomical handedness test; it assumes an unmirrored camera feed and is
/// only used to pick the thumb-extension direction.
pub fn handedness(landmarks: &[Landmark]) -> Handedness {
    if landmarks[MIDDLE_MCP][0] > landmarks[WRIST][0] {
        Handedness::Right
    } else {
        Handedness::Left
    }
}

/// Count extended fingers on a single detected hand.
///
/// Thumb: abducted past its IP joint along the hand's lateral axis, direction
/// chosen by the handedness heuristic. Other fingers: tip above the PIP joint
/// in image space (y grows downward). Malformed input counts as zero fingers
/// rather than failing; jitter is absorbed downstream by the hold timer, so
/// no smoothing happens here.
pub fn count_extended(landmarks: &[Landmark]) -> u8 {
    if landmarks.len() != HAND_LANDMARK_COUNT {
        return 0;
    }

    let mut count = 0u8;

    let tip_x = landmarks[THUMB_TIP][0];
    let ip_x = landmarks[THUMB_IP][0];
    let thumb_extended = match handedness(landmarks) {
        Handedness::Right => tip_x > ip_x,
        Handedness::Left => tip_x < ip_x,
    };
    if thumb_extended {
        count += 1;
    }

    for (tip, pip) in FINGER_JOINTS {
        if landmarks[tip][1] < landmarks[pip][1] {
            count += 1;
        }
    }

    count
}
