//! Gesture-confirmed photo capture.
//!
//! A capture session watches a camera feed for a three-stage finger-count
//! challenge (hold 1, then 2, then 3 fingers, each for 1.5 s), then runs a
//! 3-2-1 countdown and delivers a single JPEG still. Hand landmarks come
//! from an external handpose model treated as an opaque detector.

pub mod camera;
pub mod capture;
pub mod countdown;
pub mod detector;
pub mod fingers;
pub mod hold;
pub mod model;
pub mod sequencer;
pub mod session;
pub mod types;

pub use camera::CameraHandle;
pub use detector::HandDetector;
pub use sequencer::{SequencerSnapshot, StageSequencer};
pub use session::{SessionCommand, SessionEvent, SessionHandle, SessionSnapshot, run_session_loop};
pub use types::{CapturedImage, Frame, HandDetection, Landmark};
