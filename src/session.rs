//! The acquisition loop: owns the detector and the camera for one capture
//! session, drives classification and the stage sequencer per frame, runs the
//! countdown on an independent one-second ticker, and delivers the final
//! still exactly once.
//!
//! All mutable session state (sequencer, countdown, latest frame) lives in
//! locals owned by the loop and is read fresh on every iteration; nothing is
//! captured into callbacks, so frame and ticker arms can never observe a
//! stale stage or countdown flag.

use std::{thread, time::Duration};

use crossbeam_channel::{Receiver, Sender, never, select, tick};
use thiserror::Error;

use crate::{
    camera::CameraHandle,
    capture,
    countdown::{Countdown, CountdownTick},
    detector::HandDetector,
    fingers,
    sequencer::{SequencerEvent, SequencerSnapshot, StageSequencer},
    types::{CapturedImage, Frame},
};

/// Log the per-frame classification once every this many frames.
const CLASSIFY_LOG_INTERVAL: u64 = 32;

/// Terminal failures; each closes the session with resources released.
/// Wrong counts, missing hands, and interrupted holds are ordinary inputs,
/// not errors.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to load hand-landmark model: {0}")]
    ModelLoad(anyhow::Error),
    #[error("failed to acquire camera: {0}")]
    Camera(anyhow::Error),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionCommand {
    /// Capture the current frame immediately, ignoring sequencer and
    /// countdown state.
    ManualCapture,
    /// End the session without capturing.
    Close,
}

/// Lifecycle events. `ImageReady` and `Closed` are mutually exclusive and
/// each emitted at most once.
#[derive(Debug)]
pub enum SessionEvent {
    Loading,
    Ready,
    ImageReady(CapturedImage),
    Failed(SessionError),
    Closed,
}

/// Pure projection of the live session state for display: required stage,
/// completion flags, hold progress, countdown digit, detected fingers, and
/// overlay landmarks. Derived directly from sequencer/countdown state and
/// delivered lossily over a bounded(1) channel; updates are dropped while
/// the consumer lags.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionSnapshot {
    pub detected_fingers: u8,
    pub sequencer: SequencerSnapshot,
    pub countdown: Option<u32>,
    pub landmarks: Option<Vec<(f32, f32)>>,
}

pub struct SessionHandle {
    commands: Sender<SessionCommand>,
    events: Receiver<SessionEvent>,
    state: Receiver<SessionSnapshot>,
    thread: Option<thread::JoinHandle<()>>,
}

impl SessionHandle {
    pub fn manual_capture(&self) {
        let _ = self.commands.send(SessionCommand::ManualCapture);
    }

    pub fn close(&self) {
        let _ = self.commands.send(SessionCommand::Close);
    }

    pub fn events(&self) -> &Receiver<SessionEvent> {
        &self.events
    }

    pub fn state(&self) -> &Receiver<SessionSnapshot> {
        &self.state
    }

    pub fn join(mut self) {
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        let _ = self.commands.send(SessionCommand::Close);
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

/// Start a full capture session against a real camera: load the model, open
/// the camera, then run the loop. Both acquisitions happen on the session
/// thread so a close issued mid-startup is honored between steps and every
/// partial acquisition is unwound.
#[cfg(feature = "camera-nokhwa")]
pub fn start_session(
    camera_index: nokhwa::utils::CameraIndex,
    model_path: std::path::PathBuf,
) -> SessionHandle {
    use crate::{camera::start_camera_stream, detector::OrtHandDetector, model};
    use crossbeam_channel::{bounded, unbounded};

    let (command_tx, command_rx) = unbounded();
    let (event_tx, event_rx) = unbounded();
    let (state_tx, state_rx) = bounded(1);

    let thread = thread::spawn(move || {
        let _ = event_tx.send(SessionEvent::Loading);

        let detector = model::ensure_model_available(&model_path)
            .and_then(|()| OrtHandDetector::load(&model_path));
        let detector = match detector {
            Ok(detector) => detector,
            Err(err) => {
                log::error!("model startup failed: {err:?}");
                let _ = event_tx.send(SessionEvent::Failed(SessionError::ModelLoad(err)));
                let _ = event_tx.send(SessionEvent::Closed);
                return;
            }
        };

        // A close issued while the model was loading abandons startup before
        // the camera is ever touched.
        if drain_for_close(&command_rx) {
            let _ = event_tx.send(SessionEvent::Closed);
            return;
        }

        let (frame_tx, frame_rx) = bounded(1);
        let camera = match start_camera_stream(camera_index, frame_tx) {
            Ok(camera) => camera,
            Err(err) => {
                log::error!("camera startup failed: {err:?}");
                let _ = event_tx.send(SessionEvent::Failed(SessionError::Camera(err)));
                let _ = event_tx.send(SessionEvent::Closed);
                return;
            }
        };

        run_session_loop(
            Box::new(detector),
            Box::new(camera),
            frame_rx,
            command_rx,
            event_tx,
            state_tx,
        );
    });

    SessionHandle {
        commands: command_tx,
        events: event_rx,
        state: state_rx,
        thread: Some(thread),
    }
}

#[cfg(feature = "camera-nokhwa")]
fn drain_for_close(command_rx: &Receiver<SessionCommand>) -> bool {
    loop {
        match command_rx.try_recv() {
            Ok(SessionCommand::Close) => return true,
            Ok(SessionCommand::ManualCapture) => continue,
            Err(_) => return false,
        }
    }
}

/// The per-frame cycle, separated from resource startup so tests can drive
/// it with a scripted detector, a synthetic frame channel, and a mock camera
/// handle. The camera is released exactly once on every exit path.
pub fn run_session_loop(
    mut detector: Box<dyn HandDetector>,
    mut camera: Box<dyn CameraHandle>,
    frame_rx: Receiver<Frame>,
    command_rx: Receiver<SessionCommand>,
    event_tx: Sender<SessionEvent>,
    state_tx: Sender<SessionSnapshot>,
) {
    let mut sequencer = StageSequencer::new();
    let mut countdown = Countdown::new();
    let mut last_frame: Option<Frame> = None;
    let mut pending_manual = false;
    let mut frame_counter: u64 = 0;
    let mut ticker = never();

    let _ = event_tx.send(SessionEvent::Ready);

    loop {
        select! {
            recv(command_rx) -> cmd => match cmd {
                Ok(SessionCommand::Close) | Err(_) => {
                    countdown.cancel();
                    camera.release();
                    let _ = event_tx.send(SessionEvent::Closed);
                    return;
                }
                Ok(SessionCommand::ManualCapture) => {
                    match last_frame.as_ref() {
                        Some(frame) => {
                            finish_with_capture(frame, &mut camera, &event_tx);
                            return;
                        }
                        // No frame yet; capture the first one that arrives.
                        None => pending_manual = true,
                    }
                }
            },
            recv(frame_rx) -> frame => {
                let Ok(frame) = frame else {
                    // The capture thread went away mid-session.
                    log::error!("camera stream ended unexpectedly");
                    countdown.cancel();
                    camera.release();
                    let _ = event_tx.send(SessionEvent::Failed(SessionError::Camera(
                        anyhow::anyhow!("camera stream ended unexpectedly"),
                    )));
                    let _ = event_tx.send(SessionEvent::Closed);
                    return;
                };
                // Coalesce to the newest pending frame so a slow detector
                // never chews through stale backlog.
                let frame = latest_frame(frame, &frame_rx);
                frame_counter += 1;

                if pending_manual {
                    finish_with_capture(&frame, &mut camera, &event_tx);
                    return;
                }

                let now = frame.timestamp;
                let detection = match detector.detect(&frame) {
                    Ok(detection) => detection,
                    Err(err) => {
                        log::warn!("hand detection failed: {err:?}");
                        None
                    }
                };

                let count = detection
                    .as_ref()
                    .map(|d| fingers::count_extended(&d.landmarks))
                    .unwrap_or(0);

                if frame_counter % CLASSIFY_LOG_INTERVAL == 0 {
                    log::debug!(
                        "classified {count} finger(s), target {:?}, countdown {:?}",
                        sequencer.target(),
                        countdown.remaining(),
                    );
                }

                // Gesture matching and the countdown are mutually exclusive:
                // once all stages confirm, frames no longer reach the
                // sequencer and only the ticker drives progress.
                if !countdown.is_active()
                    && sequencer.observe(count, now) == SequencerEvent::AllComplete
                {
                    log::info!("all stages complete, starting countdown");
                    countdown.start();
                    ticker = tick(Duration::from_secs(1));
                }

                let snapshot = SessionSnapshot {
                    detected_fingers: count,
                    sequencer: sequencer.snapshot(now),
                    countdown: countdown.remaining(),
                    landmarks: detection.map(|d| d.projected),
                };
                let _ = state_tx.try_send(snapshot);

                last_frame = Some(frame);
            },
            recv(ticker) -> _ => {
                match countdown.tick() {
                    Some(CountdownTick::Fire) => {
                        match last_frame.as_ref() {
                            Some(frame) => {
                                finish_with_capture(frame, &mut camera, &event_tx);
                                return;
                            }
                            None => {
                                // Unreachable in practice: the countdown only
                                // starts after at least one processed frame.
                                log::error!("countdown fired with no frame to capture");
                                camera.release();
                                let _ = event_tx.send(SessionEvent::Closed);
                                return;
                            }
                        }
                    }
                    Some(CountdownTick::Continue(remaining)) => {
                        log::debug!("countdown at {remaining}");
                    }
                    None => {}
                }
            },
        }
    }
}

fn latest_frame(mut frame: Frame, frame_rx: &Receiver<Frame>) -> Frame {
    while let Ok(newer) = frame_rx.try_recv() {
        frame = newer;
    }
    frame
}

/// Success path: encode the frame, release the camera, emit `ImageReady`.
/// Emits `Closed` instead if encoding fails, so the consumer always gets a
/// terminal event.
fn finish_with_capture(
    frame: &Frame,
    camera: &mut Box<dyn CameraHandle>,
    event_tx: &Sender<SessionEvent>,
) {
    camera.release();
    match capture::encode_frame(frame) {
        Ok(image) => {
            log::info!("captured {} ({}x{})", image.id, image.width, image.height);
            let _ = event_tx.send(SessionEvent::ImageReady(image));
        }
        Err(err) => {
            log::error!("failed to encode captured frame: {err:?}");
            let _ = event_tx.send(SessionEvent::Closed);
        }
    }
}
