//! End-to-end tests for the capture session loop, driven by a scripted
//! detector, a synthetic frame channel, and a release-counting camera mock.
//!
//! Frames in these tests carry the scripted finger count in their first RGBA
//! byte (255 meaning "no hand"), so detector output stays aligned with the
//! frames the loop actually processes even when it coalesces a backlog. Hold
//! timing runs on fabricated frame timestamps; only the countdown uses real
//! wall-clock ticks.

use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    thread,
    time::{Duration, Instant},
};

use anyhow::Result;
use crossbeam_channel::{Receiver, Sender, bounded, unbounded};
use gesture_shutter::{
    CameraHandle, Frame, HandDetection, HandDetector, SessionCommand, SessionEvent,
    SessionSnapshot, run_session_loop,
    types::{HAND_LANDMARK_COUNT, Landmark},
};

const NO_HAND: u8 = 255;

struct ScriptedDetector;

impl HandDetector for ScriptedDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Option<HandDetection>> {
        Ok(match frame.rgba[0] {
            NO_HAND => None,
            count => Some(HandDetection {
                landmarks: hand_with_fingers(count),
                projected: vec![(0.0, 0.0); HAND_LANDMARK_COUNT],
                confidence: 0.9,
            }),
        })
    }
}

struct MockCamera {
    releases: Arc<AtomicUsize>,
}

impl CameraHandle for MockCamera {
    fn release(&mut self) {
        self.releases.fetch_add(1, Ordering::SeqCst);
    }
}

/// Synthetic right hand with the first `count` of index/middle/ring/pinky
/// extended (tip above PIP), thumb extended only for a count of five.
fn hand_with_fingers(count: u8) -> Vec<Landmark> {
    let finger_joints = [(8usize, 6usize), (12, 10), (16, 14), (20, 18)];

    let mut pts = vec![[0.0f32; 3]; HAND_LANDMARK_COUNT];
    pts[0] = [0.5, 0.9, 0.0]; // wrist
    pts[9] = [0.6, 0.6, 0.0]; // middle MCP, right of wrist => right hand
    pts[3] = [0.45, 0.7, 0.0]; // thumb IP
    pts[4] = [0.40, 0.72, 0.0]; // thumb tip, folded
    for (tip, pip) in finger_joints {
        pts[pip] = [0.55, 0.55, 0.0];
        pts[tip] = [0.55, 0.65, 0.0];
    }

    for slot in 0..(count.min(4) as usize) {
        let (tip, pip) = finger_joints[slot];
        pts[tip] = [pts[pip][0], pts[pip][1] - 0.2, 0.0];
    }
    if count >= 5 {
        pts[4] = [pts[3][0] + 0.1, pts[3][1], 0.0];
    }
    pts
}

fn frame_with_count(count: u8, timestamp: Instant) -> Frame {
    Frame {
        rgba: vec![count; 4 * 4 * 4],
        width: 4,
        height: 4,
        timestamp,
    }
}

struct Harness {
    frame_tx: Sender<Frame>,
    command_tx: Sender<SessionCommand>,
    events: Receiver<SessionEvent>,
    state: Receiver<SessionSnapshot>,
    releases: Arc<AtomicUsize>,
    base: Instant,
    offset: Duration,
}

impl Harness {
    fn spawn() -> Self {
        // Rendezvous frame channel: the test hands over one frame at a time,
        // the way a real camera thread with a bounded(1) queue would.
        let (frame_tx, frame_rx) = bounded(0);
        let (command_tx, command_rx) = unbounded();
        let (event_tx, event_rx) = unbounded();
        let (state_tx, state_rx) = bounded(1);
        let releases = Arc::new(AtomicUsize::new(0));

        let camera = MockCamera {
            releases: releases.clone(),
        };
        thread::spawn(move || {
            run_session_loop(
                Box::new(ScriptedDetector),
                Box::new(camera),
                frame_rx,
                command_rx,
                event_tx,
                state_tx,
            );
        });

        Self {
            frame_tx,
            command_tx,
            events: event_rx,
            state: state_rx,
            releases,
            base: Instant::now(),
            offset: Duration::ZERO,
        }
    }

    /// Send one frame, advancing fabricated time by 40ms.
    fn send_frame(&mut self, count: u8) {
        self.offset += Duration::from_millis(40);
        let _ = self
            .frame_tx
            .send(frame_with_count(count, self.base + self.offset));
    }

    /// Feed `count` until the session's snapshot satisfies `done`.
    fn feed_until(&mut self, count: u8, done: impl Fn(&SessionSnapshot) -> bool) {
        let deadline = Instant::now() + Duration::from_secs(10);
        loop {
            self.send_frame(count);
            if let Ok(snapshot) = self.state.recv_timeout(Duration::from_millis(100)) {
                if done(&snapshot) {
                    return;
                }
            }
            assert!(
                Instant::now() < deadline,
                "session never reached the expected state"
            );
        }
    }

    fn expect_ready(&self) {
        match self.events.recv_timeout(Duration::from_secs(1)) {
            Ok(SessionEvent::Ready) => {}
            other => panic!("expected Ready, got {other:?}"),
        }
    }
}

#[test]
fn full_challenge_ends_in_exactly_one_capture() {
    let mut h = Harness::spawn();
    h.expect_ready();

    // Hold 1, then 2, then 3 fingers; fabricated timestamps advance 40ms per
    // frame so each hold crosses 1.5s quickly.
    h.feed_until(1, |s| s.sequencer.completed[0]);
    h.feed_until(2, |s| s.sequencer.completed[1]);
    h.feed_until(3, |s| s.sequencer.completed[2] && s.countdown == Some(3));

    // Countdown runs on real one-second ticks.
    let image = match h.events.recv_timeout(Duration::from_secs(6)) {
        Ok(SessionEvent::ImageReady(image)) => image,
        other => panic!("expected ImageReady, got {other:?}"),
    };
    assert!(image.id.starts_with("photo-"));
    assert_eq!((image.width, image.height), (4, 4));
    assert_eq!(&image.jpeg[..2], &[0xFF, 0xD8]);

    // The loop ended on the success path: no further events, no Closed, and
    // the camera released exactly once.
    match h.events.recv_timeout(Duration::from_secs(1)) {
        Err(_) => {}
        Ok(other) => panic!("unexpected event after capture: {other:?}"),
    }
    assert_eq!(h.releases.load(Ordering::SeqCst), 1);
}

#[test]
fn stage_progress_requires_the_matching_count() {
    let mut h = Harness::spawn();
    h.expect_ready();

    // Two fingers forever never satisfies stage one.
    for _ in 0..80 {
        h.send_frame(2);
    }
    let snapshot = h
        .state
        .recv_timeout(Duration::from_secs(1))
        .expect("snapshot");
    assert_eq!(snapshot.sequencer.completed, [false; 3]);
    assert_eq!(snapshot.sequencer.active_stage, Some(1));
    assert_eq!(snapshot.countdown, None);

    h.command_tx.send(SessionCommand::Close).unwrap();
    match h.events.recv_timeout(Duration::from_secs(1)) {
        Ok(SessionEvent::Closed) => {}
        other => panic!("expected Closed, got {other:?}"),
    }
}

#[test]
fn losing_the_hand_resets_hold_progress() {
    let mut h = Harness::spawn();
    h.expect_ready();

    // Build up most of a hold, then show no hand at all.
    h.feed_until(1, |s| s.sequencer.hold_progress > 0.3);
    h.feed_until(NO_HAND, |s| {
        s.detected_fingers == 0 && s.sequencer.hold_progress == 0.0
    });

    // The stage is still stage one and can complete afterwards.
    h.feed_until(1, |s| s.sequencer.completed[0]);

    h.command_tx.send(SessionCommand::Close).unwrap();
    match h.events.recv_timeout(Duration::from_secs(1)) {
        Ok(SessionEvent::Closed) => {}
        other => panic!("expected Closed, got {other:?}"),
    }
}

#[test]
fn closing_mid_countdown_never_captures() {
    let mut h = Harness::spawn();
    h.expect_ready();

    h.feed_until(1, |s| s.sequencer.completed[0]);
    h.feed_until(2, |s| s.sequencer.completed[1]);
    h.feed_until(3, |s| s.countdown == Some(3));

    // Keep frames flowing until the first real tick brings the digit to 2,
    // then cancel.
    h.feed_until(NO_HAND, |s| s.countdown == Some(2));
    h.command_tx.send(SessionCommand::Close).unwrap();

    match h.events.recv_timeout(Duration::from_secs(2)) {
        Ok(SessionEvent::Closed) => {}
        other => panic!("expected Closed, got {other:?}"),
    }
    // Sender side is gone; no ImageReady ever arrives.
    match h.events.recv_timeout(Duration::from_secs(2)) {
        Err(_) => {}
        Ok(other) => panic!("unexpected event after close: {other:?}"),
    }
    assert_eq!(h.releases.load(Ordering::SeqCst), 1);
}

#[test]
fn manual_capture_bypasses_the_sequence() {
    let mut h = Harness::spawn();
    h.expect_ready();

    // Request the capture before any frame exists; the first frame that
    // arrives is the one frozen, sequencer state never matters.
    h.command_tx.send(SessionCommand::ManualCapture).unwrap();
    h.send_frame(NO_HAND);

    let image = match h.events.recv_timeout(Duration::from_secs(2)) {
        Ok(SessionEvent::ImageReady(image)) => image,
        other => panic!("expected ImageReady, got {other:?}"),
    };
    assert_eq!(&image.jpeg[..2], &[0xFF, 0xD8]);
    assert_eq!(h.releases.load(Ordering::SeqCst), 1);
}

#[test]
fn camera_stream_loss_fails_the_session() {
    let h = Harness::spawn();
    h.expect_ready();

    drop(h.frame_tx);

    match h.events.recv_timeout(Duration::from_secs(2)) {
        Ok(SessionEvent::Failed(_)) => {}
        other => panic!("expected Failed, got {other:?}"),
    }
    match h.events.recv_timeout(Duration::from_secs(2)) {
        Ok(SessionEvent::Closed) => {}
        other => panic!("expected Closed, got {other:?}"),
    }
    assert_eq!(h.releases.load(Ordering::SeqCst), 1);
}
