//! Camera resource for one capture session.
//!
//! The real stream runs on a dedicated capture thread behind [`CameraHandle`];
//! the trait exists so session tests can substitute a mock and count release
//! calls.

/// Target capture resolution requested from the device.
pub const TARGET_WIDTH: u32 = 1280;
pub const TARGET_HEIGHT: u32 = 720;

/// Exclusive handle to an acquired camera stream. Exactly one release per
/// acquire, on every session exit path; releasing twice is a no-op.
pub trait CameraHandle: Send {
    fn release(&mut self);
}

#[cfg(feature = "camera-nokhwa")]
pub use nokhwa_camera::{CameraDevice, CameraStream, available_cameras, start_camera_stream};

#[cfg(feature = "camera-nokhwa")]
mod nokhwa_camera {
    use std::{
        sync::{
            Arc,
            atomic::{AtomicBool, Ordering},
        },
        thread,
        time::Instant,
    };

    use anyhow::{Result, anyhow};
    use crossbeam_channel::Sender;
    use nokhwa::{
        Camera,
        pixel_format::RgbFormat,
        query,
        utils::{
            ApiBackend, CameraFormat, CameraIndex, FrameFormat, RequestedFormat,
            RequestedFormatType, Resolution,
        },
    };

    use super::{CameraHandle, TARGET_HEIGHT, TARGET_WIDTH};
    use crate::types::Frame;

    #[derive(Clone, Debug)]
    pub struct CameraDevice {
        pub index: CameraIndex,
        pub label: String,
    }

    #[derive(Debug)]
    pub struct CameraStream {
        stop: Arc<AtomicBool>,
        handle: Option<thread::JoinHandle<()>>,
    }

    impl CameraHandle for CameraStream {
        fn release(&mut self) {
            self.stop.store(true, Ordering::SeqCst);
            if let Some(handle) = self.handle.take() {
                let _ = handle.join();
            }
        }
    }

    impl Drop for CameraStream {
        fn drop(&mut self) {
            self.release();
        }
    }

    pub fn available_cameras() -> Result<Vec<CameraDevice>> {
        let cameras = query(ApiBackend::Auto)?;
        Ok(cameras
            .into_iter()
            .map(|info| CameraDevice {
                index: info.index().clone(),
                label: info.human_name(),
            })
            .collect())
    }

    fn requested_formats() -> [RequestedFormat<'static>; 2] {
        [
            RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(CameraFormat::new(
                Resolution::new(TARGET_WIDTH, TARGET_HEIGHT),
                FrameFormat::MJPEG,
                30,
            ))),
            RequestedFormat::new::<RgbFormat>(RequestedFormatType::None),
        ]
    }

    fn build_camera(index: CameraIndex) -> Result<Camera> {
        let mut last_err = None;

        for requested in requested_formats() {
            match Camera::new(index.clone(), requested) {
                Ok(mut camera) => match camera.open_stream() {
                    Ok(()) => return Ok(camera),
                    Err(err) => last_err = Some(err.into()),
                },
                Err(err) => last_err = Some(err.into()),
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow!("failed to open camera with any supported format")))
    }

    /// Open the camera and start pushing decoded RGBA frames into `frame_tx`
    /// from a capture thread. Fails up front (permission denied, no device)
    /// rather than from inside the thread where the error would be lost.
    pub fn start_camera_stream(index: CameraIndex, frame_tx: Sender<Frame>) -> Result<CameraStream> {
        // Fail fast before spawning the capture thread.
        build_camera(index.clone())?;

        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = stop.clone();

        let handle = thread::spawn(move || {
            let mut camera = match build_camera(index) {
                Ok(cam) => cam,
                Err(err) => {
                    log::error!("failed to reopen camera in capture thread: {err:?}");
                    return;
                }
            };

            while !stop_flag.load(Ordering::Relaxed) {
                let frame = match camera.frame() {
                    Ok(frame) => frame,
                    Err(err) => {
                        log::warn!("camera frame read failed: {err:?}");
                        continue;
                    }
                };

                let decoded = match frame.decode_image::<RgbFormat>() {
                    Ok(img) => img,
                    Err(err) => {
                        log::warn!("failed to decode camera frame: {err:?}");
                        continue;
                    }
                };

                let (width, height) = decoded.dimensions();
                let rgb = decoded.into_raw();
                if rgb.is_empty() {
                    continue;
                }

                // Expand RGB to RGBA for the capture/preview pipeline.
                let mut rgba = Vec::with_capacity(rgb.len() / 3 * 4);
                for chunk in rgb.chunks_exact(3) {
                    rgba.extend_from_slice(&[chunk[0], chunk[1], chunk[2], 255]);
                }

                let frame = Frame {
                    rgba,
                    width,
                    height,
                    timestamp: Instant::now(),
                };

                // Drop the frame if the session is busy with an older one.
                let _ = frame_tx.try_send(frame);
            }
        });

        Ok(CameraStream {
            stop,
            handle: Some(handle),
        })
    }
}
