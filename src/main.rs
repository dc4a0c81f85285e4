use anyhow::Result;

fn main() -> Result<()> {
    env_logger::init();
    run()
}

#[cfg(feature = "camera-nokhwa")]
fn run() -> Result<()> {
    use anyhow::{Context, bail};
    use crossbeam_channel::select;
    use gesture_shutter::{
        SessionEvent,
        camera::available_cameras,
        model::default_model_path,
        session::start_session,
    };
    use nokhwa::utils::CameraIndex;

    let cameras = available_cameras().context("failed to enumerate cameras")?;
    if cameras.is_empty() {
        bail!("no cameras found");
    }
    for cam in &cameras {
        log::info!("camera {:?}: {}", cam.index, cam.label);
    }

    let index = std::env::args()
        .nth(1)
        .map(|arg| arg.parse::<u32>())
        .transpose()
        .context("camera index must be a number")?
        .map(CameraIndex::Index)
        .unwrap_or_else(|| cameras[0].index.clone());

    let session = start_session(index, default_model_path());
    let mut last_stage = None;
    let mut last_countdown = None;

    loop {
        select! {
            recv(session.events()) -> event => match event {
                Ok(SessionEvent::Loading) => println!("loading handpose model..."),
                Ok(SessionEvent::Ready) => {
                    println!("show 1 finger, then 2, then 3; hold each for 1.5s");
                }
                Ok(SessionEvent::ImageReady(image)) => {
                    let path = format!("{}.jpg", image.id);
                    std::fs::write(&path, &image.jpeg)
                        .with_context(|| format!("failed to write {path}"))?;
                    println!("saved {path} ({}x{})", image.width, image.height);
                    break;
                }
                Ok(SessionEvent::Failed(err)) => eprintln!("session failed: {err}"),
                Ok(SessionEvent::Closed) | Err(_) => {
                    println!("session closed without a capture");
                    break;
                }
            },
            recv(session.state()) -> snapshot => {
                let Ok(snapshot) = snapshot else { continue };
                if snapshot.sequencer.active_stage != last_stage {
                    last_stage = snapshot.sequencer.active_stage;
                    if let Some(stage) = last_stage {
                        println!("stage: show {stage} finger(s)");
                    }
                }
                if snapshot.countdown != last_countdown {
                    last_countdown = snapshot.countdown;
                    if let Some(remaining) = snapshot.countdown {
                        println!("capturing in {remaining}...");
                    }
                }
            },
        }
    }

    session.join();
    Ok(())
}

#[cfg(not(feature = "camera-nokhwa"))]
fn run() -> Result<()> {
    anyhow::bail!("built without camera support; enable the camera-nokhwa feature")
}
