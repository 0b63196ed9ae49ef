//! Photo capture demo
//!
//! Captures stills through the simulated native engine using both the future
//! and the callback form, with configured capture defaults.

use rtctrack::{
    engine_channel, CaptureTarget, PhotoHandle, PhotoOptions, SimulatedEngine, TrackConfig,
    TrackFactory,
};
use std::sync::Arc;
use tokio::sync::oneshot;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = TrackConfig::from_json(
        r#"{ "captureDefaults": { "captureTarget": "disk", "maxSize": 1600, "maxJpegQuality": 0.85 } }"#,
    )?;
    config.init_logging()?;
    println!("⚙️ Capture defaults: {:?}", config.capture_defaults);

    let (engine, commands) = engine_channel();
    let factory = TrackFactory::new(Arc::new(engine), config)?;
    let native = SimulatedEngine::spawn(commands, factory.notifications().clone());

    let track = factory.create_from_json(
        r#"{"id":"camera-1","kind":"video","label":"Back camera","enabled":true,"readyState":"live"}"#,
    )?;

    println!("📸 Capturing with defaults");
    describe(&track.capture_photo(PhotoOptions::new()).await?);

    println!("📸 Capturing into memory at 500px");
    let options = PhotoOptions::new()
        .max_size(500)
        .capture_target(CaptureTarget::Memory);
    describe(&track.capture_photo(options).await?);

    println!("📸 Capturing with callbacks after a simulated sensor fault");
    native.fail_next_photo("sensor not ready");
    let (done_tx, done_rx) = oneshot::channel();
    let error_tx = Arc::new(parking_lot::Mutex::new(Some(done_tx)));
    let success_tx = error_tx.clone();
    track.capture_photo_with(
        PhotoOptions::new().capture_target(CaptureTarget::CameraRoll),
        move |photo| {
            describe(&photo);
            if let Some(tx) = success_tx.lock().take() {
                let _ = tx.send(());
            }
        },
        move |err| {
            println!("   ❌ {} (recoverable: {})", err, err.is_recoverable());
            if let Some(tx) = error_tx.lock().take() {
                let _ = tx.send(());
            }
        },
    );
    let _ = done_rx.await;

    if let Some(state) = native.track_state("camera-1") {
        println!("   native photos taken: {}", state.photos_taken);
    }

    track.release();
    native.shutdown();
    println!("✅ Done");
    Ok(())
}

fn describe(photo: &PhotoHandle) {
    match photo {
        PhotoHandle::Memory(data) => println!("   ✅ {} bytes in memory", data.len()),
        PhotoHandle::File(path) => println!("   ✅ saved to {}", path.display()),
    }
}
