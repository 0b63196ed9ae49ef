//! Track lifecycle demo
//!
//! Wraps a local camera track around the simulated native engine, drives it
//! through enable/disable, camera controls, native notifications, stop and
//! release, printing every event the handle emits.

use rtctrack::{
    engine_channel, SimulatedEngine, TrackConfig, TrackDescriptor, TrackEventKind, TrackFactory,
};
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = TrackConfig {
        debug_logging: true,
        ..TrackConfig::default()
    };
    config.init_logging()?;

    let (engine, commands) = engine_channel();
    let factory = TrackFactory::new(Arc::new(engine), config)?;
    let native = SimulatedEngine::spawn(commands, factory.notifications().clone());

    let descriptor = TrackDescriptor::from_json(
        r#"{
            "id": "camera-0",
            "kind": "video",
            "label": "Front camera",
            "remote": false,
            "enabled": true,
            "constraints": { "facingMode": "user", "width": { "ideal": 1280 } },
            "readyState": "INITIALIZING"
        }"#,
    )?;
    let (track, pump) = factory.create_listening(descriptor);
    println!("📹 Created {:?}", track);
    println!("   constraints: {}", serde_json::Value::Object(track.get_constraints()));

    for kind in TrackEventKind::ALL {
        track.add_event_listener(kind, move |event| println!("   🔔 {} -> {:?}", kind, event));
    }
    {
        let observer = track.clone();
        track.on_ended(move |_| println!("   ⏹️ onended: readyState is {}", observer.ready_state()));
    }
    let mut events = track.events();

    println!("🔇 Disabling track");
    track.set_enabled(false);
    println!("   enabled={} muted={}", track.enabled(), track.muted());

    println!("🔊 Enabling track");
    track.set_enabled(true);
    println!("   enabled={} muted={}", track.enabled(), track.muted());

    println!("🔁 Camera controls");
    track.switch_camera()?;
    track.set_zoom(2.5)?;
    track.switch_flash()?;

    println!("📡 Native notifications");
    native.mute_track("camera-0");
    native.unmute_track("camera-0");
    native.overconstrain_track("camera-0", "frameRate");
    native.end_track("camera-0");

    for _ in 0..4 {
        match tokio::time::timeout(Duration::from_secs(1), events.next()).await {
            Ok(Some(event)) => println!("   📥 stream received {}", event.event_type()),
            _ => break,
        }
    }

    println!("🗑️ Stopping and releasing");
    track.stop();
    track.release();

    tokio::time::sleep(Duration::from_millis(50)).await;
    if let Some(state) = native.track_state("camera-0") {
        println!("   native state: {:?}", state);
    }
    println!("   handled {} native commands", native.commands_processed());

    if let Err(e) = track.apply_constraints(&track.get_constraints()) {
        println!("⚠️ {} ({})", e, e.error_code());
    }

    events.close();
    native.shutdown();
    pump.abort();
    println!("✅ Done");
    Ok(())
}
