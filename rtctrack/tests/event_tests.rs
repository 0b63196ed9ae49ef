//! Tests for the track event contract
//!
//! Events only come from native notifications, and every listener must
//! observe the state change the event describes.

use async_trait::async_trait;
use parking_lot::Mutex;
use rtctrack::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn video_descriptor(id: &str) -> TrackDescriptor {
    TrackDescriptor {
        id: id.to_string(),
        kind: TrackKind::Video,
        label: "Back camera".to_string(),
        remote: false,
        enabled: true,
        constraints: None,
        ready_state: "live".to_string(),
    }
}

fn factory() -> (TrackFactory, EngineCommandReceiver) {
    let (engine, commands) = engine_channel();
    let factory = TrackFactory::new(Arc::new(engine), TrackConfig::default()).unwrap();
    (factory, commands)
}

fn notify(track: &MediaStreamTrack, kind: NotificationKind) -> bool {
    track.handle_notification(&Notification::new(track.id(), kind))
}

#[test]
fn test_local_commands_emit_nothing() {
    let (factory, _commands) = factory();
    let track = factory.create(video_descriptor("v1"));
    let fired = Arc::new(AtomicUsize::new(0));

    for kind in TrackEventKind::ALL {
        let fired = fired.clone();
        track.add_event_listener(kind, move |_| {
            fired.fetch_add(1, Ordering::SeqCst);
        });
    }

    track.set_enabled(false);
    track.set_enabled(true);
    track.stop();
    track.release();

    assert_eq!(fired.load(Ordering::SeqCst), 0);
}

#[test]
fn test_state_applied_before_listeners_run() {
    let (factory, _commands) = factory();
    let track = factory.create(video_descriptor("v1"));
    let seen = Arc::new(Mutex::new(Vec::new()));

    {
        let observer = track.clone();
        let seen = seen.clone();
        track.on_ended(move |_| seen.lock().push(format!("ended:{}", observer.ready_state())));
    }
    {
        let observer = track.clone();
        let seen = seen.clone();
        track.add_event_listener(TrackEventKind::Mute, move |_| {
            seen.lock().push(format!("mute:{}", observer.muted()))
        });
    }
    {
        let observer = track.clone();
        let seen = seen.clone();
        track.on_unmute(move |_| seen.lock().push(format!("unmute:{}", observer.muted())));
    }

    assert!(notify(&track, NotificationKind::Mute));
    assert!(notify(&track, NotificationKind::Unmute));
    assert!(notify(&track, NotificationKind::Ended));

    assert_eq!(
        *seen.lock(),
        vec!["mute:true", "unmute:false", "ended:ended"]
    );
}

#[test]
fn test_local_commands_wait_for_dispatch() {
    let (factory, _commands) = factory();
    let mut desc = video_descriptor("v1");
    desc.enabled = false;
    let track = factory.create(desc);
    let seen = Arc::new(Mutex::new(Vec::new()));
    let worker = Arc::new(Mutex::new(None));

    {
        let other = track.clone();
        let worker = worker.clone();
        track.add_event_listener(TrackEventKind::Mute, move |_| {
            let other = other.clone();
            *worker.lock() = Some(thread::spawn(move || other.set_enabled(true)));
            thread::sleep(Duration::from_millis(100));
        });
    }
    {
        let observer = track.clone();
        let seen = seen.clone();
        track.add_event_listener(TrackEventKind::Mute, move |_| seen.lock().push(observer.muted()));
    }

    notify(&track, NotificationKind::Mute);
    assert_eq!(*seen.lock(), vec![true]);

    let handle = worker.lock().take().unwrap();
    handle.join().unwrap();
    assert!(track.enabled());
    assert!(!track.muted());
}

/// Engine that reports native conditions inline, from inside the command call
#[derive(Default)]
struct InlineEngine {
    track: Mutex<Option<MediaStreamTrack>>,
}

impl InlineEngine {
    fn report(&self, track_id: &str, kind: NotificationKind) {
        let track = self.track.lock().clone();
        if let Some(track) = track {
            track.handle_notification(&Notification::new(track_id, kind));
        }
    }
}

#[async_trait]
impl NativeEngine for InlineEngine {
    fn set_track_enabled(&self, track_id: &str, enabled: bool) {
        if !enabled {
            self.report(track_id, NotificationKind::Mute);
        }
    }

    fn set_track_released(&self, track_id: &str) {
        self.report(track_id, NotificationKind::Ended);
    }

    fn switch_camera(&self, _track_id: &str) {}
    fn set_zoom(&self, _track_id: &str, _level: f64) {}
    fn toggle_flash(&self, _track_id: &str) {}

    async fn take_photo(
        &self,
        _track_id: &str,
        _options: NativePhotoOptions,
    ) -> TrackResult<PhotoHandle> {
        Err(TrackError::native_failure("takePhoto", "no camera"))
    }
}

#[test]
fn test_engine_may_notify_synchronously() {
    let engine = Arc::new(InlineEngine::default());
    let factory = TrackFactory::new(engine.clone(), TrackConfig::default()).unwrap();
    let track = factory.create(video_descriptor("v1"));
    *engine.track.lock() = Some(track.clone());
    let events = Arc::new(Mutex::new(Vec::new()));

    for kind in TrackEventKind::ALL {
        let events = events.clone();
        track.add_event_listener(kind, move |event| events.lock().push(event.event_type()));
    }

    track.set_enabled(false);
    track.stop();
    track.release();

    assert!(!track.enabled());
    assert!(track.muted());
    assert!(track.is_released());
    assert_eq!(track.ready_state(), ReadyState::Ended);
    // stop() already ended the track, so the inline ended changes nothing.
    assert_eq!(*events.lock(), vec!["mute"]);

    engine.track.lock().take();
}

#[test]
fn test_listeners_run_in_registration_order() {
    let (factory, _commands) = factory();
    let track = factory.create(video_descriptor("v1"));
    let order = Arc::new(Mutex::new(Vec::new()));

    let record = |tag: &'static str| {
        let order = order.clone();
        move |_: &TrackEvent| order.lock().push(tag)
    };

    track.add_event_listener(TrackEventKind::Overconstrained, record("first"));
    track.on_overconstrained(record("handler"));
    let removed = track.add_event_listener(TrackEventKind::Overconstrained, record("removed"));
    track.add_event_listener(TrackEventKind::Overconstrained, record("last"));
    assert!(track.remove_event_listener(removed));

    // Rebinding keeps the handler's slot.
    track.on_overconstrained(record("rebound"));
    assert_eq!(track.listener_count(TrackEventKind::Overconstrained), 3);

    notify(
        &track,
        NotificationKind::Overconstrained {
            constraint: Some("frameRate".to_string()),
            message: None,
        },
    );
    assert_eq!(*order.lock(), vec!["first", "rebound", "last"]);

    track.clear_handler(TrackEventKind::Overconstrained);
    assert!(!track.has_handler(TrackEventKind::Overconstrained));
    assert_eq!(track.listener_count(TrackEventKind::Overconstrained), 2);
}

#[test]
fn test_overconstrained_payload() {
    let (factory, _commands) = factory();
    let track = factory.create(video_descriptor("v1"));
    let payload = Arc::new(Mutex::new(None));

    {
        let payload = payload.clone();
        track.on_overconstrained(move |event| *payload.lock() = Some(event.clone()));
    }

    notify(
        &track,
        NotificationKind::Overconstrained {
            constraint: Some("width".to_string()),
            message: Some("camera cannot deliver 4K".to_string()),
        },
    );

    assert_eq!(
        *payload.lock(),
        Some(TrackEvent::Overconstrained {
            constraint: Some("width".to_string()),
            message: Some("camera cannot deliver 4K".to_string()),
        })
    );
    // Overconstrained leaves the track live.
    assert_eq!(track.ready_state(), ReadyState::Live);
}

#[test]
fn test_redundant_notifications_are_suppressed() {
    let (factory, _commands) = factory();
    let track = factory.create(video_descriptor("v1"));
    let counts = Arc::new(Mutex::new([0usize; 4]));

    for (slot, kind) in TrackEventKind::ALL.into_iter().enumerate() {
        let counts = counts.clone();
        track.add_event_listener(kind, move |_| counts.lock()[slot] += 1);
    }

    // Track starts unmuted, so unmute changes nothing.
    notify(&track, NotificationKind::Unmute);
    notify(&track, NotificationKind::Mute);
    notify(&track, NotificationKind::Mute);
    notify(&track, NotificationKind::Ended);
    notify(&track, NotificationKind::Ended);
    for _ in 0..2 {
        notify(
            &track,
            NotificationKind::Overconstrained {
                constraint: None,
                message: None,
            },
        );
    }

    assert_eq!(*counts.lock(), [1, 1, 0, 2]);
}

#[test]
fn test_ended_after_stop_does_not_emit() {
    let (factory, _commands) = factory();
    let track = factory.create(video_descriptor("v1"));
    let fired = Arc::new(AtomicUsize::new(0));

    {
        let fired = fired.clone();
        track.on_ended(move |_| {
            fired.fetch_add(1, Ordering::SeqCst);
        });
    }

    track.stop();
    assert!(notify(&track, NotificationKind::Ended));
    assert_eq!(fired.load(Ordering::SeqCst), 0);
}

#[test]
fn test_foreign_notifications_ignored() {
    let (factory, _commands) = factory();
    let track = factory.create(video_descriptor("v1"));
    let fired = Arc::new(AtomicUsize::new(0));

    {
        let fired = fired.clone();
        track.on_mute(move |_| {
            fired.fetch_add(1, Ordering::SeqCst);
        });
    }

    let handled = track.handle_notification(&Notification::new("v2", NotificationKind::Mute));
    assert!(!handled);
    assert!(!track.muted());
    assert_eq!(fired.load(Ordering::SeqCst), 0);
}

#[test]
fn test_listener_may_issue_commands() {
    let (factory, mut commands) = factory();
    let track = factory.create(video_descriptor("v1"));

    {
        let handle = track.clone();
        track.on_ended(move |_| handle.release());
    }
    notify(&track, NotificationKind::Ended);

    assert!(track.is_released());
    assert_eq!(commands.try_recv().unwrap().command_name(), "setTrackReleased");
}

#[tokio::test]
async fn test_event_stream_receives_events() {
    let (factory, _commands) = factory();
    let track = factory.create(video_descriptor("v1"));
    let mut events = track.events();

    notify(&track, NotificationKind::Mute);
    notify(&track, NotificationKind::Ended);

    assert_eq!(events.next().await, Some(TrackEvent::Mute));
    assert_eq!(events.next().await, Some(TrackEvent::Ended));

    drop(events);
    for kind in TrackEventKind::ALL {
        assert_eq!(track.listener_count(kind), 0);
    }
}

#[tokio::test]
async fn test_notification_pump_with_simulated_engine() {
    let (factory, commands) = factory();
    let native = SimulatedEngine::spawn(commands, factory.notifications().clone());

    let (camera, _camera_pump) = factory.create_listening(video_descriptor("camera"));
    let (other, _other_pump) = factory.create_listening(video_descriptor("other"));
    assert_eq!(factory.notifications().subscriber_count(), 2);

    let mut camera_events = camera.events();
    let mut other_events = other.events();

    assert_eq!(native.mute_track("camera"), 2);
    native.overconstrain_track("camera", "height");
    native.end_track("camera");

    let received = tokio::time::timeout(Duration::from_secs(1), async {
        let mut received = Vec::new();
        while received.len() < 3 {
            match camera_events.next().await {
                Some(event) => received.push(event.event_type()),
                None => break,
            }
        }
        received
    })
    .await
    .unwrap();

    assert_eq!(received, vec!["mute", "overconstrained", "ended"]);
    assert!(camera.muted());
    assert_eq!(camera.ready_state(), ReadyState::Ended);

    assert_eq!(other_events.try_next().unwrap(), None);
    assert!(!other.muted());
    assert_eq!(other.ready_state(), ReadyState::Live);
    native.shutdown();
}

#[tokio::test]
async fn test_pump_stops_when_hub_closes() {
    let (engine, _commands) = engine_channel();
    let hub = NotificationHub::with_capacity(4);
    let track = MediaStreamTrack::new(
        video_descriptor("v1"),
        Arc::new(engine),
        CaptureDefaults::default(),
    );

    let pump = track.listen(hub.subscribe());
    hub.publish(Notification::new("v1", NotificationKind::Mute));
    drop(hub);

    tokio::time::timeout(Duration::from_secs(1), pump)
        .await
        .unwrap()
        .unwrap();
    assert!(track.muted());
}

#[tokio::test]
async fn test_pump_stops_when_track_dropped() {
    let (engine, _commands) = engine_channel();
    let hub = NotificationHub::new();
    let track = MediaStreamTrack::new(
        video_descriptor("v1"),
        Arc::new(engine),
        CaptureDefaults::default(),
    );

    let pump = track.listen(hub.subscribe());
    drop(track);
    hub.publish(Notification::new("v1", NotificationKind::Mute));

    tokio::time::timeout(Duration::from_secs(1), pump)
        .await
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn test_lagging_pump_keeps_running() {
    let (engine, _commands) = engine_channel();
    let hub = NotificationHub::with_capacity(2);
    let track = MediaStreamTrack::new(
        video_descriptor("v1"),
        Arc::new(engine),
        CaptureDefaults::default(),
    );
    let receiver = hub.subscribe();

    // Overflow the subscriber before the pump starts reading.
    for _ in 0..4 {
        hub.publish(Notification::new("v1", NotificationKind::Mute));
    }
    hub.publish(Notification::new("v1", NotificationKind::Unmute));

    let pump = track.listen(receiver);
    hub.publish(Notification::new("v1", NotificationKind::Mute));
    drop(hub);

    tokio::time::timeout(Duration::from_secs(1), pump)
        .await
        .unwrap()
        .unwrap();
    assert!(track.muted());
}
