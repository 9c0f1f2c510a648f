//! Coordinator behaviour: deferred start, volume convergence, looping and
//! effect dispatch, observed through recording bridges.

use bridge_traits::mock::{
    PlayerCommand, RecordingAudioOutput, RecordingAudioOutputFactory, RecordingVideoPlayer,
    RecordingVideoPlayerHost, StaticHttpClient,
};
use bridge_traits::{
    LoadVideoRequest, PlaybackQuality, PlayerErrorCode, PlayerEvent, PlayerState,
};
use bytes::Bytes;
use core_async::sync::mpsc;
use core_playback::PlaybackCoordinator;
use core_runtime::events::{CoreEvent, EffectEvent, PlaybackEvent, Receiver};
use core_runtime::{EventBus, OverlayConfig};
use std::sync::Arc;

struct Harness {
    coordinator: PlaybackCoordinator,
    host: Arc<RecordingVideoPlayerHost>,
    http: Arc<StaticHttpClient>,
    audio: Arc<RecordingAudioOutput>,
    events: Receiver<CoreEvent>,
    _player_events: mpsc::UnboundedReceiver<PlayerEvent>,
}

impl Harness {
    async fn new() -> Self {
        Self::with_http(StaticHttpClient::new()).await
    }

    async fn with_http(http: StaticHttpClient) -> Self {
        let host = Arc::new(RecordingVideoPlayerHost::new());
        let http = Arc::new(http);
        let audio = Arc::new(RecordingAudioOutput::new());
        let config = OverlayConfig::builder()
            .video_player_host(host.clone())
            .http_client(http.clone())
            .audio_output(Arc::new(RecordingAudioOutputFactory::new(audio.clone())))
            .build()
            .unwrap();

        let bus = EventBus::new(256);
        let events = bus.subscribe();
        let mut coordinator = PlaybackCoordinator::new(&config, bus);

        let (tx, rx) = mpsc::unbounded_channel();
        coordinator
            .attach_player(host.as_ref(), config.player.clone(), tx)
            .await
            .unwrap();

        Self {
            coordinator,
            host,
            http,
            audio,
            events,
            _player_events: rx,
        }
    }

    async fn ready(mut self) -> Self {
        self.coordinator.handle_player_event(PlayerEvent::Ready).await;
        self.player().clear_commands();
        self.drain();
        self
    }

    fn player(&self) -> Arc<RecordingVideoPlayer> {
        self.host.player()
    }

    fn loads(&self) -> Vec<LoadVideoRequest> {
        self.player().loads()
    }

    fn drain(&mut self) -> Vec<CoreEvent> {
        let mut out = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            out.push(event);
        }
        out
    }

    fn assert_intent_consistent(&self) {
        let intent = self.coordinator.intent();
        assert!(!intent.is_playing() || intent.track_id().is_some());
    }
}

fn load(track: &str, start: f64, quality: PlaybackQuality) -> LoadVideoRequest {
    LoadVideoRequest {
        video_id: track.to_string(),
        start_seconds: start,
        suggested_quality: quality,
    }
}

// ============================================================================
// Deferred start
// ============================================================================

#[tokio::test]
async fn play_before_ready_replays_once_on_readiness() {
    let mut h = Harness::new().await;

    h.coordinator.play_request("abc", Some(0.5), None).await;
    assert!(h.player().commands().is_empty());
    assert!(h.coordinator.intent().is_playing());

    h.coordinator.handle_player_event(PlayerEvent::Ready).await;

    assert_eq!(h.loads(), vec![load("abc", 0.0, PlaybackQuality::Small)]);
    assert_eq!(h.player().last_volume(), Some(50));
}

#[tokio::test]
async fn readiness_replays_only_the_latest_intent() {
    let mut h = Harness::new().await;

    h.coordinator.play_request("first", Some(0.2), None).await;
    h.coordinator.play_request("second", Some(0.9), Some(12.0)).await;
    h.coordinator.handle_player_event(PlayerEvent::Ready).await;

    assert_eq!(h.loads(), vec![load("second", 12.0, PlaybackQuality::Small)]);
    assert_eq!(h.player().last_volume(), Some(90));
    assert_eq!(h.player().play_count(), 0);
}

#[tokio::test]
async fn duplicate_readiness_does_not_replay_again() {
    let mut h = Harness::new().await;

    h.coordinator.play_request("abc", Some(0.5), None).await;
    h.coordinator.handle_player_event(PlayerEvent::Ready).await;
    h.coordinator.handle_player_event(PlayerEvent::Ready).await;

    assert_eq!(h.loads().len(), 1);
}

#[tokio::test]
async fn readiness_applies_preferred_quality() {
    let mut h = Harness::new().await;
    h.coordinator.init(Some(PlaybackQuality::Hd720));

    h.coordinator.handle_player_event(PlayerEvent::Ready).await;

    let events = h.drain();
    assert!(events.contains(&CoreEvent::Playback(PlaybackEvent::BackendReady)));
    assert_eq!(
        h.player().commands().first(),
        Some(&PlayerCommand::SetQuality(PlaybackQuality::Hd720))
    );
    assert!(h.loads().is_empty());
}

#[tokio::test]
async fn stop_before_ready_touches_nothing() {
    let mut h = Harness::new().await;

    h.coordinator.stop_request().await;

    assert!(h.player().commands().is_empty());
    assert!(!h.coordinator.intent().is_playing());
    assert!(h
        .drain()
        .contains(&CoreEvent::Playback(PlaybackEvent::Stopped)));
}

#[tokio::test]
async fn stop_before_ready_cancels_deferred_playback() {
    let mut h = Harness::new().await;

    h.coordinator.play_request("abc", Some(0.5), Some(30.0)).await;
    h.coordinator.stop_request().await;
    h.coordinator.handle_player_event(PlayerEvent::Ready).await;

    assert!(h.loads().is_empty());
    assert_eq!(h.player().last_volume(), Some(0));
}

// ============================================================================
// Requests on a ready player
// ============================================================================

#[tokio::test]
async fn new_track_loads_with_requested_start() {
    let mut h = Harness::new().await.ready().await;

    h.coordinator.play_request("abc", Some(0.4), Some(42.5)).await;

    assert_eq!(h.loads(), vec![load("abc", 42.5, PlaybackQuality::Small)]);
    assert_eq!(h.player().last_volume(), Some(40));
    assert!(h.drain().contains(&CoreEvent::Playback(PlaybackEvent::TrackLoading {
        track_id: "abc".to_string(),
        start_seconds: 42.5,
    })));
}

#[tokio::test]
async fn init_quality_applies_to_later_loads_only() {
    let mut h = Harness::new().await.ready().await;

    h.coordinator.play_request("abc", Some(0.5), None).await;
    h.coordinator.init(Some(PlaybackQuality::Large));
    h.coordinator.init(None);
    h.coordinator.play_request("def", Some(0.5), None).await;

    assert_eq!(
        h.loads(),
        vec![
            load("abc", 0.0, PlaybackQuality::Small),
            load("def", 0.0, PlaybackQuality::Large),
        ]
    );
}

#[tokio::test]
async fn same_track_while_playing_only_changes_volume() {
    let mut h = Harness::new().await.ready().await;

    h.coordinator.play_request("abc", Some(0.8), None).await;
    h.coordinator.play_request("abc", Some(0.3), None).await;

    assert_eq!(h.loads().len(), 1);
    assert_eq!(h.player().play_count(), 0);
    assert_eq!(h.player().last_volume(), Some(30));
}

#[tokio::test]
async fn missing_play_volume_uses_default() {
    let mut h = Harness::new().await.ready().await;

    h.coordinator.play_request("abc", None, None).await;

    assert_eq!(h.player().last_volume(), Some(50));
}

#[tokio::test]
async fn stop_stops_then_clears_and_resets_intent() {
    let mut h = Harness::new().await.ready().await;
    h.coordinator.play_request("abc", Some(0.7), None).await;
    h.player().clear_commands();

    h.coordinator.stop_request().await;

    assert_eq!(
        h.player().commands(),
        vec![
            PlayerCommand::Stop,
            PlayerCommand::Clear,
            PlayerCommand::SetVolume(0)
        ]
    );
    let intent = h.coordinator.intent();
    assert_eq!(intent.track_id(), None);
    assert!(!intent.is_playing());
    assert_eq!(intent.target_volume(), 0.0);
}

#[tokio::test]
async fn replaying_after_stop_loads_again() {
    let mut h = Harness::new().await.ready().await;
    h.coordinator.play_request("abc", Some(0.7), None).await;
    h.coordinator.stop_request().await;

    h.coordinator.play_request("abc", Some(0.7), None).await;

    assert_eq!(h.loads().len(), 2);
    assert!(h.coordinator.intent().is_playing());
}

// ============================================================================
// Volume reconciliation
// ============================================================================

#[tokio::test]
async fn volume_updates_are_clamped() {
    let mut h = Harness::new().await.ready().await;
    h.coordinator.play_request("abc", Some(0.5), None).await;

    for (requested, expected) in [(Some(0.555), 56), (Some(-1.0), 0), (Some(3.0), 100), (None, 0)] {
        h.coordinator.volume_update_request(requested).await;
        h.coordinator.on_tick().await;
        assert_eq!(h.player().last_volume(), Some(expected), "volume {requested:?}");
    }
}

#[tokio::test]
async fn tick_reapplies_volume_while_playing() {
    let mut h = Harness::new().await.ready().await;
    h.coordinator.play_request("abc", Some(0.6), None).await;
    h.player().clear_commands();

    h.coordinator.on_tick().await;
    h.coordinator.on_tick().await;

    assert_eq!(
        h.player().commands(),
        vec![PlayerCommand::SetVolume(60), PlayerCommand::SetVolume(60)]
    );
}

#[tokio::test]
async fn tick_is_silent_when_idle_or_unready() {
    let mut h = Harness::new().await;
    h.coordinator.play_request("abc", Some(0.6), None).await;
    h.coordinator.on_tick().await;
    assert!(h.player().commands().is_empty());

    let mut h = h.ready().await;
    h.coordinator.stop_request().await;
    h.player().clear_commands();
    h.coordinator.on_tick().await;
    assert!(h.player().commands().is_empty());
}

#[tokio::test]
async fn volume_events_only_fire_on_change() {
    let mut h = Harness::new().await.ready().await;
    h.coordinator.play_request("abc", Some(0.6), None).await;
    h.drain();

    h.coordinator.on_tick().await;
    h.coordinator.volume_update_request(Some(0.2)).await;

    let applied: Vec<_> = h
        .drain()
        .into_iter()
        .filter(|e| matches!(e, CoreEvent::Playback(PlaybackEvent::VolumeApplied { .. })))
        .collect();
    assert_eq!(
        applied,
        vec![CoreEvent::Playback(PlaybackEvent::VolumeApplied { percent: 20 })]
    );
}

// ============================================================================
// Player callbacks
// ============================================================================

#[tokio::test]
async fn ended_while_playing_loops_once_per_occurrence() {
    let mut h = Harness::new().await.ready().await;
    h.coordinator.play_request("abc", Some(0.5), None).await;

    h.coordinator
        .handle_player_event(PlayerEvent::StateChange(PlayerState::Ended))
        .await;
    assert_eq!(h.player().play_count(), 1);

    h.coordinator
        .handle_player_event(PlayerEvent::StateChange(PlayerState::Ended))
        .await;
    assert_eq!(h.player().play_count(), 2);

    assert!(h.drain().contains(&CoreEvent::Playback(PlaybackEvent::Looped {
        track_id: "abc".to_string()
    })));
}

#[tokio::test]
async fn ended_after_stop_does_not_loop() {
    let mut h = Harness::new().await.ready().await;
    h.coordinator.play_request("abc", Some(0.5), None).await;
    h.coordinator.stop_request().await;

    h.coordinator
        .handle_player_event(PlayerEvent::StateChange(PlayerState::Ended))
        .await;

    assert_eq!(h.player().play_count(), 0);
}

#[tokio::test]
async fn playing_state_reenforces_quality() {
    let mut h = Harness::new().await.ready().await;
    h.coordinator.play_request("abc", Some(0.5), None).await;
    h.player().clear_commands();

    h.coordinator
        .handle_player_event(PlayerEvent::StateChange(PlayerState::Playing))
        .await;

    assert_eq!(
        h.player().commands(),
        vec![PlayerCommand::SetQuality(PlaybackQuality::Small)]
    );
}

#[tokio::test]
async fn mid_track_init_keeps_the_loaded_quality_on_playing() {
    let mut h = Harness::new().await.ready().await;
    h.coordinator.play_request("abc", Some(0.5), None).await;
    h.coordinator.init(Some(PlaybackQuality::Large));
    h.player().clear_commands();

    h.coordinator
        .handle_player_event(PlayerEvent::StateChange(PlayerState::Playing))
        .await;

    assert_eq!(
        h.player().commands(),
        vec![PlayerCommand::SetQuality(PlaybackQuality::Small)]
    );
}

#[tokio::test]
async fn player_errors_leave_intent_untouched() {
    let mut h = Harness::new().await.ready().await;
    h.coordinator.play_request("abc", Some(0.5), None).await;
    h.drain();

    h.coordinator
        .handle_player_event(PlayerEvent::Error(PlayerErrorCode::from_code(150)))
        .await;

    assert_eq!(h.coordinator.intent().track_id(), Some("abc"));
    assert!(h.coordinator.intent().is_playing());
    assert_eq!(h.loads().len(), 1);

    let events = h.drain();
    assert!(events.iter().any(|e| matches!(
        e,
        CoreEvent::Playback(PlaybackEvent::Error {
            code: Some(150),
            recoverable: false,
            ..
        })
    )));
}

#[tokio::test]
async fn failing_commands_do_not_corrupt_intent() {
    let mut h = Harness::new().await.ready().await;
    h.player().fail_commands(true);

    h.coordinator.play_request("abc", Some(0.5), None).await;
    h.coordinator.volume_update_request(Some(0.9)).await;

    let intent = h.coordinator.intent();
    assert_eq!(intent.track_id(), Some("abc"));
    assert!(intent.is_playing());
    assert_eq!(intent.volume_percent(), 90);

    h.player().fail_commands(false);
    h.coordinator.on_tick().await;
    assert_eq!(h.player().last_volume(), Some(90));
}

#[tokio::test]
async fn playing_always_names_a_track() {
    let mut h = Harness::new().await;

    h.coordinator.play_request("abc", Some(0.5), None).await;
    h.assert_intent_consistent();
    h.coordinator.stop_request().await;
    h.assert_intent_consistent();
    h.coordinator.handle_player_event(PlayerEvent::Ready).await;
    h.assert_intent_consistent();
    h.coordinator.play_request("def", Some(0.5), Some(3.0)).await;
    h.assert_intent_consistent();
    h.coordinator
        .handle_player_event(PlayerEvent::StateChange(PlayerState::Ended))
        .await;
    h.assert_intent_consistent();
    h.coordinator
        .handle_player_event(PlayerEvent::Error(PlayerErrorCode::from_code(100)))
        .await;
    h.assert_intent_consistent();
    h.coordinator.volume_update_request(Some(0.1)).await;
    h.coordinator.stop_request().await;
    h.assert_intent_consistent();
    h.coordinator.play_request("", Some(0.5), None).await;
    h.assert_intent_consistent();
}

// ============================================================================
// Effects
// ============================================================================

#[tokio::test]
async fn effect_gain_is_clamped() {
    let mut h = Harness::with_http(
        StaticHttpClient::new().with_body("sfx/weaponjam/jam1.wav", Bytes::from_static(b"\x10")),
    )
    .await;

    h.coordinator
        .effect_request("jam1.wav".to_string(), 1.4)
        .await
        .unwrap();

    assert_eq!(h.audio.gains(), vec![1.0]);
    assert!(h.drain().contains(&CoreEvent::Effect(EffectEvent::Played {
        sound: "jam1.wav".to_string(),
        gain: 1.0,
    })));
}

#[tokio::test]
async fn overlapping_effects_play_independently() {
    let h = Harness::with_http(
        StaticHttpClient::new().with_body("sfx/weaponjam/jam1.wav", Bytes::from_static(b"\x10")),
    )
    .await;

    let first = h.coordinator.effect_request("jam1.wav".to_string(), 0.3);
    let second = h.coordinator.effect_request("jam1.wav".to_string(), 0.6);
    first.await.unwrap();
    second.await.unwrap();

    let mut gains = h.audio.gains();
    gains.sort_by(|a, b| a.total_cmp(b));
    assert_eq!(gains, vec![0.3, 0.6]);
    assert_eq!(h.http.request_count("sfx/weaponjam/jam1.wav"), 1);
}

#[tokio::test]
async fn effect_resumes_suspended_context() {
    let h = Harness::with_http(
        StaticHttpClient::new().with_body("sfx/weaponjam/jam1.wav", Bytes::from_static(b"\x10")),
    )
    .await;

    h.coordinator
        .effect_request("jam1.wav".to_string(), 0.5)
        .await
        .unwrap();

    assert_eq!(h.audio.resume_calls(), 1);
}

#[tokio::test]
async fn missing_effect_plays_nothing() {
    let mut h = Harness::new().await;

    h.coordinator
        .effect_request("missing.wav".to_string(), 0.5)
        .await
        .unwrap();

    assert!(h.audio.voices().is_empty());
    assert!(h.drain().iter().any(|e| matches!(
        e,
        CoreEvent::Effect(EffectEvent::Failed { sound, .. }) if sound == "missing.wav"
    )));
}

#[tokio::test]
async fn preload_reports_each_key() {
    let mut h = Harness::with_http(
        StaticHttpClient::new()
            .with_status("sfx/weaponjam/a.wav", 404)
            .with_body("sfx/weaponjam/b.wav", Bytes::from_static(b"\x20")),
    )
    .await;

    let report = h
        .coordinator
        .preload_request(vec!["a.wav".to_string(), "b.wav".to_string()])
        .await
        .unwrap();

    assert_eq!(report.loaded, vec!["b.wav".to_string()]);
    assert!(h.coordinator.cache().contains("b.wav"));

    let events = h.drain();
    assert!(events.contains(&CoreEvent::Effect(EffectEvent::Preloaded {
        sound: "b.wav".to_string()
    })));
    assert!(events.iter().any(|e| matches!(
        e,
        CoreEvent::Effect(EffectEvent::Failed { sound, .. }) if sound == "a.wav"
    )));
}

#[tokio::test]
async fn effects_do_not_touch_music_intent() {
    let h = Harness::with_http(
        StaticHttpClient::new().with_body("sfx/weaponjam/jam1.wav", Bytes::from_static(b"\x10")),
    )
    .await
    .ready()
    .await;
    let before = h.coordinator.intent().clone();

    h.coordinator
        .effect_request("jam1.wav".to_string(), 0.5)
        .await
        .unwrap();

    assert_eq!(h.coordinator.intent(), &before);
    assert!(h.player().commands().is_empty());
}
