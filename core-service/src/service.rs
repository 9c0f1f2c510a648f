//! The overlay event loop.
//!
//! A single task owns the [`PlaybackCoordinator`] and multiplexes three
//! sources: host messages, player callbacks and the reconciliation ticker.
//! Messages are handled strictly in arrival order. Effects and preloads are
//! handed off to detached tasks so a slow fetch never holds up the loop.

use crate::error::{CoreError, Result};
use crate::message::InboundMessage;
use bridge_traits::{PlayerEvent, ZoneBanner, ZoneDisplay};
use core_async::sync::mpsc;
use core_async::task::JoinHandle;
use core_async::time::ticker;
use core_async::Duration;
use core_playback::PlaybackCoordinator;
use core_runtime::events::{CoreEvent, DisplayEvent, Receiver};
use core_runtime::{EventBus, OverlayConfig};
use std::sync::Arc;
use tracing::{debug, info, warn};

enum ServiceCommand {
    Message(InboundMessage),
    Shutdown,
}

/// Cloneable sender for host messages.
#[derive(Clone)]
pub struct MessageSender {
    tx: mpsc::UnboundedSender<ServiceCommand>,
}

impl MessageSender {
    pub fn send(&self, message: InboundMessage) -> Result<()> {
        self.tx
            .send(ServiceCommand::Message(message))
            .map_err(|_| CoreError::ServiceStopped)
    }

    /// Parse and enqueue a raw host message. Malformed input is returned to
    /// the caller and never reaches the loop.
    pub fn send_json(&self, text: &str) -> Result<()> {
        let message = InboundMessage::from_json(text)?;
        self.send(message)
    }
}

/// Handle to a running [`OverlayService`].
pub struct OverlayHandle {
    sender: MessageSender,
    events: EventBus,
    task: JoinHandle<()>,
}

impl OverlayHandle {
    pub fn send(&self, message: InboundMessage) -> Result<()> {
        self.sender.send(message)
    }

    pub fn send_json(&self, text: &str) -> Result<()> {
        self.sender.send_json(text)
    }

    pub fn sender(&self) -> MessageSender {
        self.sender.clone()
    }

    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.events.subscribe()
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Stop the loop after the messages already queued and wait for it to
    /// exit.
    pub async fn shutdown(self) -> Result<()> {
        self.sender.tx.send(ServiceCommand::Shutdown).ok();
        self.task
            .await
            .map_err(|e| CoreError::TaskFailed(e.to_string()))
    }
}

pub struct OverlayService {
    coordinator: PlaybackCoordinator,
    zone_display: Option<Arc<dyn ZoneDisplay>>,
    events: EventBus,
    tick_interval: Duration,
}

impl OverlayService {
    /// Construct the music player and spawn the loop. Must be called from
    /// within a Tokio runtime.
    pub async fn start(config: OverlayConfig) -> Result<OverlayHandle> {
        let events = EventBus::new(config.event_bus_capacity);
        let mut coordinator = PlaybackCoordinator::new(&config, events.clone());

        let (player_tx, player_rx) = mpsc::unbounded_channel();
        coordinator
            .attach_player(
                config.video_player_host.as_ref(),
                config.player.clone(),
                player_tx,
            )
            .await?;

        let service = OverlayService {
            coordinator,
            zone_display: config.zone_display.clone(),
            events: events.clone(),
            tick_interval: config.volume_tick_interval,
        };

        let (tx, rx) = mpsc::unbounded_channel();
        let task = core_async::spawn(service.run(rx, player_rx));

        info!(
            effects = %config.effects_base_url,
            quality = %config.default_quality,
            "Overlay service started"
        );

        Ok(OverlayHandle {
            sender: MessageSender { tx },
            events,
            task,
        })
    }

    async fn run(
        mut self,
        mut inbox: mpsc::UnboundedReceiver<ServiceCommand>,
        mut player_events: mpsc::UnboundedReceiver<PlayerEvent>,
    ) {
        let mut tick = ticker(self.tick_interval);
        loop {
            core_async::select! {
                biased;
                command = inbox.recv() => match command {
                    Some(ServiceCommand::Message(message)) => self.dispatch(message).await,
                    Some(ServiceCommand::Shutdown) | None => break,
                },
                Some(event) = player_events.recv() => {
                    self.coordinator.handle_player_event(event).await;
                }
                _ = tick.tick() => self.coordinator.on_tick().await,
            }
        }
        info!("Overlay service stopped");
    }

    async fn dispatch(&mut self, message: InboundMessage) {
        debug!(kind = message.kind(), "Handling message");
        match message {
            InboundMessage::Init { quality } => self.coordinator.init(quality),
            InboundMessage::Play {
                youtube_id: Some(track_id),
                volume,
                start_seconds,
            } => {
                self.coordinator
                    .play_request(&track_id, volume, start_seconds)
                    .await
            }
            InboundMessage::Play { youtube_id: None, .. } => {
                warn!("Ignoring play message without youtubeId")
            }
            InboundMessage::Stop => self.coordinator.stop_request().await,
            InboundMessage::UpdateVolume { volume } => {
                self.coordinator.volume_update_request(volume).await
            }
            InboundMessage::PlayJamSound {
                sound: Some(sound),
                volume: Some(volume),
            } => {
                self.coordinator.effect_request(sound, volume);
            }
            InboundMessage::PlayJamSound { .. } => {
                debug!("Ignoring playJamSound without sound and volume")
            }
            InboundMessage::PreloadJamSounds {
                sounds: Some(sounds),
            } => {
                self.coordinator.preload_request(sounds);
            }
            InboundMessage::PreloadJamSounds { sounds: None } => {
                debug!("Ignoring preloadJamSounds without a sound list")
            }
            InboundMessage::UpdateAop {
                visible,
                zone_name,
                player_count,
            } => self.update_zone(visible, zone_name, player_count).await,
            InboundMessage::Unknown => debug!("Ignoring unknown message type"),
        }
    }

    async fn update_zone(
        &self,
        visible: bool,
        zone_name: Option<String>,
        player_count: Option<u32>,
    ) {
        let Some(display) = &self.zone_display else {
            debug!("No zone display configured, ignoring updateAOP");
            return;
        };

        match zone_name.filter(|name| visible && !name.is_empty()) {
            Some(zone_name) => {
                let banner = ZoneBanner::new(zone_name, player_count);
                match display.show_zone(&banner).await {
                    Ok(()) => self.emit(DisplayEvent::ZoneShown {
                        zone_name: banner.zone_name,
                        player_count: banner.player_count,
                    }),
                    Err(e) => warn!(error = %e, "Showing zone banner failed"),
                }
            }
            None => match display.hide().await {
                Ok(()) => self.emit(DisplayEvent::ZoneHidden),
                Err(e) => warn!(error = %e, "Hiding zone banner failed"),
            },
        }
    }

    fn emit(&self, event: DisplayEvent) {
        self.events.emit(CoreEvent::Display(event)).ok();
    }
}
