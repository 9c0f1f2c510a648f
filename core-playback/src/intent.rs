//! Persistent playback intent.
//!
//! What the caller wants to hear, independent of whether the music backend
//! has caught up. Mutated only by the coordinator. Every mutator keeps
//! `is_playing` implying a track is set.

use bridge_traits::PlaybackQuality;

/// Clamp a requested volume into `[0.0, 1.0]`. NaN maps to silence.
pub fn clamp_volume(volume: f64) -> f64 {
    if volume.is_nan() {
        0.0
    } else {
        volume.clamp(0.0, 1.0)
    }
}

/// Integer percentage pushed to the music backend.
pub fn volume_percent(volume: f64) -> u8 {
    (clamp_volume(volume) * 100.0).round() as u8
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackIntent {
    track_id: Option<String>,
    is_playing: bool,
    target_volume: f64,
    preferred_quality: PlaybackQuality,
    deferred_start_seconds: Option<f64>,
}

impl PlaybackIntent {
    pub fn new(preferred_quality: PlaybackQuality) -> Self {
        Self {
            track_id: None,
            is_playing: false,
            target_volume: 0.0,
            preferred_quality,
            deferred_start_seconds: None,
        }
    }

    pub fn track_id(&self) -> Option<&str> {
        self.track_id.as_deref()
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    pub fn target_volume(&self) -> f64 {
        self.target_volume
    }

    pub fn volume_percent(&self) -> u8 {
        volume_percent(self.target_volume)
    }

    pub fn preferred_quality(&self) -> &PlaybackQuality {
        &self.preferred_quality
    }

    pub fn deferred_start_seconds(&self) -> Option<f64> {
        self.deferred_start_seconds
    }

    /// Whether `track_id` is the track the intent currently names.
    pub fn is_current(&self, track_id: &str) -> bool {
        self.track_id.as_deref() == Some(track_id)
    }

    /// Want `track_id` playing at `volume`. A start offset is remembered
    /// until the readiness replay consumes it.
    pub fn start(&mut self, track_id: impl Into<String>, volume: f64, start_seconds: Option<f64>) {
        self.track_id = Some(track_id.into());
        self.is_playing = true;
        self.target_volume = clamp_volume(volume);
        self.deferred_start_seconds = start_seconds.filter(|s| s.is_finite() && *s >= 0.0);
    }

    /// Mark the current track as playing again. No-op without a track.
    pub fn resume(&mut self) -> bool {
        if self.track_id.is_some() {
            self.is_playing = true;
        }
        self.is_playing
    }

    pub fn set_target_volume(&mut self, volume: f64) {
        self.target_volume = clamp_volume(volume);
    }

    pub fn set_preferred_quality(&mut self, quality: PlaybackQuality) {
        self.preferred_quality = quality;
    }

    /// Forget the track and silence. The preferred quality survives.
    pub fn reset(&mut self) {
        self.track_id = None;
        self.is_playing = false;
        self.target_volume = 0.0;
        self.deferred_start_seconds = None;
    }

    pub fn take_deferred_start(&mut self) -> Option<f64> {
        self.deferred_start_seconds.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_silent_and_idle() {
        let intent = PlaybackIntent::new(PlaybackQuality::Small);
        assert!(!intent.is_playing());
        assert_eq!(intent.track_id(), None);
        assert_eq!(intent.volume_percent(), 0);
    }

    #[test]
    fn volume_is_clamped() {
        assert_eq!(volume_percent(-0.3), 0);
        assert_eq!(volume_percent(1.7), 100);
        assert_eq!(volume_percent(f64::NAN), 0);
        assert_eq!(volume_percent(0.555), 56);
        assert_eq!(volume_percent(0.3), 30);
    }

    #[test]
    fn resume_without_track_stays_idle() {
        let mut intent = PlaybackIntent::new(PlaybackQuality::Small);
        assert!(!intent.resume());
        assert!(!intent.is_playing());
    }

    #[test]
    fn reset_keeps_quality() {
        let mut intent = PlaybackIntent::new(PlaybackQuality::Hd720);
        intent.start("abc", 0.8, Some(12.0));
        intent.reset();
        assert_eq!(intent.track_id(), None);
        assert_eq!(intent.target_volume(), 0.0);
        assert_eq!(intent.deferred_start_seconds(), None);
        assert_eq!(intent.preferred_quality(), &PlaybackQuality::Hd720);
    }

    #[test]
    fn deferred_start_is_taken_once() {
        let mut intent = PlaybackIntent::new(PlaybackQuality::Small);
        intent.start("abc", 0.5, Some(30.0));
        assert_eq!(intent.take_deferred_start(), Some(30.0));
        assert_eq!(intent.take_deferred_start(), None);
    }

    #[test]
    fn negative_start_offsets_are_dropped() {
        let mut intent = PlaybackIntent::new(PlaybackQuality::Small);
        intent.start("abc", 0.5, Some(-4.0));
        assert_eq!(intent.deferred_start_seconds(), None);
    }

    #[test]
    fn playing_always_names_a_track() {
        let mut intent = PlaybackIntent::new(PlaybackQuality::Small);
        let steps: [fn(&mut PlaybackIntent); 5] = [
            |i| i.start("abc", 0.5, None),
            |i| i.reset(),
            |i| {
                i.resume();
            },
            |i| i.set_target_volume(2.0),
            |i| i.start("def", -1.0, Some(3.0)),
        ];
        for step in steps.iter().cycle().take(20) {
            step(&mut intent);
            assert!(!intent.is_playing() || intent.track_id().is_some());
        }
    }
}
