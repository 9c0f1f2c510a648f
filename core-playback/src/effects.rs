//! One-shot sound effects.

use crate::audio_context::AudioContextHandle;
use crate::error::{PlaybackError, Result};
use crate::intent::clamp_volume;
use crate::sound_cache::SoundBufferCache;
use bridge_traits::OneShotVoice;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Gain applied to an effect voice: `volume` clamped to `[0, 1]`.
pub fn clamp_gain(volume: f64) -> f32 {
    clamp_volume(volume) as f32
}

/// Plays cached buffers through the shared audio context. Every call starts
/// an independent voice that runs to the end of its buffer.
#[derive(Clone)]
pub struct EffectPlayer {
    cache: Arc<SoundBufferCache>,
    audio: Arc<AudioContextHandle>,
}

impl EffectPlayer {
    pub fn new(cache: Arc<SoundBufferCache>, audio: Arc<AudioContextHandle>) -> Self {
        Self { cache, audio }
    }

    pub fn cache(&self) -> &Arc<SoundBufferCache> {
        &self.cache
    }

    /// Start `key` at `volume`. Returns the gain the voice was started with.
    #[instrument(skip(self))]
    pub async fn play(&self, key: &str, volume: f64) -> Result<f32> {
        let output = self.audio.get().await?;
        let buffer = self.cache.ensure(key).await?;
        let gain = clamp_gain(volume);

        output
            .start_voice(OneShotVoice { buffer, gain })
            .map_err(|e| PlaybackError::AudioContext(e.to_string()))?;

        debug!(sound = %key, gain, "Effect started");
        Ok(gain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gain_is_clamped() {
        assert_eq!(clamp_gain(1.4), 1.0);
        assert_eq!(clamp_gain(-0.2), 0.0);
        assert_eq!(clamp_gain(f64::NAN), 0.0);
        assert_eq!(clamp_gain(0.25), 0.25);
    }
}
