//! Audio output bridge.
//!
//! Models the small slice of a low-level audio API the effect player needs:
//! a shared output context that may start out suspended (platform autoplay
//! policies), a decoder that turns fetched bytes into a reusable buffer, and
//! one-shot voices routed `source -> gain -> destination`.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::error::Result;

/// Lifecycle state of the shared output context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioContextState {
    /// Created but not producing sound, typically until a user gesture.
    Suspended,
    Running,
    Closed,
}

/// Decoded PCM audio ready to be played any number of times.
///
/// Samples are interleaved `f32` in `[-1.0, 1.0]`, already at the output
/// context's sample rate.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    samples: Vec<f32>,
    sample_rate: u32,
    channels: u16,
}

impl DecodedAudio {
    pub fn new(samples: Vec<f32>, sample_rate: u32, channels: u16) -> Self {
        Self {
            samples,
            sample_rate,
            channels: channels.max(1),
        }
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Number of frames (one sample per channel).
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.frames() as f64 / self.sample_rate as f64)
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// A single fire-and-forget playback: a buffer source feeding a gain stage
/// connected to the context destination.
#[derive(Debug, Clone)]
pub struct OneShotVoice {
    pub buffer: Arc<DecodedAudio>,
    /// Linear gain, expected within `[0.0, 1.0]`.
    pub gain: f32,
}

/// The shared audio output context.
#[async_trait]
pub trait AudioOutput: Send + Sync {
    /// Current context state.
    fn state(&self) -> AudioContextState;

    /// Resume a suspended context. Resolves once the context is running.
    async fn resume(&self) -> Result<()>;

    /// Decode an encoded audio file (wav, ogg, mp3, ...) into a playable
    /// buffer.
    async fn decode_audio_data(&self, data: Bytes) -> Result<DecodedAudio>;

    /// Wire up and start a voice immediately. The voice cannot be stopped;
    /// it ends when the buffer is exhausted.
    fn start_voice(&self, voice: OneShotVoice) -> Result<()>;
}

/// Creates the output context. Called at most once per process.
pub trait AudioOutputFactory: Send + Sync {
    fn create_context(&self) -> Result<Arc<dyn AudioOutput>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decoded_audio_frame_math() {
        let audio = DecodedAudio::new(vec![0.0; 48_000 * 2], 48_000, 2);
        assert_eq!(audio.frames(), 48_000);
        assert_eq!(audio.duration(), Duration::from_secs(1));
        assert!(!audio.is_empty());
    }

    #[test]
    fn decoded_audio_never_has_zero_channels() {
        let audio = DecodedAudio::new(vec![0.5; 4], 8_000, 0);
        assert_eq!(audio.channels(), 1);
        assert_eq!(audio.frames(), 4);
    }

    #[test]
    fn zero_sample_rate_has_zero_duration() {
        let audio = DecodedAudio::new(vec![0.5; 4], 0, 1);
        assert_eq!(audio.duration(), Duration::ZERO);
    }
}
