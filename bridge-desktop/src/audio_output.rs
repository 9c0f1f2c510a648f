//! Desktop audio output: symphonia decoding and a small voice mixer.
//!
//! The output device is owned by a dedicated thread (cpal streams are not
//! `Send` on every platform). The async side talks to it through a
//! crossbeam command channel and shares the [`Mixer`] with the real-time
//! callback behind a `parking_lot` mutex.
//!
//! Like a browser audio context the output starts suspended: the stream is
//! built but paused until [`AudioOutput::resume`] is called.

use async_trait::async_trait;
use bridge_traits::audio::{
    AudioContextState, AudioOutput, AudioOutputFactory, DecodedAudio, OneShotVoice,
};
use bridge_traits::error::{BridgeError, Result};
use bytes::Bytes;
use parking_lot::Mutex;
use rubato::{
    calculate_cutoff, Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType,
    WindowFunction,
};
use std::io::{Cursor, ErrorKind};
use std::sync::Arc;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::{MediaSource, MediaSourceStream};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, info, warn};

#[cfg(not(feature = "device-output"))]
const NULL_SAMPLE_RATE: u32 = 48_000;
#[cfg(not(feature = "device-output"))]
const NULL_CHANNELS: u16 = 2;

// ============================================================================
// Mixer
// ============================================================================

struct ActiveVoice {
    buffer: Arc<DecodedAudio>,
    frame: usize,
    gain: f32,
}

impl ActiveVoice {
    fn finished(&self) -> bool {
        self.frame >= self.buffer.frames()
    }

    /// Sample for output channel `dst_ch` of the current frame, with
    /// mono/stereo mapping.
    fn sample(&self, dst_ch: usize, dst_channels: usize) -> f32 {
        let src_channels = self.buffer.channels() as usize;
        let base = self.frame * src_channels;
        let samples = self.buffer.samples();
        let get = |ch: usize| samples.get(base + ch).copied().unwrap_or(0.0);

        match (src_channels, dst_channels) {
            (1, _) => get(0),
            (2, 1) => 0.5 * (get(0) + get(1)),
            _ => get(dst_ch.min(src_channels - 1)),
        }
    }
}

/// Sums every active voice into the device buffer.
#[derive(Default)]
pub(crate) struct Mixer {
    voices: Vec<ActiveVoice>,
}

impl Mixer {
    pub(crate) fn add(&mut self, voice: OneShotVoice) {
        if voice.buffer.is_empty() {
            return;
        }
        self.voices.push(ActiveVoice {
            buffer: voice.buffer,
            frame: 0,
            gain: voice.gain.clamp(0.0, 1.0),
        });
    }

    pub(crate) fn active(&self) -> usize {
        self.voices.len()
    }

    /// Fill `out` (interleaved, `channels` wide) and drop voices that ran out.
    pub(crate) fn render(&mut self, out: &mut [f32], channels: usize) {
        out.fill(0.0);
        let channels = channels.max(1);

        for voice in &mut self.voices {
            for frame in out.chunks_mut(channels) {
                if voice.finished() {
                    break;
                }
                for (ch, slot) in frame.iter_mut().enumerate() {
                    *slot += voice.sample(ch, channels) * voice.gain;
                }
                voice.frame += 1;
            }
        }

        for sample in out.iter_mut() {
            *sample = sample.clamp(-1.0, 1.0);
        }
        self.voices.retain(|voice| !voice.finished());
    }
}

// ============================================================================
// Decoding
// ============================================================================

/// Frames fed to the sinc resampler per call.
const RESAMPLE_CHUNK_FRAMES: usize = 1024;

fn sinc_parameters() -> SincInterpolationParameters {
    let sinc_len = 128;
    let window = WindowFunction::BlackmanHarris2;
    SincInterpolationParameters {
        sinc_len,
        f_cutoff: calculate_cutoff(sinc_len, window),
        interpolation: SincInterpolationType::Cubic,
        oversampling_factor: 256,
        window,
    }
}

/// Band-limited conversion of interleaved frames from `from` Hz to `to` Hz.
///
/// The output is trimmed of the filter delay so it lines up with the input
/// and holds `frames * to / from` frames.
pub(crate) fn resample(samples: &[f32], channels: u16, from: u32, to: u32) -> Result<Vec<f32>> {
    let channels = channels.max(1) as usize;
    let frames = samples.len() / channels;
    if from == to || from == 0 || to == 0 || frames == 0 {
        return Ok(samples.to_vec());
    }

    let mut resampler = SincFixedIn::<f32>::new(
        to as f64 / from as f64,
        1.0,
        sinc_parameters(),
        RESAMPLE_CHUNK_FRAMES,
        channels,
    )
    .map_err(|e| BridgeError::Decode(format!("Failed to create resampler: {e}")))?;
    let resample_error =
        |e: rubato::ResampleError| BridgeError::Decode(format!("Resampling failed: {e}"));

    let planar = deinterleave(&samples[..frames * channels], channels);
    let mut output: Vec<Vec<f32>> = vec![Vec::new(); channels];

    let mut pos = 0;
    while frames - pos >= resampler.input_frames_next() {
        let next = resampler.input_frames_next();
        let chunk: Vec<&[f32]> = planar.iter().map(|ch| &ch[pos..pos + next]).collect();
        let produced = resampler.process(chunk.as_slice(), None).map_err(resample_error)?;
        append_planar(&mut output, produced);
        pos += next;
    }
    if pos < frames {
        let tail: Vec<&[f32]> = planar.iter().map(|ch| &ch[pos..]).collect();
        let produced = resampler
            .process_partial(Some(tail.as_slice()), None)
            .map_err(resample_error)?;
        append_planar(&mut output, produced);
    }

    let delay = resampler.output_delay();
    let wanted = ((frames as u64 * to as u64) / from as u64).max(1) as usize;
    while output[0].len() < delay + wanted {
        let produced = resampler
            .process_partial(None::<&[Vec<f32>]>, None)
            .map_err(resample_error)?;
        if produced.first().map_or(true, Vec::is_empty) {
            break;
        }
        append_planar(&mut output, produced);
    }

    let end = (delay + wanted).min(output[0].len());
    let start = delay.min(end);
    let mut out = Vec::with_capacity((end - start) * channels);
    for frame in start..end {
        for ch in &output {
            out.push(ch[frame]);
        }
    }
    Ok(out)
}

fn deinterleave(samples: &[f32], channels: usize) -> Vec<Vec<f32>> {
    let mut planar = vec![Vec::with_capacity(samples.len() / channels); channels];
    for frame in samples.chunks_exact(channels) {
        for (ch, sample) in frame.iter().enumerate() {
            planar[ch].push(*sample);
        }
    }
    planar
}

fn append_planar(output: &mut [Vec<f32>], produced: Vec<Vec<f32>>) {
    for (out, ch) in output.iter_mut().zip(produced) {
        out.extend(ch);
    }
}

/// Decode a complete encoded file and convert it to `target_rate`.
pub(crate) fn decode_to_rate(data: Bytes, target_rate: u32) -> Result<DecodedAudio> {
    let source = Box::new(Cursor::new(data.to_vec())) as Box<dyn MediaSource>;
    let mss = MediaSourceStream::new(source, Default::default());

    let probed = symphonia::default::get_probe()
        .format(
            &Hint::new(),
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| BridgeError::Decode(format!("Failed to probe format: {e}")))?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| BridgeError::Decode("No supported audio tracks".to_string()))?;
    let track_id = track.id;
    let mut sample_rate = track.codec_params.sample_rate;
    let mut channels = track.codec_params.channels.map(|c| c.count() as u16);

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| BridgeError::Decode(format!("Failed to create codec decoder: {e}")))?;

    let mut samples = Vec::new();
    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == ErrorKind::UnexpectedEof => break,
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(BridgeError::Decode(format!("Failed to read packet: {e}"))),
        };
        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                sample_rate.get_or_insert(spec.rate);
                channels = Some(spec.channels.count() as u16);

                let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                buffer.copy_interleaved_ref(decoded);
                samples.extend_from_slice(buffer.samples());
            }
            Err(SymphoniaError::DecodeError(e)) => {
                warn!(error = %e, "Skipping undecodable packet");
            }
            Err(e) => return Err(BridgeError::Decode(format!("Failed to decode packet: {e}"))),
        }
    }

    if samples.is_empty() {
        return Err(BridgeError::Decode("File contains no audio".to_string()));
    }
    let source_rate =
        sample_rate.ok_or_else(|| BridgeError::Decode("Missing sample rate".to_string()))?;
    let channels = channels.unwrap_or(1);

    let samples = resample(&samples, channels, source_rate, target_rate)?;
    Ok(DecodedAudio::new(samples, target_rate, channels))
}

// ============================================================================
// Device thread
// ============================================================================

#[cfg(feature = "device-output")]
enum DeviceCommand {
    Resume(core_async::sync::oneshot::Sender<std::result::Result<(), String>>),
    Shutdown,
}

#[cfg(feature = "device-output")]
mod device {
    use super::{DeviceCommand, Mixer};
    use bridge_traits::error::{BridgeError, Result};
    use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
    use parking_lot::Mutex;
    use std::sync::Arc;
    use tracing::{debug, error};

    pub(super) struct DeviceHandle {
        pub(super) commands: crossbeam_channel::Sender<DeviceCommand>,
        pub(super) sample_rate: u32,
        pub(super) channels: u16,
    }

    /// Open the default output device on its own thread. The stream is left
    /// paused.
    pub(super) fn spawn(mixer: Arc<Mutex<Mixer>>) -> Result<DeviceHandle> {
        let (command_tx, command_rx) = crossbeam_channel::unbounded::<DeviceCommand>();
        let (ready_tx, ready_rx) = crossbeam_channel::bounded(1);

        std::thread::Builder::new()
            .name("overlay-audio-out".to_string())
            .spawn(move || {
                let (stream, sample_rate, channels) = match open_stream(mixer) {
                    Ok(opened) => opened,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                let _ = ready_tx.send(Ok((sample_rate, channels)));

                for command in command_rx.iter() {
                    match command {
                        DeviceCommand::Resume(reply) => {
                            let _ = reply.send(stream.play().map_err(|e| e.to_string()));
                        }
                        DeviceCommand::Shutdown => break,
                    }
                }
                debug!("Audio output thread exiting");
            })?;

        let (sample_rate, channels) = ready_rx
            .recv()
            .map_err(|_| BridgeError::NotAvailable("audio thread exited".to_string()))?
            .map_err(BridgeError::NotAvailable)?;

        Ok(DeviceHandle {
            commands: command_tx,
            sample_rate,
            channels,
        })
    }

    fn open_stream(
        mixer: Arc<Mutex<Mixer>>,
    ) -> std::result::Result<(cpal::Stream, u32, u16), String> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or("No output device available")?;
        let config = device
            .default_output_config()
            .map_err(|e| format!("Failed to get default output config: {e}"))?;

        let sample_rate = config.sample_rate().0;
        let channels = config.channels();

        let stream = match config.sample_format() {
            cpal::SampleFormat::F32 => build_stream::<f32>(&device, &config.into(), mixer)?,
            cpal::SampleFormat::I16 => build_stream::<i16>(&device, &config.into(), mixer)?,
            cpal::SampleFormat::U16 => build_stream::<u16>(&device, &config.into(), mixer)?,
            format => return Err(format!("Unsupported sample format: {format:?}")),
        };

        // Some backends start streams immediately.
        let _ = stream.pause();

        Ok((stream, sample_rate, channels))
    }

    fn build_stream<T: cpal::SizedSample + cpal::FromSample<f32>>(
        device: &cpal::Device,
        config: &cpal::StreamConfig,
        mixer: Arc<Mutex<Mixer>>,
    ) -> std::result::Result<cpal::Stream, String> {
        let channels = config.channels as usize;
        let mut scratch: Vec<f32> = Vec::new();

        device
            .build_output_stream(
                config,
                move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                    scratch.resize(data.len(), 0.0);
                    mixer.lock().render(&mut scratch, channels);
                    for (out, sample) in data.iter_mut().zip(&scratch) {
                        *out = T::from_sample(*sample);
                    }
                },
                move |err| {
                    error!(error = %err, "Audio output stream error");
                },
                None,
            )
            .map_err(|e| format!("Failed to build output stream: {e}"))
    }
}

// ============================================================================
// AudioOutput
// ============================================================================

/// Desktop implementation of the shared audio output context.
pub struct DesktopAudioOutput {
    mixer: Arc<Mutex<Mixer>>,
    state: Mutex<AudioContextState>,
    sample_rate: u32,
    channels: u16,
    #[cfg(feature = "device-output")]
    commands: crossbeam_channel::Sender<DeviceCommand>,
}

impl DesktopAudioOutput {
    /// Open the default output device. The context starts suspended.
    pub fn open() -> Result<Self> {
        let mixer = Arc::new(Mutex::new(Mixer::default()));

        #[cfg(feature = "device-output")]
        {
            let handle = device::spawn(Arc::clone(&mixer))?;
            info!(
                sample_rate = handle.sample_rate,
                channels = handle.channels,
                "Audio output opened"
            );
            Ok(Self {
                mixer,
                state: Mutex::new(AudioContextState::Suspended),
                sample_rate: handle.sample_rate,
                channels: handle.channels,
                commands: handle.commands,
            })
        }

        #[cfg(not(feature = "device-output"))]
        {
            info!("Audio output opened without a device");
            Ok(Self {
                mixer,
                state: Mutex::new(AudioContextState::Suspended),
                sample_rate: NULL_SAMPLE_RATE,
                channels: NULL_CHANNELS,
            })
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Voices still playing.
    pub fn active_voices(&self) -> usize {
        self.mixer.lock().active()
    }

    /// Stop the device. Further resumes and voices fail.
    pub fn close(&self) {
        *self.state.lock() = AudioContextState::Closed;
        #[cfg(feature = "device-output")]
        {
            let _ = self.commands.send(DeviceCommand::Shutdown);
        }
    }

    #[cfg(feature = "device-output")]
    async fn start_device(&self) -> Result<()> {
        let (reply_tx, reply_rx) = core_async::sync::oneshot::channel();
        self.commands
            .send(DeviceCommand::Resume(reply_tx))
            .map_err(|_| BridgeError::NotAvailable("audio thread exited".to_string()))?;
        reply_rx
            .await
            .map_err(|_| BridgeError::NotAvailable("audio thread exited".to_string()))?
            .map_err(BridgeError::OperationFailed)
    }

    #[cfg(not(feature = "device-output"))]
    async fn start_device(&self) -> Result<()> {
        Ok(())
    }
}

impl Drop for DesktopAudioOutput {
    fn drop(&mut self) {
        self.close();
    }
}

#[async_trait]
impl AudioOutput for DesktopAudioOutput {
    fn state(&self) -> AudioContextState {
        *self.state.lock()
    }

    async fn resume(&self) -> Result<()> {
        match self.state() {
            AudioContextState::Running => return Ok(()),
            AudioContextState::Closed => {
                return Err(BridgeError::NotAvailable("audio context closed".to_string()))
            }
            AudioContextState::Suspended => {}
        }

        self.start_device().await?;
        *self.state.lock() = AudioContextState::Running;
        debug!("Audio output resumed");
        Ok(())
    }

    async fn decode_audio_data(&self, data: Bytes) -> Result<DecodedAudio> {
        let target_rate = self.sample_rate;
        core_async::task::spawn_blocking(move || decode_to_rate(data, target_rate))
            .await
            .map_err(|e| BridgeError::OperationFailed(format!("decode task failed: {e}")))?
    }

    fn start_voice(&self, voice: OneShotVoice) -> Result<()> {
        if self.state() == AudioContextState::Closed {
            return Err(BridgeError::NotAvailable("audio context closed".to_string()));
        }
        self.mixer.lock().add(voice);
        Ok(())
    }
}

/// Opens a [`DesktopAudioOutput`] on the default device.
#[derive(Debug, Default, Clone, Copy)]
pub struct DesktopAudioOutputFactory;

impl AudioOutputFactory for DesktopAudioOutputFactory {
    fn create_context(&self) -> Result<Arc<dyn AudioOutput>> {
        let output: Arc<dyn AudioOutput> = Arc::new(DesktopAudioOutput::open()?);
        Ok(output)
    }
}
