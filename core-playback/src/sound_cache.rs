//! # Sound Buffer Cache
//!
//! Fetches, decodes and keeps sound effect buffers for the lifetime of the
//! process.
//!
//! ## Overview
//!
//! `ensure(key)` runs a three stage pipeline: fetch `<base>/<key>`, decode
//! through the shared audio context, store. Each stage short-circuits on
//! error and nothing is stored on failure, so the next call starts over.
//!
//! Every key owns a once-cell. Concurrent cold calls for the same key wait
//! on one fetch instead of each issuing their own. Entries are never
//! evicted.

use crate::audio_context::AudioContextHandle;
use crate::error::{PlaybackError, Result};
use bridge_traits::{DecodedAudio, HttpClient};
use core_async::sync::OnceCell;
use futures::future::join_all;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

type Slot = Arc<OnceCell<Arc<DecodedAudio>>>;

/// Outcome of a bulk preload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreloadReport {
    pub loaded: Vec<String>,
    pub failed: Vec<PreloadFailure>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreloadFailure {
    pub key: String,
    pub error: String,
}

impl PreloadReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

pub struct SoundBufferCache {
    http: Arc<dyn HttpClient>,
    audio: Arc<AudioContextHandle>,
    base_url: String,
    entries: Mutex<HashMap<String, Slot>>,
}

impl SoundBufferCache {
    pub fn new(
        http: Arc<dyn HttpClient>,
        audio: Arc<AudioContextHandle>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            http,
            audio,
            base_url: base_url.into(),
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Resource address for `key`.
    pub fn url_for(&self, key: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            key.trim_start_matches('/')
        )
    }

    /// Returns the decoded buffer for `key`, fetching and decoding it on
    /// first use.
    #[instrument(skip(self), fields(url))]
    pub async fn ensure(&self, key: &str) -> Result<Arc<DecodedAudio>> {
        if key.is_empty() {
            return Err(PlaybackError::InvalidInput(
                "sound key must not be empty".to_string(),
            ));
        }

        let slot = self.slot(key);
        if let Some(buffer) = slot.get() {
            return Ok(Arc::clone(buffer));
        }

        let url = self.url_for(key);
        tracing::Span::current().record("url", url.as_str());

        let buffer = slot
            .get_or_try_init(|| self.load(url))
            .await?;
        Ok(Arc::clone(buffer))
    }

    /// The cached buffer for `key`, without loading.
    pub fn get(&self, key: &str) -> Option<Arc<DecodedAudio>> {
        self.entries
            .lock()
            .get(key)
            .and_then(|slot| slot.get().cloned())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Number of decoded buffers held.
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .values()
            .filter(|slot| slot.initialized())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ensure every key concurrently. Failures are logged per key and
    /// collected in the report; they never abort the other keys.
    pub async fn preload_all<I, S>(&self, keys: I) -> PreloadReport
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = HashSet::new();
        let keys: Vec<String> = keys
            .into_iter()
            .map(Into::into)
            .filter(|key| seen.insert(key.clone()))
            .collect();

        let results = join_all(keys.iter().map(|key| self.ensure(key))).await;

        let mut report = PreloadReport::default();
        for (key, result) in keys.into_iter().zip(results) {
            match result {
                Ok(_) => report.loaded.push(key),
                Err(e) => {
                    warn!(sound = %key, error = %e, "Preload failed");
                    report.failed.push(PreloadFailure {
                        key,
                        error: e.to_string(),
                    });
                }
            }
        }
        debug!(
            loaded = report.loaded.len(),
            failed = report.failed.len(),
            "Preload finished"
        );
        report
    }

    fn slot(&self, key: &str) -> Slot {
        let mut entries = self.entries.lock();
        Arc::clone(entries.entry(key.to_string()).or_default())
    }

    async fn load(&self, url: String) -> Result<Arc<DecodedAudio>> {
        debug!(url = %url, "Fetching sound");
        let bytes = self
            .http
            .fetch_bytes(&url)
            .await
            .map_err(|e| PlaybackError::from_fetch(&url, e))?;

        let output = self.audio.get().await?;
        let decoded = output
            .decode_audio_data(bytes)
            .await
            .map_err(|e| PlaybackError::Decode(format!("{url}: {e}")))?;

        debug!(
            url = %url,
            frames = decoded.frames(),
            sample_rate = decoded.sample_rate(),
            "Sound decoded"
        );
        Ok(Arc::new(decoded))
    }
}
