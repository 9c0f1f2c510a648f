//! Lazily created shared audio output context.

use crate::error::{PlaybackError, Result};
use bridge_traits::{AudioContextState, AudioOutput, AudioOutputFactory};
use core_async::sync::OnceCell;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Process-wide audio output. Created on first use; a failed creation leaves
/// the handle empty so the next caller tries again.
pub struct AudioContextHandle {
    factory: Arc<dyn AudioOutputFactory>,
    output: OnceCell<Arc<dyn AudioOutput>>,
}

impl AudioContextHandle {
    pub fn new(factory: Arc<dyn AudioOutputFactory>) -> Self {
        Self {
            factory,
            output: OnceCell::new(),
        }
    }

    /// Returns the context, creating it if needed and resuming it when the
    /// platform left it suspended. Resume failures are logged and the
    /// context is returned anyway.
    pub async fn get(&self) -> Result<Arc<dyn AudioOutput>> {
        let output = self
            .output
            .get_or_try_init(|| async {
                let output = self
                    .factory
                    .create_context()
                    .map_err(|e| PlaybackError::AudioContext(e.to_string()))?;
                info!("Audio output context created");
                Ok::<_, PlaybackError>(output)
            })
            .await?
            .clone();

        if output.state() == AudioContextState::Suspended {
            debug!("Resuming suspended audio context");
            if let Err(e) = output.resume().await {
                warn!(error = %e, "Audio context resume failed");
            }
        }

        Ok(output)
    }

    /// The context, if it has been created.
    pub fn current(&self) -> Option<Arc<dyn AudioOutput>> {
        self.output.get().cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::mock::{RecordingAudioOutput, RecordingAudioOutputFactory};
    use bridge_traits::BridgeError;

    struct FailingFactory;

    impl AudioOutputFactory for FailingFactory {
        fn create_context(&self) -> bridge_traits::error::Result<Arc<dyn AudioOutput>> {
            Err(BridgeError::NotAvailable("no device".to_string()))
        }
    }

    #[tokio::test]
    async fn creates_once_and_resumes() {
        let output = Arc::new(RecordingAudioOutput::new());
        let factory = Arc::new(RecordingAudioOutputFactory::new(output.clone()));
        let handle = AudioContextHandle::new(factory.clone());

        assert!(handle.current().is_none());
        handle.get().await.unwrap();
        handle.get().await.unwrap();

        assert_eq!(factory.created(), 1);
        assert_eq!(output.resume_calls(), 1);
        assert_eq!(output.state(), AudioContextState::Running);
    }

    #[tokio::test]
    async fn resume_failure_is_not_fatal() {
        let output = Arc::new(RecordingAudioOutput::new());
        output.fail_resume(true);
        let handle = AudioContextHandle::new(Arc::new(RecordingAudioOutputFactory::new(
            output.clone(),
        )));

        assert!(handle.get().await.is_ok());
        assert!(handle.get().await.is_ok());
        assert_eq!(output.resume_calls(), 2);
    }

    #[tokio::test]
    async fn creation_failure_is_reported() {
        let handle = AudioContextHandle::new(Arc::new(FailingFactory));
        let err = handle.get().await.err().unwrap();
        assert!(matches!(err, PlaybackError::AudioContext(_)));
        assert!(handle.current().is_none());
    }
}
