//! Sound buffer cache behaviour against recording bridges.

use bridge_traits::error::Result as BridgeResult;
use bridge_traits::mock::{RecordingAudioOutput, RecordingAudioOutputFactory, StaticHttpClient};
use bridge_traits::{HttpClient, HttpRequest, HttpResponse};
use bytes::Bytes;
use core_playback::{AudioContextHandle, PlaybackError, SoundBufferCache};
use mockall::mock;
use std::sync::Arc;
use std::time::Duration;

mock! {
    pub Http {}

    #[async_trait::async_trait]
    impl HttpClient for Http {
        async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse>;
    }
}

fn audio() -> (Arc<AudioContextHandle>, Arc<RecordingAudioOutput>) {
    let output = Arc::new(RecordingAudioOutput::new());
    let handle = AudioContextHandle::new(Arc::new(RecordingAudioOutputFactory::new(
        output.clone(),
    )));
    (Arc::new(handle), output)
}

fn cache_with(http: Arc<dyn HttpClient>) -> (SoundBufferCache, Arc<RecordingAudioOutput>) {
    let (handle, output) = audio();
    (SoundBufferCache::new(http, handle, "sfx/weaponjam"), output)
}

#[tokio::test]
async fn second_ensure_reuses_the_first_buffer() {
    let mut http = MockHttp::new();
    http.expect_execute()
        .withf(|request| request.url == "sfx/weaponjam/jam1.wav")
        .times(1)
        .returning(|_| Ok(HttpResponse::new(200, Bytes::from_static(b"\x10\x20\x30"))));

    let (cache, output) = cache_with(Arc::new(http));

    let first = cache.ensure("jam1.wav").await.unwrap();
    let second = cache.ensure("jam1.wav").await.unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(output.decode_calls(), 1);
    assert_eq!(cache.len(), 1);
}

#[tokio::test]
async fn failed_fetch_is_not_cached() {
    let http = Arc::new(StaticHttpClient::new().with_status("sfx/weaponjam/jam1.wav", 404));
    let (cache, _output) = cache_with(http.clone());

    let err = cache.ensure("jam1.wav").await.unwrap_err();
    assert!(matches!(err, PlaybackError::FetchStatus { status: 404, .. }));
    assert!(!cache.contains("jam1.wav"));

    http.set_body("sfx/weaponjam/jam1.wav", Bytes::from_static(b"\x01\x02"));
    assert!(cache.ensure("jam1.wav").await.is_ok());
    assert_eq!(http.request_count("sfx/weaponjam/jam1.wav"), 2);
}

#[tokio::test]
async fn transport_failures_are_reported() {
    let http = Arc::new(StaticHttpClient::new().with_transport_error("sfx/weaponjam/jam1.wav"));
    let (cache, _output) = cache_with(http);

    let err = cache.ensure("jam1.wav").await.unwrap_err();
    assert!(err.is_network_error());
    assert!(cache.is_empty());
}

#[tokio::test]
async fn undecodable_audio_is_not_cached() {
    let http = Arc::new(
        StaticHttpClient::new().with_body("sfx/weaponjam/broken.wav", Bytes::from_static(b"BAD!")),
    );
    let (cache, output) = cache_with(http.clone());

    assert!(cache.ensure("broken.wav").await.unwrap_err().is_decode_error());
    assert!(cache.ensure("broken.wav").await.unwrap_err().is_decode_error());
    assert_eq!(http.request_count("sfx/weaponjam/broken.wav"), 2);
    assert_eq!(output.decode_calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn concurrent_cold_ensures_share_one_fetch() {
    let http = Arc::new(
        StaticHttpClient::new()
            .with_body("sfx/weaponjam/jam2.wav", Bytes::from_static(b"\x40"))
            .with_delay(Duration::from_millis(50)),
    );
    let (cache, _output) = cache_with(http.clone());

    let (a, b, c) = tokio::join!(
        cache.ensure("jam2.wav"),
        cache.ensure("jam2.wav"),
        cache.ensure("jam2.wav")
    );

    let a = a.unwrap();
    assert!(Arc::ptr_eq(&a, &b.unwrap()));
    assert!(Arc::ptr_eq(&a, &c.unwrap()));
    assert_eq!(http.request_count("sfx/weaponjam/jam2.wav"), 1);
}

#[tokio::test]
async fn preload_keeps_going_after_a_failure() {
    let http = Arc::new(
        StaticHttpClient::new()
            .with_status("sfx/weaponjam/a.wav", 404)
            .with_body("sfx/weaponjam/b.wav", Bytes::from_static(b"\x7f")),
    );
    let (cache, _output) = cache_with(http);

    let report = cache.preload_all(["a.wav", "b.wav"]).await;

    assert_eq!(report.loaded, vec!["b.wav".to_string()]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].key, "a.wav");
    assert!(!report.is_complete());
    assert!(cache.contains("b.wav"));
    assert!(!cache.contains("a.wav"));
}

#[tokio::test]
async fn preload_skips_duplicate_keys() {
    let http = Arc::new(
        StaticHttpClient::new().with_body("sfx/weaponjam/a.wav", Bytes::from_static(b"\x01")),
    );
    let (cache, _output) = cache_with(http.clone());

    let report = cache.preload_all(vec!["a.wav", "a.wav"]).await;

    assert_eq!(report.loaded.len(), 1);
    assert_eq!(http.request_count("sfx/weaponjam/a.wav"), 1);
}

#[tokio::test]
async fn empty_key_is_rejected_without_fetching() {
    let http = Arc::new(StaticHttpClient::new());
    let (cache, _output) = cache_with(http.clone());

    assert!(matches!(
        cache.ensure("").await,
        Err(PlaybackError::InvalidInput(_))
    ));
    assert!(http.requests().is_empty());
}

#[test]
fn urls_have_a_single_separator() {
    let (handle, _output) = audio();
    let cache = SoundBufferCache::new(Arc::new(StaticHttpClient::new()), handle, "sfx/weaponjam/");
    assert_eq!(cache.url_for("/jam1.wav"), "sfx/weaponjam/jam1.wav");
}
