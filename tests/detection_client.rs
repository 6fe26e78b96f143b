mod common;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use common::{image_asset, unreachable_url, video_asset, MockDetector, Reply};
use serde_json::json;
use snapbloom_lib::models::{DetectionVerdict, DominantFactor, MediaKind};
use snapbloom_lib::services::{drain_notices, notice_channel, DetectionClient, Notice, NoticeReceiver};
use std::time::Duration;

fn client(url: &str) -> (DetectionClient, NoticeReceiver) {
    let (notices, rx) = notice_channel();
    let client = DetectionClient::new().with_endpoint(url).with_notices(notices);
    (client, rx)
}

fn service_unavailable_count(rx: &mut NoticeReceiver) -> usize {
    drain_notices(rx)
        .into_iter()
        .filter(|n| matches!(n, Notice::ServiceUnavailable { .. }))
        .count()
}

#[tokio::test]
async fn image_request_carries_plain_base64_under_image_key() {
    let mock = MockDetector::start(Reply::json(json!({
        "is_deepfake": false,
        "confidence": 0.12,
        "media_type": "image"
    })))
    .await;
    let (client, _rx) = client(&mock.url);

    let verdict = client.analyze(&image_asset()).await;
    assert_eq!(verdict, DetectionVerdict::Image { is_deepfake: false, confidence: 0.12 });

    let requests = mock.requests();
    assert_eq!(requests.len(), 1);
    let body = requests[0].as_object().unwrap();
    assert_eq!(body.len(), 1);
    let payload = body["image"].as_str().unwrap();
    assert!(!payload.starts_with("data:"));
    assert_eq!(BASE64.decode(payload).unwrap(), vec![0x89, b'P', b'N', b'G', 1, 2, 3]);
}

#[tokio::test]
async fn video_request_uses_video_key_and_keeps_breakdown() {
    let mock = MockDetector::start(Reply::json(json!({
        "is_deepfake": true,
        "confidence": 0.912345678,
        "media_type": "video",
        "visual_result": {"is_deepfake": false, "confidence": 0.3},
        "audio_result": {"is_deepfake": true, "confidence": 0.912345678},
        "dominant_factor": "audio"
    })))
    .await;
    let (client, mut rx) = client(&mock.url);

    let verdict = client.analyze(&video_asset()).await;

    let body = &mock.requests()[0];
    assert!(body.get("video").is_some());
    assert!(body.get("image").is_none());

    assert!(verdict.is_deepfake());
    assert_eq!(verdict.confidence(), 0.9123);
    assert_eq!(verdict.dominant_factor(), Some(DominantFactor::Audio));
    let details = verdict.details().unwrap();
    assert_eq!(details.audio.unwrap().confidence, 0.9123);
    assert_eq!(details.visual.unwrap().confidence, 0.3);
    assert_eq!(service_unavailable_count(&mut rx), 0);
}

#[tokio::test]
async fn data_url_prefix_is_stripped_before_sending() {
    let mock = MockDetector::start(Reply::json(json!({"is_deepfake": false, "confidence": 0.5}))).await;
    let (client, _rx) = client(&mock.url);

    let mut intake = snapbloom_lib::services::MediaIntake::new();
    let selection = intake
        .select_data_url("data:image/jpeg;base64,/9j/4AAQ".to_string())
        .unwrap();
    client.analyze(&selection.asset).await;

    assert_eq!(mock.requests()[0]["image"], "/9j/4AAQ");
}

#[tokio::test]
async fn unreachable_service_yields_fallback_and_one_notice() {
    let (client, mut rx) = client(&unreachable_url());

    let verdict = client.analyze(&image_asset()).await;
    assert_eq!(verdict, DetectionVerdict::fallback(MediaKind::Image));
    assert_eq!(service_unavailable_count(&mut rx), 1);
}

#[tokio::test]
async fn server_error_yields_fallback() {
    let mock = MockDetector::start(Reply::status(500, r#"{"detail":"model not loaded"}"#)).await;
    let (client, mut rx) = client(&mock.url);

    let verdict = client.analyze(&video_asset()).await;
    assert_eq!(verdict, DetectionVerdict::fallback(MediaKind::Video));
    assert_eq!(service_unavailable_count(&mut rx), 1);
    // single attempt, no retry
    assert_eq!(mock.requests().len(), 1);
}

#[tokio::test]
async fn malformed_body_yields_fallback() {
    let mock = MockDetector::start(Reply::status(200, "<html>gateway</html>")).await;
    let (client, mut rx) = client(&mock.url);

    let verdict = client.analyze(&image_asset()).await;
    assert!(!verdict.is_deepfake());
    assert_eq!(verdict.confidence(), 0.0);
    assert_eq!(service_unavailable_count(&mut rx), 1);
}

#[tokio::test]
async fn slow_service_times_out_to_fallback() {
    let mock = MockDetector::start(
        Reply::json(json!({"is_deepfake": true, "confidence": 0.99}))
            .delayed(Duration::from_secs(5)),
    )
    .await;
    let (client, mut rx) = client(&mock.url);
    let client = client.with_timeouts(Duration::from_millis(200), Duration::from_millis(200));

    let verdict = client.analyze(&image_asset()).await;
    assert_eq!(verdict, DetectionVerdict::fallback(MediaKind::Image));

    let notices = drain_notices(&mut rx);
    assert_eq!(notices.len(), 1);
    match &notices[0] {
        Notice::ServiceUnavailable { kind, reason } => {
            assert_eq!(*kind, MediaKind::Image);
            assert!(reason.contains("timed out"));
        }
        other => panic!("unexpected notice {:?}", other),
    }
}

#[tokio::test]
async fn video_without_sub_results_is_treated_as_fallback() {
    let mock = MockDetector::start(Reply::json(json!({
        "is_deepfake": true,
        "confidence": 0.8,
        "media_type": "video"
    })))
    .await;
    let (client, mut rx) = client(&mock.url);

    let verdict = client.analyze(&video_asset()).await;
    assert_eq!(verdict, DetectionVerdict::fallback(MediaKind::Video));

    let notices = drain_notices(&mut rx);
    assert_eq!(notices, vec![Notice::IndeterminateVerdict]);
}

#[tokio::test]
async fn confidence_is_stabilized_on_arrival() {
    let mock = MockDetector::start(Reply::json(json!({
        "is_deepfake": true,
        "confidence": 0.873456789
    })))
    .await;
    let (client, _rx) = client(&mock.url);

    let first = client.analyze(&image_asset()).await;
    let second = client.analyze(&image_asset()).await;
    assert_eq!(first.confidence(), 0.8735);
    assert_eq!(first, second);
}
