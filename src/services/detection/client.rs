// Detection Client
// Single-attempt call to the deepfake detection service with a permissive
// fallback: callers always receive a verdict, never an error

use crate::models::{
    DetectionVerdict, DominantFactor, MediaAsset, MediaKind, SubVerdict, VideoVerdict,
};
use crate::services::config_store::{AppConfig, DetectionConfig};
use crate::services::notices::{Notice, NoticeSender};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::env;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{info, warn};

use super::request::DetectionRequest;
use super::stabilization::stabilize_verdict;

pub const DEFAULT_DETECTION_URL: &str = "http://127.0.0.1:8080/detect-deepfake";
pub const DEFAULT_IMAGE_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_VIDEO_TIMEOUT_SECS: u64 = 60;
const CONNECT_TIMEOUT_SECS: u64 = 5;

#[derive(Error, Debug)]
pub enum DetectionError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },
    #[error("JSON parse error: {0}")]
    JsonError(String),
    #[error("Detection timed out after {0:?}")]
    Timeout(Duration),
    #[error("Video verdict carried neither visual nor audio result")]
    IndeterminateVideo,
}

/// Anything able to turn one request into exactly one verdict.
#[async_trait]
pub trait DeepfakeDetector: Send + Sync {
    async fn detect(&self, request: DetectionRequest) -> DetectionVerdict;
}

#[derive(Debug, Deserialize)]
struct RawSubResult {
    is_deepfake: bool,
    confidence: f64,
}

#[derive(Debug, Deserialize)]
struct RawDetectionResponse {
    is_deepfake: bool,
    confidence: f64,
    #[serde(default)]
    media_type: Option<String>,
    #[serde(default)]
    visual_result: Option<RawSubResult>,
    #[serde(default)]
    audio_result: Option<RawSubResult>,
    #[serde(default)]
    dominant_factor: Option<String>,
    #[serde(default)]
    note: Option<String>,
}

/// `SNAPBLOOM_DETECTION_URL`, ignored when blank.
fn endpoint_override() -> Option<String> {
    non_blank(env::var("SNAPBLOOM_DETECTION_URL").ok())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

pub struct DetectionClient {
    client: Client,
    endpoint: String,
    image_timeout: Duration,
    video_timeout: Duration,
    notices: NoticeSender,
}

impl Default for DetectionClient {
    fn default() -> Self {
        Self::new()
    }
}

impl DetectionClient {
    pub fn new() -> Self {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .unwrap_or_default();

        let endpoint = endpoint_override().unwrap_or_else(|| DEFAULT_DETECTION_URL.to_string());

        Self {
            client,
            endpoint,
            image_timeout: Duration::from_secs(DEFAULT_IMAGE_TIMEOUT_SECS),
            video_timeout: Duration::from_secs(DEFAULT_VIDEO_TIMEOUT_SECS),
            notices: NoticeSender::disabled(),
        }
    }

    /// Build from the app config, honouring the proxy section when enabled.
    pub fn from_config(config: &AppConfig) -> Result<Self, DetectionError> {
        let mut builder =
            Client::builder().connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS));

        if let Some(proxy) = config.proxy.as_ref().filter(|p| p.enabled) {
            if let Some(url) = proxy.http.as_deref() {
                builder = builder.proxy(reqwest::Proxy::http(url)?);
            }
            if let Some(url) = proxy.https.as_deref() {
                builder = builder.proxy(reqwest::Proxy::https(url)?);
            }
        }

        let client = builder.build()?;
        Ok(Self::with_client(client, &config.detection))
    }

    pub fn with_client(client: Client, detection: &DetectionConfig) -> Self {
        let endpoint = endpoint_override().unwrap_or_else(|| detection.endpoint.clone());

        Self {
            client,
            endpoint,
            image_timeout: Duration::from_secs(detection.image_timeout_secs),
            video_timeout: Duration::from_secs(detection.video_timeout_secs),
            notices: NoticeSender::disabled(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_timeouts(mut self, image: Duration, video: Duration) -> Self {
        self.image_timeout = image;
        self.video_timeout = video;
        self
    }

    /// Where "service unavailable" notices go.
    pub fn with_notices(mut self, notices: NoticeSender) -> Self {
        self.notices = notices;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn timeout_for(&self, kind: MediaKind) -> Duration {
        match kind {
            MediaKind::Image => self.image_timeout,
            MediaKind::Video => self.video_timeout,
        }
    }

    /// Analyze one asset. Always yields a verdict; failures become the
    /// fallback verdict plus a notice.
    pub async fn analyze(&self, asset: &MediaAsset) -> DetectionVerdict {
        self.analyze_request(DetectionRequest::from_asset(asset)).await
    }

    pub async fn analyze_request(&self, request: DetectionRequest) -> DetectionVerdict {
        let kind = request.kind();
        let limit = self.timeout_for(kind);

        let outcome = match tokio::time::timeout(limit, self.try_detect(&request)).await {
            Ok(result) => result,
            Err(_) => Err(DetectionError::Timeout(limit)),
        };

        match outcome {
            Ok(verdict) => verdict,
            Err(DetectionError::IndeterminateVideo) => {
                warn!(
                    "[DETECTION] data-quality: video verdict without visual/audio result, using fallback"
                );
                self.notices.send(Notice::IndeterminateVerdict);
                DetectionVerdict::fallback(kind)
            }
            Err(e) => {
                warn!("[DETECTION] {} analysis failed, using fallback verdict: {}", kind, e);
                self.notices.send(Notice::ServiceUnavailable {
                    kind,
                    reason: e.to_string(),
                });
                DetectionVerdict::fallback(kind)
            }
        }
    }

    /// One POST, no retry. Errors are returned as-is for the caller to map.
    pub async fn try_detect(
        &self,
        request: &DetectionRequest,
    ) -> Result<DetectionVerdict, DetectionError> {
        let kind = request.kind();
        info!(
            kind = kind.as_str(),
            payload_len = request.payload_len(),
            endpoint = %self.endpoint,
            "detection.request"
        );

        let start = Instant::now();

        let response = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await?;

        let latency_ms = start.elapsed().as_millis() as i64;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DetectionError::ApiError {
                status: status.as_u16(),
                message: body,
            });
        }

        let body = response.text().await?;
        let raw: RawDetectionResponse =
            serde_json::from_str(&body).map_err(|e| DetectionError::JsonError(e.to_string()))?;

        let verdict = interpret_response(kind, raw)?;
        info!(
            kind = kind.as_str(),
            latency_ms,
            is_deepfake = verdict.is_deepfake(),
            confidence = verdict.confidence(),
            "detection.verdict"
        );
        Ok(verdict)
    }
}

#[async_trait]
impl DeepfakeDetector for DetectionClient {
    async fn detect(&self, request: DetectionRequest) -> DetectionVerdict {
        self.analyze_request(request).await
    }
}

fn checked_confidence(value: f64) -> Result<f64, DetectionError> {
    if !value.is_finite() {
        return Err(DetectionError::JsonError(format!("non-finite confidence {}", value)));
    }
    if !(0.0..=1.0).contains(&value) {
        warn!("[DETECTION] confidence {} outside [0,1], clamping", value);
    }
    Ok(value.clamp(0.0, 1.0))
}

fn sub_verdict(raw: Option<RawSubResult>) -> Result<Option<SubVerdict>, DetectionError> {
    raw.map(|r| {
        Ok(SubVerdict {
            is_deepfake: r.is_deepfake,
            confidence: checked_confidence(r.confidence)?,
        })
    })
    .transpose()
}

/// Map the service's loosely shaped answer onto the verdict for the kind that
/// was actually sent, then stabilize it.
fn interpret_response(
    kind: MediaKind,
    raw: RawDetectionResponse,
) -> Result<DetectionVerdict, DetectionError> {
    if let Some(reported) = raw.media_type.as_deref() {
        if !reported.eq_ignore_ascii_case(kind.as_str()) {
            warn!("[DETECTION] service reported media_type={} for a {} request", reported, kind);
        }
    }
    if let Some(note) = raw.note.as_deref() {
        info!("[DETECTION] service note: {}", note);
    }

    let confidence = checked_confidence(raw.confidence)?;

    let verdict = match kind {
        MediaKind::Image => DetectionVerdict::Image {
            is_deepfake: raw.is_deepfake,
            confidence,
        },
        MediaKind::Video => {
            let visual = sub_verdict(raw.visual_result)?;
            let audio = sub_verdict(raw.audio_result)?;
            if visual.is_none() && audio.is_none() {
                return Err(DetectionError::IndeterminateVideo);
            }

            let dominant_factor = match raw.dominant_factor.as_deref() {
                Some(f) if visual.is_some() && audio.is_some() => {
                    let parsed = DominantFactor::parse(f);
                    if parsed.is_none() {
                        warn!("[DETECTION] unknown dominant_factor '{}', ignoring", f);
                    }
                    parsed
                }
                _ => None,
            };

            DetectionVerdict::Video(VideoVerdict {
                is_deepfake: raw.is_deepfake,
                confidence,
                visual,
                audio,
                dominant_factor,
            })
        }
    };

    Ok(stabilize_verdict(verdict))
}
