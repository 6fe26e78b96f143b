// Detection Request
// Builds the JSON body sent to the detector: exactly one of `image` / `video`,
// holding plain base64 without any data-URI prefix

use crate::models::{MediaAsset, MediaKind, MediaPayload};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

static DATA_URL_PREFIX: OnceLock<Regex> = OnceLock::new();

fn data_url_prefix() -> &'static Regex {
    DATA_URL_PREFIX.get_or_init(|| {
        Regex::new(r"^data:(?P<mime>[^;,]*)(?P<params>(;[^,]*)?),").expect("valid data url regex")
    })
}

/// Wire body of one detection call. Serializes as `{"image": "..."}` or
/// `{"video": "..."}`, so the two keys can never appear together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectionRequest {
    Image(String),
    Video(String),
}

impl DetectionRequest {
    pub fn from_asset(asset: &MediaAsset) -> Self {
        Self::new(asset.kind, encode_payload(&asset.payload))
    }

    pub fn new(kind: MediaKind, base64_payload: String) -> Self {
        match kind {
            MediaKind::Image => DetectionRequest::Image(base64_payload),
            MediaKind::Video => DetectionRequest::Video(base64_payload),
        }
    }

    /// Media kind inferred from which payload is carried.
    pub fn kind(&self) -> MediaKind {
        match self {
            DetectionRequest::Image(_) => MediaKind::Image,
            DetectionRequest::Video(_) => MediaKind::Video,
        }
    }

    pub fn payload_len(&self) -> usize {
        match self {
            DetectionRequest::Image(p) | DetectionRequest::Video(p) => p.len(),
        }
    }
}

/// Split a data URL into (mime, is_base64, body). Returns `None` when the
/// input does not start with a `data:` header.
pub fn split_data_url(input: &str) -> Option<(&str, bool, &str)> {
    let caps = data_url_prefix().captures(input)?;
    let header = caps.get(0)?;
    let mime = caps.name("mime").map(|m| m.as_str()).unwrap_or("");
    let is_base64 = caps
        .name("params")
        .map(|p| p.as_str().split(';').any(|param| param.eq_ignore_ascii_case("base64")))
        .unwrap_or(false);
    Some((mime, is_base64, &input[header.end()..]))
}

/// Strip a leading data-URI header, leaving the body untouched.
pub fn strip_data_url_prefix(input: &str) -> &str {
    split_data_url(input).map(|(_, _, body)| body).unwrap_or(input)
}

/// Base64 text of the payload with no data-URI prefix.
pub fn encode_payload(payload: &MediaPayload) -> String {
    match payload {
        MediaPayload::Binary(bytes) => BASE64.encode(bytes),
        MediaPayload::DataUrl(url) => match split_data_url(url) {
            Some((_, true, body)) => body.trim().to_string(),
            Some((_, false, body)) => BASE64.encode(body.as_bytes()),
            // no header: already plain base64 text
            None => url.trim().to_string(),
        },
    }
}
