// SnapBloom Data Models
// Media assets, detection verdicts and persisted post records

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ============ Media ============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
        }
    }

    /// Capitalized form used in dialog titles and button labels.
    pub fn title(&self) -> &'static str {
        match self {
            MediaKind::Image => "Image",
            MediaKind::Video => "Video",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity tag of one selected asset. Every in-flight detection call carries
/// the id of the asset it was issued for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssetId(Uuid);

impl AssetId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AssetId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Transferable media content as handed over by the picker.
#[derive(Debug, PartialEq, Eq)]
pub enum MediaPayload {
    /// Raw file bytes.
    Binary(Vec<u8>),
    /// A `data:` URL, possibly already carrying base64 text.
    DataUrl(String),
}

impl MediaPayload {
    pub fn is_empty(&self) -> bool {
        match self {
            MediaPayload::Binary(bytes) => bytes.is_empty(),
            MediaPayload::DataUrl(url) => url.is_empty(),
        }
    }
}

/// One pending upload. Owns its payload until publish or discard, so it is
/// deliberately not `Clone`.
#[derive(Debug)]
pub struct MediaAsset {
    pub id: AssetId,
    pub kind: MediaKind,
    pub mime: String,
    pub file_name: Option<String>,
    pub payload: MediaPayload,
    pub created_at: DateTime<Local>,
}

impl MediaAsset {
    pub fn new(kind: MediaKind, mime: impl Into<String>, payload: MediaPayload) -> Self {
        Self {
            id: AssetId::new(),
            kind,
            mime: mime.into(),
            file_name: None,
            payload,
            created_at: Local::now(),
        }
    }

    pub fn with_file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = Some(name.into());
        self
    }
}

// ============ Detection Verdict ============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DominantFactor {
    Visual,
    Audio,
}

impl DominantFactor {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "visual" => Some(DominantFactor::Visual),
            "audio" => Some(DominantFactor::Audio),
            _ => None,
        }
    }

    /// Label shown in front of the confidence in the warning notice.
    pub fn analysis_label(&self) -> &'static str {
        match self {
            DominantFactor::Visual => "Visual Analysis",
            DominantFactor::Audio => "Audio Analysis",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubVerdict {
    pub is_deepfake: bool,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoVerdict {
    pub is_deepfake: bool,
    pub confidence: f64,
    pub visual: Option<SubVerdict>,
    pub audio: Option<SubVerdict>,
    /// Only set when both `visual` and `audio` are present.
    pub dominant_factor: Option<DominantFactor>,
}

/// Outcome of one analysis run. Image verdicts never carry sub-results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mediaType", rename_all = "lowercase")]
pub enum DetectionVerdict {
    #[serde(rename_all = "camelCase")]
    Image { is_deepfake: bool, confidence: f64 },
    Video(VideoVerdict),
}

impl DetectionVerdict {
    /// Permissive verdict substituted when the detector cannot be reached.
    pub fn fallback(kind: MediaKind) -> Self {
        match kind {
            MediaKind::Image => DetectionVerdict::Image {
                is_deepfake: false,
                confidence: 0.0,
            },
            MediaKind::Video => DetectionVerdict::Video(VideoVerdict {
                is_deepfake: false,
                confidence: 0.0,
                visual: None,
                audio: None,
                dominant_factor: None,
            }),
        }
    }

    pub fn kind(&self) -> MediaKind {
        match self {
            DetectionVerdict::Image { .. } => MediaKind::Image,
            DetectionVerdict::Video(_) => MediaKind::Video,
        }
    }

    pub fn is_deepfake(&self) -> bool {
        match self {
            DetectionVerdict::Image { is_deepfake, .. } => *is_deepfake,
            DetectionVerdict::Video(v) => v.is_deepfake,
        }
    }

    pub fn confidence(&self) -> f64 {
        match self {
            DetectionVerdict::Image { confidence, .. } => *confidence,
            DetectionVerdict::Video(v) => v.confidence,
        }
    }

    pub fn dominant_factor(&self) -> Option<DominantFactor> {
        match self {
            DetectionVerdict::Image { .. } => None,
            DetectionVerdict::Video(v) => v.dominant_factor,
        }
    }

    /// Breakdown embedded into video posts; `None` for images.
    pub fn details(&self) -> Option<DeepfakeDetails> {
        match self {
            DetectionVerdict::Image { .. } => None,
            DetectionVerdict::Video(v) => Some(DeepfakeDetails {
                visual: v.visual,
                audio: v.audio,
                dominant_factor: v.dominant_factor,
            }),
        }
    }
}

// ============ Persisted Records ============

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeepfakeDetails {
    pub visual: Option<SubVerdict>,
    pub audio: Option<SubVerdict>,
    pub dominant_factor: Option<DominantFactor>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostRecord {
    pub id: u64,
    pub user_id: String,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub videos: Vec<String>,
    #[serde(default)]
    pub caption: String,
    #[serde(default)]
    pub likes: u64,
    #[serde(default)]
    pub comments: u64,
    pub created_at: String,
    #[serde(default)]
    pub is_deepfake: bool,
    #[serde(default)]
    pub deepfake_details: Option<DeepfakeDetails>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub avatar: String,
    /// Profile fields owned by other parts of the app, carried through untouched.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_matches_kind() {
        let image = DetectionVerdict::fallback(MediaKind::Image);
        assert_eq!(image.kind(), MediaKind::Image);
        assert!(!image.is_deepfake());
        assert_eq!(image.confidence(), 0.0);
        assert!(image.details().is_none());

        let video = DetectionVerdict::fallback(MediaKind::Video);
        assert_eq!(video.kind(), MediaKind::Video);
        let details = video.details().unwrap();
        assert!(details.visual.is_none() && details.audio.is_none());
    }

    #[test]
    fn test_post_record_wire_names() {
        let record = PostRecord {
            id: 7,
            user_id: "1".to_string(),
            images: vec![],
            videos: vec!["data:video/mp4;base64,AAAA".to_string()],
            caption: "hi".to_string(),
            likes: 0,
            comments: 0,
            created_at: "2024-01-01T00:00:00Z".to_string(),
            is_deepfake: true,
            deepfake_details: Some(DeepfakeDetails {
                visual: Some(SubVerdict { is_deepfake: true, confidence: 0.9 }),
                audio: None,
                dominant_factor: Some(DominantFactor::Visual),
            }),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["userId"], "1");
        assert_eq!(json["isDeepfake"], true);
        assert_eq!(json["deepfakeDetails"]["dominantFactor"], "visual");
        assert_eq!(json["deepfakeDetails"]["visual"]["isDeepfake"], true);
    }

    #[test]
    fn test_dominant_factor_parse() {
        assert_eq!(DominantFactor::parse("Audio"), Some(DominantFactor::Audio));
        assert_eq!(DominantFactor::parse("visual"), Some(DominantFactor::Visual));
        assert_eq!(DominantFactor::parse("both"), None);
    }
}
