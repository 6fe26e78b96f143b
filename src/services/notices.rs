// User Notices
// Non-blocking toasts surfaced next to the workflow. Nothing in here feeds back
// into moderation decisions.

use crate::models::MediaKind;
use serde::Serialize;
use tokio::sync::mpsc;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Notice {
    /// Shown once per selected video: audio + visual analysis is slower.
    VideoAnalysisAdvisory,
    /// The detector could not be used; a permissive verdict was substituted.
    ServiceUnavailable { kind: MediaKind, reason: String },
    /// The detector answered for a video without any sub-result.
    IndeterminateVerdict,
    /// A positive verdict; `source` is e.g. `Audio Analysis` when known.
    DeepfakeWarning {
        kind: MediaKind,
        source: Option<String>,
        confidence: String,
    },
    PostCreated { id: u64 },
}

impl Notice {
    pub fn title(&self) -> String {
        match self {
            Notice::VideoAnalysisAdvisory => "Processing Video".to_string(),
            Notice::ServiceUnavailable { .. } => "Detection Service Unavailable".to_string(),
            Notice::IndeterminateVerdict => "Detection Result Incomplete".to_string(),
            Notice::DeepfakeWarning { kind, .. } => {
                format!("Potential Deepfake {} Detected", kind.title())
            }
            Notice::PostCreated { .. } => "Post created!".to_string(),
        }
    }

    pub fn description(&self) -> String {
        match self {
            Notice::VideoAnalysisAdvisory => {
                "Video analysis (visual & audio) may take longer than images. Please wait...".to_string()
            }
            Notice::ServiceUnavailable { .. } => "Using fallback detection method.".to_string(),
            Notice::IndeterminateVerdict => {
                "The detector returned no visual or audio result. Using fallback detection method.".to_string()
            }
            Notice::DeepfakeWarning {
                source, confidence, ..
            } => match source {
                Some(s) => format!("{}: Confidence: {}", s, confidence),
                None => format!("Confidence: {}", confidence),
            },
            Notice::PostCreated { .. } => "Your post has been published successfully.".to_string(),
        }
    }

    /// Destructive notices get the red styling.
    pub fn is_destructive(&self) -> bool {
        matches!(
            self,
            Notice::ServiceUnavailable { .. } | Notice::DeepfakeWarning { .. }
        )
    }
}

pub type NoticeReceiver = mpsc::UnboundedReceiver<Notice>;

/// Cloneable handle for posting notices. Sending never blocks and never
/// fails the caller; a closed receiver just drops the notice.
#[derive(Debug, Clone, Default)]
pub struct NoticeSender {
    tx: Option<mpsc::UnboundedSender<Notice>>,
}

impl NoticeSender {
    /// A sender that drops everything.
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    pub fn send(&self, notice: Notice) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(notice);
        }
    }
}

pub fn notice_channel() -> (NoticeSender, NoticeReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (NoticeSender { tx: Some(tx) }, rx)
}

/// Everything currently queued, without waiting.
pub fn drain_notices(rx: &mut NoticeReceiver) -> Vec<Notice> {
    let mut out = Vec::new();
    while let Ok(notice) = rx.try_recv() {
        out.push(notice);
    }
    out
}
