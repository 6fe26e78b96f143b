// UI Affordances
// What the create-post screen shows for each workflow state

use crate::models::{DetectionVerdict, MediaKind};
use crate::services::detection::format_confidence;
use serde::Serialize;

use super::state_machine::WorkflowState;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Badge {
    pub label: String,
    pub flagged: bool,
    /// Omitted when the confidence is zero (fallback verdicts).
    pub confidence: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeepfakeDialog {
    pub title: String,
    pub message: String,
    pub confidence: String,
    pub confirm_label: String,
    pub cancel_label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "view", rename_all = "camelCase")]
pub enum View {
    MediaSelector,
    Picker,
    Progress {
        label: String,
        detail: Option<String>,
    },
    Preview {
        badge: Badge,
        warning: Option<String>,
    },
    BlockingDialog(DeepfakeDialog),
    Published,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Affordance {
    pub view: View,
    pub can_publish: bool,
    pub can_remove: bool,
}

pub fn badge(kind: MediaKind, verdict: &DetectionVerdict) -> Badge {
    let flagged = verdict.is_deepfake();
    let label = match (kind, flagged) {
        (MediaKind::Image, false) => "Real Image",
        (MediaKind::Image, true) => "Potential Deepfake",
        (MediaKind::Video, false) => "Real Video",
        (MediaKind::Video, true) => "Potential Fake Video",
    };
    let confidence = verdict.confidence();
    Badge {
        label: label.to_string(),
        flagged,
        confidence: (confidence > 0.0).then(|| format_confidence(confidence)),
    }
}

pub fn deepfake_dialog(kind: MediaKind, verdict: &DetectionVerdict) -> DeepfakeDialog {
    DeepfakeDialog {
        title: format!("Potential Deepfake {} Detected", kind.title()),
        message: format!(
            "Our AI has detected this {} as potentially manipulated. \
             Posting deliberately misleading content may violate our community guidelines.",
            kind
        ),
        confidence: format_confidence(verdict.confidence()),
        confirm_label: "Continue Anyway".to_string(),
        cancel_label: format!("Choose Another {}", kind.title()),
    }
}

pub fn render(state: &WorkflowState) -> Affordance {
    match state {
        WorkflowState::Idle => Affordance {
            view: View::MediaSelector,
            can_publish: false,
            can_remove: false,
        },
        WorkflowState::Selecting => Affordance {
            view: View::Picker,
            can_publish: false,
            can_remove: false,
        },
        WorkflowState::Analyzing { asset } => Affordance {
            view: View::Progress {
                label: format!("Analyzing {}...", asset.kind),
                detail: (asset.kind == MediaKind::Video)
                    .then(|| "Analyzing visual content and audio".to_string()),
            },
            can_publish: false,
            can_remove: true,
        },
        WorkflowState::Resolved { asset, verdict } => Affordance {
            view: View::Preview {
                badge: badge(asset.kind, verdict),
                warning: verdict.is_deepfake().then(|| {
                    format!(
                        "This {} has been detected as a potential deepfake. Please review carefully before posting.",
                        asset.kind
                    )
                }),
            },
            can_publish: true,
            can_remove: true,
        },
        WorkflowState::Blocked { asset, verdict } => Affordance {
            view: View::BlockingDialog(deepfake_dialog(asset.kind, verdict)),
            can_publish: false,
            can_remove: true,
        },
        WorkflowState::Published => Affordance {
            view: View::Published,
            can_publish: false,
            can_remove: false,
        },
    }
}
