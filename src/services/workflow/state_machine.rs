// Moderation State Machine
// Pure (state, event) -> state transitions of the upload flow. Side effects
// are returned as data for the session to carry out.

use crate::models::{AssetId, DetectionVerdict, MediaAsset, MediaKind};
use crate::services::detection::{format_confidence, DetectionRequest};

#[derive(Debug, Default)]
pub enum WorkflowState {
    #[default]
    Idle,
    Selecting,
    Analyzing {
        asset: MediaAsset,
    },
    Resolved {
        asset: MediaAsset,
        verdict: DetectionVerdict,
    },
    Blocked {
        asset: MediaAsset,
        verdict: DetectionVerdict,
    },
    Published,
}

impl WorkflowState {
    pub fn name(&self) -> &'static str {
        match self {
            WorkflowState::Idle => "idle",
            WorkflowState::Selecting => "selecting",
            WorkflowState::Analyzing { .. } => "analyzing",
            WorkflowState::Resolved { .. } => "resolved",
            WorkflowState::Blocked { .. } => "blocked",
            WorkflowState::Published => "published",
        }
    }

    pub fn asset(&self) -> Option<&MediaAsset> {
        match self {
            WorkflowState::Analyzing { asset }
            | WorkflowState::Resolved { asset, .. }
            | WorkflowState::Blocked { asset, .. } => Some(asset),
            _ => None,
        }
    }

    pub fn verdict(&self) -> Option<&DetectionVerdict> {
        match self {
            WorkflowState::Resolved { verdict, .. } | WorkflowState::Blocked { verdict, .. } => {
                Some(verdict)
            }
            _ => None,
        }
    }

    pub fn is_analyzing(&self) -> bool {
        matches!(self, WorkflowState::Analyzing { .. })
    }
}

#[derive(Debug)]
pub enum WorkflowEvent {
    OpenPicker,
    CancelPicker,
    Select(MediaAsset),
    VerdictArrived {
        asset_id: AssetId,
        verdict: DetectionVerdict,
    },
    ContinueAnyway,
    Remove,
    Publish {
        caption: String,
    },
    /// Publishing is done; return to a fresh Idle.
    Finish,
}

impl WorkflowEvent {
    pub fn name(&self) -> &'static str {
        match self {
            WorkflowEvent::OpenPicker => "open_picker",
            WorkflowEvent::CancelPicker => "cancel_picker",
            WorkflowEvent::Select(_) => "select",
            WorkflowEvent::VerdictArrived { .. } => "verdict_arrived",
            WorkflowEvent::ContinueAnyway => "continue_anyway",
            WorkflowEvent::Remove => "remove",
            WorkflowEvent::Publish { .. } => "publish",
            WorkflowEvent::Finish => "finish",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscardReason {
    Superseded,
    Removed,
}

/// Everything needed to write the post record.
#[derive(Debug)]
pub struct PendingPost {
    pub asset: MediaAsset,
    pub verdict: DetectionVerdict,
    pub caption: String,
}

#[derive(Debug)]
pub enum Effect {
    /// Issue one detection call tagged with the asset it belongs to.
    StartAnalysis {
        asset_id: AssetId,
        request: DetectionRequest,
    },
    VideoAdvisory,
    Discarded {
        asset_id: AssetId,
        reason: DiscardReason,
    },
    ShowWarning {
        kind: MediaKind,
        source: Option<String>,
        confidence: String,
    },
    StaleVerdictDropped {
        asset_id: AssetId,
    },
    Persist(PendingPost),
    Ignored {
        event: &'static str,
        state: &'static str,
    },
}

#[derive(Debug)]
pub struct Step {
    pub state: WorkflowState,
    pub effects: Vec<Effect>,
}

impl Step {
    fn to(state: WorkflowState) -> Self {
        Self { state, effects: Vec::new() }
    }

    fn with(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn was_ignored(&self) -> bool {
        self.effects.iter().any(|e| matches!(e, Effect::Ignored { .. }))
    }
}

fn start_analysis(asset: MediaAsset, mut effects: Vec<Effect>) -> Step {
    effects.push(Effect::StartAnalysis {
        asset_id: asset.id,
        request: DetectionRequest::from_asset(&asset),
    });
    if asset.kind == MediaKind::Video {
        effects.push(Effect::VideoAdvisory);
    }
    Step {
        state: WorkflowState::Analyzing { asset },
        effects,
    }
}

fn resolve(asset: MediaAsset, verdict: DetectionVerdict) -> Step {
    // the service's boolean alone decides; confidence is display-only
    if verdict.is_deepfake() {
        let warning = Effect::ShowWarning {
            kind: asset.kind,
            source: verdict.dominant_factor().map(|f| f.analysis_label().to_string()),
            confidence: format_confidence(verdict.confidence()),
        };
        Step::to(WorkflowState::Blocked { asset, verdict }).with(warning)
    } else {
        Step::to(WorkflowState::Resolved { asset, verdict })
    }
}

/// Apply one event. Events that make no sense in the current state leave it
/// unchanged and report `Effect::Ignored`.
pub fn transition(state: WorkflowState, event: WorkflowEvent) -> Step {
    use WorkflowEvent as E;
    use WorkflowState as S;

    match (state, event) {
        (S::Idle, E::OpenPicker) => Step::to(S::Selecting),
        (S::Selecting, E::CancelPicker) => Step::to(S::Idle),

        (prev, E::Select(asset)) => {
            let effects = prev
                .asset()
                .map(|old| Effect::Discarded {
                    asset_id: old.id,
                    reason: DiscardReason::Superseded,
                })
                .into_iter()
                .collect();
            start_analysis(asset, effects)
        }

        (S::Analyzing { asset }, E::VerdictArrived { asset_id, verdict }) if asset.id == asset_id => {
            resolve(asset, verdict)
        }
        (other, E::VerdictArrived { asset_id, .. }) => {
            Step::to(other).with(Effect::StaleVerdictDropped { asset_id })
        }

        (S::Blocked { asset, verdict }, E::ContinueAnyway) => Step::to(S::Resolved { asset, verdict }),

        (S::Analyzing { asset }, E::Remove)
        | (S::Resolved { asset, .. }, E::Remove)
        | (S::Blocked { asset, .. }, E::Remove) => Step::to(S::Idle).with(Effect::Discarded {
            asset_id: asset.id,
            reason: DiscardReason::Removed,
        }),

        (S::Resolved { asset, verdict }, E::Publish { caption }) => {
            Step::to(S::Published).with(Effect::Persist(PendingPost {
                asset,
                verdict,
                caption,
            }))
        }

        (S::Published, E::Finish) => Step::to(S::Idle),

        (other, event) => {
            let ignored = Effect::Ignored {
                event: event.name(),
                state: other.name(),
            };
            Step::to(other).with(ignored)
        }
    }
}
