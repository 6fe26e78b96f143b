// Moderation Session
// Drives the state machine on the UI task: spawns detection calls, applies
// verdicts when they come back (dropping stale ones), and writes posts

use crate::models::{AssetId, DetectionVerdict, MediaAsset, MediaKind, MediaPayload, PostRecord};
use crate::services::detection::{encode_payload, DeepfakeDetector, DetectionRequest};
use crate::services::media_intake::{IntakeError, MediaIntake, Selection};
use crate::services::notices::{Notice, NoticeSender};
use crate::services::record_store::{RecordStore, StoreError};
use chrono::{SecondsFormat, Utc};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::affordance::{render, Affordance};
use super::state_machine::{transition, DiscardReason, Effect, PendingPost, WorkflowEvent, WorkflowState};

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("{action} is not available while {state}")]
    NotAllowed {
        action: &'static str,
        state: &'static str,
    },
    #[error(transparent)]
    Intake(#[from] IntakeError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug)]
struct Completion {
    asset_id: AssetId,
    verdict: DetectionVerdict,
}

/// What happened to one verdict that came back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerdictOutcome {
    Resolved(AssetId),
    Blocked(AssetId),
    Stale(AssetId),
}

pub struct ModerationSession<D: DeepfakeDetector + 'static> {
    detector: Arc<D>,
    store: RecordStore,
    notices: NoticeSender,
    intake: MediaIntake,
    state: WorkflowState,
    completions_tx: mpsc::UnboundedSender<Completion>,
    completions_rx: mpsc::UnboundedReceiver<Completion>,
    in_flight: usize,
}

impl<D: DeepfakeDetector + 'static> ModerationSession<D> {
    pub fn new(detector: Arc<D>, store: RecordStore, notices: NoticeSender) -> Self {
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        Self {
            detector,
            store,
            notices,
            intake: MediaIntake::new(),
            state: WorkflowState::Idle,
            completions_tx,
            completions_rx,
            in_flight: 0,
        }
    }

    pub fn state(&self) -> &WorkflowState {
        &self.state
    }

    pub fn affordance(&self) -> Affordance {
        render(&self.state)
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    /// Detection calls issued and not yet collected, stale ones included.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    fn apply(&mut self, event: WorkflowEvent) -> Vec<Effect> {
        let from = self.state.name();
        let event_name = event.name();
        let step = transition(std::mem::take(&mut self.state), event);
        self.state = step.state;
        debug!(from, to = self.state.name(), event = event_name, "workflow.transition");

        let mut leftover = Vec::new();
        for effect in step.effects {
            match effect {
                Effect::StartAnalysis { asset_id, request } => self.spawn_analysis(asset_id, request),
                Effect::VideoAdvisory => self.notices.send(Notice::VideoAnalysisAdvisory),
                Effect::Discarded { asset_id, reason } => {
                    info!(asset_id = %asset_id, ?reason, "workflow.asset_discarded");
                    if reason == DiscardReason::Removed {
                        self.intake.clear();
                    }
                }
                Effect::ShowWarning { kind, source, confidence } => {
                    self.notices.send(Notice::DeepfakeWarning { kind, source, confidence })
                }
                Effect::StaleVerdictDropped { asset_id } => {
                    info!(asset_id = %asset_id, "workflow.stale_verdict_dropped");
                }
                other => leftover.push(other),
            }
        }
        leftover
    }

    fn apply_checked(&mut self, event: WorkflowEvent) -> Result<Vec<Effect>, SessionError> {
        let action = event.name();
        let effects = self.apply(event);
        if let Some(Effect::Ignored { state, .. }) =
            effects.iter().find(|e| matches!(e, Effect::Ignored { .. }))
        {
            warn!(action, state = *state, "workflow.action_rejected");
            return Err(SessionError::NotAllowed { action, state: *state });
        }
        Ok(effects)
    }

    fn spawn_analysis(&mut self, asset_id: AssetId, request: DetectionRequest) {
        let detector = Arc::clone(&self.detector);
        let tx = self.completions_tx.clone();
        self.in_flight += 1;
        info!(asset_id = %asset_id, kind = request.kind().as_str(), "workflow.analysis_started");

        let kind = request.kind();
        let call = tokio::spawn(async move { detector.detect(request).await });
        tokio::spawn(async move {
            let verdict = match call.await {
                Ok(verdict) => verdict,
                Err(e) => {
                    warn!(asset_id = %asset_id, panicked = e.is_panic(), "[WORKFLOW] detector task failed, using fallback verdict");
                    DetectionVerdict::fallback(kind)
                }
            };
            // receiver lives as long as the session
            let _ = tx.send(Completion { asset_id, verdict });
        });
    }

    pub fn open_picker(&mut self) -> Result<(), SessionError> {
        self.apply_checked(WorkflowEvent::OpenPicker).map(|_| ())
    }

    pub fn cancel_picker(&mut self) -> Result<(), SessionError> {
        self.apply_checked(WorkflowEvent::CancelPicker).map(|_| ())
    }

    fn begin(&mut self, selection: Selection) -> AssetId {
        let id = selection.asset.id;
        if let Some(prev) = selection.reset {
            debug!(asset_id = %prev, "intake.reset");
        }
        self.apply(WorkflowEvent::Select(selection.asset));
        id
    }

    pub async fn select_image(&mut self, path: &Path) -> Result<AssetId, SessionError> {
        let selection = self.intake.select_image(path).await?;
        Ok(self.begin(selection))
    }

    pub async fn select_video(&mut self, path: &Path) -> Result<AssetId, SessionError> {
        let selection = self.intake.select_video(path).await?;
        Ok(self.begin(selection))
    }

    /// Select a file, choosing image or video from its extension.
    pub async fn select_path(&mut self, path: &Path) -> Result<AssetId, SessionError> {
        let selection = self.intake.select_path(path).await?;
        Ok(self.begin(selection))
    }

    pub fn select_data_url(&mut self, data_url: String) -> Result<AssetId, SessionError> {
        let selection = self.intake.select_data_url(data_url)?;
        Ok(self.begin(selection))
    }

    /// Select an asset built elsewhere.
    pub fn select_asset(&mut self, asset: MediaAsset) -> AssetId {
        let selection = self.intake.adopt(asset);
        self.begin(selection)
    }

    pub fn continue_anyway(&mut self) -> Result<(), SessionError> {
        self.apply_checked(WorkflowEvent::ContinueAnyway).map(|_| ())
    }

    pub fn remove(&mut self) -> Result<(), SessionError> {
        self.apply_checked(WorkflowEvent::Remove).map(|_| ())
    }

    /// Wait for the next detection call to finish and apply it. Returns `None`
    /// when nothing is in flight.
    pub async fn next_verdict(&mut self) -> Option<VerdictOutcome> {
        if self.in_flight == 0 {
            return None;
        }
        let Completion { asset_id, verdict } = self.completions_rx.recv().await?;
        self.in_flight -= 1;

        let applies = matches!(&self.state, WorkflowState::Analyzing { asset } if asset.id == asset_id);
        self.apply(WorkflowEvent::VerdictArrived { asset_id, verdict });

        let outcome = if !applies {
            VerdictOutcome::Stale(asset_id)
        } else if matches!(self.state, WorkflowState::Blocked { .. }) {
            VerdictOutcome::Blocked(asset_id)
        } else {
            VerdictOutcome::Resolved(asset_id)
        };
        Some(outcome)
    }

    /// Keep applying verdicts until the current asset is no longer analyzing.
    pub async fn settle(&mut self) -> &WorkflowState {
        while self.state.is_analyzing() {
            if self.next_verdict().await.is_none() {
                break;
            }
        }
        &self.state
    }

    /// Write the post and return to Idle. A failed write puts the asset back
    /// into `Resolved` so the user can retry or remove it.
    pub fn publish(&mut self, caption: &str) -> Result<PostRecord, SessionError> {
        let effects = self.apply_checked(WorkflowEvent::Publish {
            caption: caption.to_string(),
        })?;
        let pending = effects.into_iter().find_map(|e| match e {
            Effect::Persist(p) => Some(p),
            _ => None,
        });
        let Some(pending) = pending else {
            return Err(SessionError::NotAllowed {
                action: "publish",
                state: self.state.name(),
            });
        };

        match self.persist(&pending) {
            Ok(record) => {
                self.intake.clear();
                self.apply(WorkflowEvent::Finish);
                self.notices.send(Notice::PostCreated { id: record.id });
                info!(post_id = record.id, is_deepfake = record.is_deepfake, "workflow.published");
                Ok(record)
            }
            Err(e) => {
                warn!("[WORKFLOW] publish failed, keeping media: {}", e);
                let PendingPost { asset, verdict, .. } = pending;
                self.state = WorkflowState::Resolved { asset, verdict };
                Err(e.into())
            }
        }
    }

    fn persist(&self, pending: &PendingPost) -> Result<PostRecord, StoreError> {
        let user = self.store.current_user()?;
        let id = self.store.next_post_id()?;
        let source = media_source(&pending.asset);
        let (images, videos) = match pending.asset.kind {
            MediaKind::Image => (vec![source], Vec::new()),
            MediaKind::Video => (Vec::new(), vec![source]),
        };

        let record = PostRecord {
            id,
            user_id: user.id,
            images,
            videos,
            caption: pending.caption.clone(),
            likes: 0,
            comments: 0,
            created_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            is_deepfake: pending.verdict.is_deepfake(),
            deepfake_details: pending.verdict.details(),
        };
        self.store.add_post(record.clone())?;
        Ok(record)
    }
}

/// Data URL stored in the post for display.
fn media_source(asset: &MediaAsset) -> String {
    match &asset.payload {
        MediaPayload::DataUrl(url) if url.starts_with("data:") => url.clone(),
        payload => format!("data:{};base64,{}", asset.mime, encode_payload(payload)),
    }
}
