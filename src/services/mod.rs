// SnapBloom Core Services
// Media-upload moderation pipeline and its collaborators

pub mod config_store;
pub mod detection;
pub mod media_intake;
pub mod notices;
pub mod record_store;
pub mod workflow;

pub use config_store::*;
pub use media_intake::{IntakeError, MediaIntake, Selection};
pub use notices::{drain_notices, notice_channel, Notice, NoticeReceiver, NoticeSender};
pub use record_store::{Collection, RecordStore, StoreError};

// Re-export the pipeline entry points
pub use detection::{
    DeepfakeDetector,
    DetectionClient,
    DetectionError,
    DetectionRequest,
};
pub use workflow::{
    render,
    transition,
    ModerationSession,
    SessionError,
    VerdictOutcome,
    WorkflowEvent,
    WorkflowState,
};
