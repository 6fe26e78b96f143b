// Moderation Workflow
// Sequences intake -> analysis -> verdict -> (override) -> publish:
// - state_machine: pure transitions and the effects they request
// - affordance: what the UI shows in each state
// - session: async driver owning the current asset and verdict

pub mod affordance;
pub mod session;
pub mod state_machine;

pub use affordance::{render, Affordance, Badge, DeepfakeDialog, View};
pub use session::{ModerationSession, SessionError, VerdictOutcome};
pub use state_machine::{
    transition,
    DiscardReason,
    Effect,
    PendingPost,
    Step,
    WorkflowEvent,
    WorkflowState,
};
