// Detection Module
// Client side of the remote deepfake detector, organized into:
// - request: wire body construction (one of `image` / `video`, plain base64)
// - stabilization: 4-decimal confidence rounding and percentage display
// - client: the single-attempt HTTP call and its fallback policy

pub mod client;
pub mod request;
pub mod stabilization;

pub use client::{
    DeepfakeDetector,
    DetectionClient,
    DetectionError,
    DEFAULT_DETECTION_URL,
    DEFAULT_IMAGE_TIMEOUT_SECS,
    DEFAULT_VIDEO_TIMEOUT_SECS,
};
pub use request::{encode_payload, split_data_url, strip_data_url_prefix, DetectionRequest};
pub use stabilization::{
    display_confidence,
    format_confidence,
    stabilize_confidence,
    stabilize_verdict,
};
