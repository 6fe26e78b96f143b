// Confidence Stabilization
// Fixed-precision rounding applied at the client boundary, plus the
// percentage form the UI renders from it

use crate::models::{DetectionVerdict, SubVerdict};

/// Number of decimal places kept on every confidence value.
pub const CONFIDENCE_DECIMALS: i32 = 4;

/// Round a confidence to 4 decimal places. Idempotent: applying it to its own
/// output returns the same value.
pub fn stabilize_confidence(raw: f64) -> f64 {
    let scale = 10f64.powi(CONFIDENCE_DECIMALS);
    (raw * scale).round() / scale
}

/// Percentage shown to the user, with 2 decimal places (`0.8734` -> `87.34`).
pub fn display_confidence(confidence: f64) -> f64 {
    (confidence * 10_000.0).round() / 100.0
}

/// `87.34%`, `50%`; trailing zeros are not printed.
pub fn format_confidence(confidence: f64) -> String {
    format!("{}%", display_confidence(confidence))
}

fn stabilize_sub(sub: Option<SubVerdict>) -> Option<SubVerdict> {
    sub.map(|s| SubVerdict {
        is_deepfake: s.is_deepfake,
        confidence: stabilize_confidence(s.confidence),
    })
}

/// Stabilize every confidence carried by a verdict.
pub fn stabilize_verdict(verdict: DetectionVerdict) -> DetectionVerdict {
    match verdict {
        DetectionVerdict::Image {
            is_deepfake,
            confidence,
        } => DetectionVerdict::Image {
            is_deepfake,
            confidence: stabilize_confidence(confidence),
        },
        DetectionVerdict::Video(mut v) => {
            v.confidence = stabilize_confidence(v.confidence);
            v.visual = stabilize_sub(v.visual);
            v.audio = stabilize_sub(v.audio);
            DetectionVerdict::Video(v)
        }
    }
}
