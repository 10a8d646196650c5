//! Guardrail evaluator: named boolean checks derived from the composite
//! score.
//!
//! These are independent threshold comparisons, not a weighted aggregate;
//! each flag is a distinct caller-visible reason for rejection. Recomputed
//! synchronously wherever a score is read, never cached across parameter
//! changes.

use serde::Serialize;

pub const CONTENT_SAFETY_MIN: u8 = 70;
pub const BIAS_DETECTION_MIN: u8 = 60;
pub const QUALITY_THRESHOLD_MIN: u8 = 80;
pub const COHERENCE_CHECK_MIN: u8 = 75;
pub const CONTEXT_ALIGNMENT_MIN: u8 = 65;

/// Fixed record of guardrail flags for one scored parameter set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GuardrailState {
    pub content_safety: bool,
    pub bias_detection: bool,
    pub quality_threshold: bool,
    pub coherence_check: bool,
    pub context_alignment: bool,
}

/// Derive guardrail flags from a score and module selection. Pure function;
/// `context_alignment` is false whenever no module is selected, regardless of
/// score.
pub fn evaluate(score: u8, module_selected: bool) -> GuardrailState {
    GuardrailState {
        content_safety: score >= CONTENT_SAFETY_MIN,
        bias_detection: score >= BIAS_DETECTION_MIN,
        quality_threshold: score >= QUALITY_THRESHOLD_MIN,
        coherence_check: score >= COHERENCE_CHECK_MIN,
        context_alignment: module_selected && score >= CONTEXT_ALIGNMENT_MIN,
    }
}

impl GuardrailState {
    pub fn all_passing(&self) -> bool {
        self.content_safety
            && self.bias_detection
            && self.quality_threshold
            && self.coherence_check
            && self.context_alignment
    }

    /// Names of failing checks, in declaration order.
    pub fn failing(&self) -> Vec<&'static str> {
        let mut out = Vec::new();
        if !self.content_safety {
            out.push("content_safety");
        }
        if !self.bias_detection {
            out.push("bias_detection");
        }
        if !self.quality_threshold {
            out.push("quality_threshold");
        }
        if !self.coherence_check {
            out.push("coherence_check");
        }
        if !self.context_alignment {
            out.push("context_alignment");
        }
        out
    }
}
