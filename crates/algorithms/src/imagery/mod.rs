//! Radar imagery change detection
//!
//! - Stack summary: per-location mean / std-dev / count of an observation stack
//! - Change detection: Welch t-test score, damage threshold, structure masking
//! - Severity: presentation buckets and legend for damage scores

mod change_detection;
mod severity;
mod stack_summary;

pub use change_detection::{
    damage_mask, detect_damage, welch_change_score, welch_t, ChangeDetectionParams,
    ChangeDetectionResult, WelchChangeDetection, DAMAGE_THRESHOLD, STRUCTURE,
};
pub use severity::{classify_severity, severity_counts, DamageSeverity, SeverityCounts, DISPLAY_RANGE};
pub use stack_summary::summarize_stack;
