//! Presentation rules for classifier labels.
//!
//! Some model exports ship truncated display names; the mapping here
//! restores the two known ones. Everything else passes through verbatim.

/// Severity tier of a classification outcome, used to color the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Business professional attire
    Favorable,
    /// Business casual attire
    Neutral,
    /// Anything else
    Unfavorable,
}

/// Expand known-truncated label names; unknown labels pass through.
///
/// The match is exact: only the literal truncated forms are rewritten.
pub fn display_label(label: &str) -> &str {
    match label {
        "Business Pro..." => "Business Professional",
        "Business Cas..." => "Business Casual",
        other => other,
    }
}

/// Severity for a label, matched case-insensitively on substrings so it
/// works on both truncated and full names.
pub fn severity_for(label: &str) -> Severity {
    let lower = label.to_lowercase();
    if lower.contains("business pro") {
        Severity::Favorable
    } else if lower.contains("business cas") {
        Severity::Neutral
    } else {
        Severity::Unfavorable
    }
}

/// Confidence percentage for display: probability x 100 at 2 decimals.
pub fn format_confidence(probability: f32) -> String {
    format!("{:.2}", probability * 100.0)
}
