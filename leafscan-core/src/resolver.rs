//! Detector label resolution
//!
//! Maps a free-form detector class label onto a knowledge-base profile with a
//! best-effort containment heuristic:
//!
//! 1. normalize the label (lowercase, spaces and hyphens become `_`)
//! 2. a canonical key contained in the label, or the label contained in a key
//! 3. the first `_`-separated token of a key contained in the label
//! 4. the unknown profile, renamed to the raw label
//!
//! Canonical keys are tried in catalog order at every step and the first hit
//! wins, so a label naming two diseases resolves to whichever comes first.

use crate::disease::DiseaseProfile;
use crate::knowledge::{canonical_profiles, unknown_profile};
use tracing::debug;

/// Lowercase the label and unify separators to `_`
pub fn normalize_label(label: &str) -> String {
    label.to_lowercase().replace([' ', '-'], "_")
}

/// Resolve a detector label to a profile. Never fails.
pub fn resolve(label: &str) -> DiseaseProfile {
    let normalized = normalize_label(label);

    if let Some(profile) = canonical_profiles()
        .find(|p| normalized.contains(p.key) || p.key.contains(normalized.as_str()))
    {
        return profile.clone();
    }

    if let Some(profile) = canonical_profiles().find(|p| {
        let first_token = p.key.split('_').next().unwrap_or(p.key);
        normalized.contains(first_token)
    }) {
        return profile.clone();
    }

    debug!("Label {:?} matched no known disease", label);
    unknown_profile().renamed(label)
}
