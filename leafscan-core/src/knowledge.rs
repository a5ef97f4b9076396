//! Static apple-leaf disease knowledge base
//!
//! The catalog is fixed at compile time. Enumeration order matters: the label
//! resolver walks canonical keys in this order and the first match wins.

use crate::disease::{DiseaseProfile, SeverityTier};
use std::borrow::Cow;

/// Key of the fallback profile for labels that match nothing
pub const UNKNOWN_KEY: &str = "unknown";

static CATALOG: [DiseaseProfile; 5] = [
    DiseaseProfile {
        key: "apple_scab",
        display_name: Cow::Borrowed("Apple Scab"),
        severity_tier: SeverityTier::Moderate,
        severity_score: 6,
        accent_color: "#8B6914",
        background_color: "rgba(139,105,20,0.12)",
        icon: "🟤",
        description: "Caused by the fungus Venturia inaequalis. Appears as olive-green to brown velvety spots on leaves.",
        symptoms: &[
            "Olive-green or brown velvety lesions",
            "Yellowing around infected areas",
            "Premature leaf drop",
            "Distorted leaves",
        ],
        treatments: &[
            "Apply fungicide (Captan, Mancozeb) at bud break",
            "Remove and destroy infected leaves",
            "Prune for better air circulation",
            "Apply dormant oil spray in early spring",
        ],
        preventions: &[
            "Plant resistant varieties",
            "Avoid overhead irrigation",
            "Rake and destroy fallen leaves",
            "Apply lime sulfur before bud break",
        ],
    },
    DiseaseProfile {
        key: "black_rot",
        display_name: Cow::Borrowed("Black Rot"),
        severity_tier: SeverityTier::Severe,
        severity_score: 9,
        accent_color: "#c0392b",
        background_color: "rgba(192,57,43,0.12)",
        icon: "🔴",
        description: "Caused by Botryosphaeria obtusa. Produces circular lesions with purple margins that turn brown-black.",
        symptoms: &[
            "Circular lesions with purple margins",
            "Brown-black center with concentric rings",
            "Frog-eye appearance",
            "Cankers on branches",
        ],
        treatments: &[
            "Remove and destroy infected plant parts",
            "Apply copper-based fungicide",
            "Prune cankers 15cm beyond visible infection",
            "Bordeaux mixture applications",
        ],
        preventions: &[
            "Remove mummified fruits and dead wood",
            "Maintain tree vigor through fertilization",
            "Avoid wounding bark",
            "Proper spacing for air circulation",
        ],
    },
    DiseaseProfile {
        key: "cedar_apple_rust",
        display_name: Cow::Borrowed("Cedar Apple Rust"),
        severity_tier: SeverityTier::High,
        severity_score: 7,
        accent_color: "#e67e22",
        background_color: "rgba(230,126,34,0.12)",
        icon: "🟠",
        description: "Caused by Gymnosporangium juniperi-virginianae. Requires both cedar/juniper and apple as alternate hosts.",
        symptoms: &[
            "Bright orange-yellow spots on upper leaf surface",
            "Tube-like structures on leaf undersides",
            "Premature defoliation",
            "Fruit deformation",
        ],
        treatments: &[
            "Apply myclobutanil or triadimefon fungicide",
            "Start treatments at pink bud stage",
            "Repeat every 7–10 days during wet spring",
            "Remove nearby juniper/cedar if possible",
        ],
        preventions: &[
            "Plant resistant apple varieties",
            "Remove nearby juniper galls in winter",
            "Avoid planting apple near cedar trees",
            "Apply protective fungicides in spring",
        ],
    },
    DiseaseProfile {
        key: "healthy",
        display_name: Cow::Borrowed("Healthy Leaf"),
        severity_tier: SeverityTier::None,
        severity_score: 0,
        accent_color: "#27ae60",
        background_color: "rgba(39,174,96,0.12)",
        icon: "🟢",
        description: "The leaf shows no signs of disease. Continue regular monitoring and preventive care.",
        symptoms: &[
            "No visible lesions",
            "Uniform green color",
            "Normal leaf structure",
            "Healthy veination",
        ],
        treatments: &[
            "No treatment required",
            "Maintain regular watering schedule",
            "Continue balanced fertilization",
            "Monitor periodically",
        ],
        preventions: &[
            "Regular scouting every 7–10 days",
            "Maintain tree health with proper nutrition",
            "Ensure good air circulation",
            "Remove fallen leaves in autumn",
        ],
    },
    DiseaseProfile {
        key: UNKNOWN_KEY,
        display_name: Cow::Borrowed("Unknown Class"),
        severity_tier: SeverityTier::Unknown,
        severity_score: 5,
        accent_color: "#7f8c8d",
        background_color: "rgba(127,140,141,0.12)",
        icon: "⚪",
        description: "The model has detected an object with a custom class label from your training data.",
        symptoms: &["Refer to your dataset labels"],
        treatments: &["Refer to domain-specific guidance"],
        preventions: &["Monitor regularly"],
    },
];

/// Look up a profile by its canonical key. Absence is a normal outcome.
pub fn lookup(key: &str) -> Option<&'static DiseaseProfile> {
    CATALOG.iter().find(|profile| profile.key == key)
}

/// Canonical disease profiles in enumeration order, excluding the fallback
pub fn canonical_profiles() -> impl Iterator<Item = &'static DiseaseProfile> {
    CATALOG.iter().filter(|profile| profile.key != UNKNOWN_KEY)
}

/// Every profile in the catalog, fallback last
pub fn all_profiles() -> &'static [DiseaseProfile] {
    &CATALOG
}

/// The designated fallback profile
pub fn unknown_profile() -> &'static DiseaseProfile {
    // The fallback is the last catalog entry.
    &CATALOG[CATALOG.len() - 1]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_returns_matching_key() {
        for profile in all_profiles() {
            let found = lookup(profile.key).expect("catalog key must resolve");
            assert_eq!(found.key, profile.key);
        }
    }

    #[test]
    fn test_lookup_absent_key() {
        assert!(lookup("powdery_mildew").is_none());
        assert!(lookup("").is_none());
    }

    #[test]
    fn test_canonical_profiles_exclude_unknown() {
        let keys: Vec<&str> = canonical_profiles().map(|p| p.key).collect();
        assert_eq!(keys, vec!["apple_scab", "black_rot", "cedar_apple_rust", "healthy"]);
    }

    #[test]
    fn test_unknown_profile() {
        let unknown = unknown_profile();
        assert_eq!(unknown.key, UNKNOWN_KEY);
        assert_eq!(unknown.severity_tier, SeverityTier::Unknown);
        assert_eq!(unknown.display_name, "Unknown Class");
    }

    #[test]
    fn test_keys_are_unique() {
        let mut keys: Vec<&str> = all_profiles().iter().map(|p| p.key).collect();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), all_profiles().len());
    }

    #[test]
    fn test_severity_scores_in_range() {
        for profile in all_profiles() {
            assert!(profile.severity_score <= 10, "{} out of range", profile.key);
        }
    }
}
