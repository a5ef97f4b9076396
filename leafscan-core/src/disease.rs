//! Disease profile types

use serde::Serialize;
use std::borrow::Cow;
use std::fmt;

/// Coarse human-facing severity category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SeverityTier {
    None,
    Moderate,
    High,
    Severe,
    Unknown,
}

impl SeverityTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            SeverityTier::None => "None",
            SeverityTier::Moderate => "Moderate",
            SeverityTier::High => "High",
            SeverityTier::Severe => "Severe",
            SeverityTier::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for SeverityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Descriptive metadata for one canonical disease key.
///
/// Catalog entries are `'static`; the only owned variant is the unknown
/// fallback produced by the resolver, whose display name carries the
/// detector's raw label.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiseaseProfile {
    pub key: &'static str,
    pub display_name: Cow<'static, str>,
    pub severity_tier: SeverityTier,
    /// 0 (harmless) to 10 (devastating); display only
    pub severity_score: u8,
    /// Hex accent, e.g. `#c0392b`
    pub accent_color: &'static str,
    /// Translucent accent used behind confidence pills
    pub background_color: &'static str,
    pub icon: &'static str,
    pub description: &'static str,
    pub symptoms: &'static [&'static str],
    pub treatments: &'static [&'static str],
    pub preventions: &'static [&'static str],
}

impl DiseaseProfile {
    /// Copy of this profile with a different display name
    pub fn renamed(&self, display_name: impl Into<String>) -> Self {
        Self {
            display_name: Cow::Owned(display_name.into()),
            ..self.clone()
        }
    }

    /// Severity score as a percentage, for severity bars
    pub fn severity_percent(&self) -> u8 {
        self.severity_score.min(10) * 10
    }
}
