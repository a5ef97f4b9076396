//! Session history ledger
//!
//! Bounded, newest-first log of detection events for one session. Each session
//! owns its own ledger; there is no shared state and no locking.

use crate::detection::EnrichedDetection;
use crate::error::Result;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use tracing::debug;

/// Maximum number of entries retained by default
pub const DEFAULT_HISTORY_CAPACITY: usize = 100;

/// Where a detection came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectionSource {
    Upload,
    Camera,
}

impl fmt::Display for DetectionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DetectionSource::Upload => f.write_str("upload"),
            DetectionSource::Camera => f.write_str("camera"),
        }
    }
}

/// One logged detection
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub timestamp: DateTime<Local>,
    pub disease: String,
    pub confidence: f32,
    pub icon: String,
    pub source: DetectionSource,
}

impl HistoryEntry {
    fn from_detection(detection: &EnrichedDetection, source: DetectionSource, timestamp: DateTime<Local>) -> Self {
        Self {
            timestamp,
            disease: detection.display_name().to_string(),
            confidence: detection.confidence,
            icon: detection.profile.icon.to_string(),
            source,
        }
    }

    /// Snapshot in export form
    pub fn to_record(&self) -> HistoryRecord {
        HistoryRecord {
            time: self.timestamp.format("%H:%M:%S").to_string(),
            disease: self.disease.clone(),
            conf: self.confidence,
            icon: self.icon.clone(),
            source: self.source,
        }
    }
}

/// Export row: `{time, disease, conf, icon, source}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub time: String,
    pub disease: String,
    pub conf: f32,
    pub icon: String,
    pub source: DetectionSource,
}

/// Per-disease row of the summary panel
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiseaseStats {
    pub disease: String,
    pub count: usize,
    pub mean_confidence: f32,
    /// Fraction of all entries, 0.0..=1.0
    pub share: f32,
}

/// Aggregate statistics over the ledger, grouped by display name
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HistorySummary {
    pub total_count: usize,
    pub distinct_disease_count: usize,
    pub count_by_disease: BTreeMap<String, usize>,
    pub mean_confidence_by_disease: BTreeMap<String, f32>,
}

impl HistorySummary {
    /// Rows sorted by count (descending), then name
    pub fn ranked(&self) -> Vec<DiseaseStats> {
        let mut rows: Vec<DiseaseStats> = self
            .count_by_disease
            .iter()
            .map(|(disease, &count)| DiseaseStats {
                disease: disease.clone(),
                count,
                mean_confidence: self.mean_confidence_by_disease.get(disease).copied().unwrap_or(0.0),
                share: if self.total_count == 0 {
                    0.0
                } else {
                    count as f32 / self.total_count as f32
                },
            })
            .collect();
        rows.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.disease.cmp(&b.disease)));
        rows
    }
}

/// Bounded newest-first detection log
#[derive(Debug, Clone)]
pub struct HistoryLedger {
    entries: VecDeque<HistoryEntry>,
    capacity: usize,
}

impl Default for HistoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl HistoryLedger {
    /// Create a ledger holding at most 100 entries
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_CAPACITY)
    }

    /// Create a ledger with a custom cap (at least 1)
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Record detections stamped with the current local time
    pub fn record(&mut self, detections: &[EnrichedDetection], source: DetectionSource) {
        self.record_at(detections, source, Local::now());
    }

    /// Record detections with an explicit timestamp.
    ///
    /// Each detection is inserted at the front in input order, so the last
    /// detection of the batch ends up newest. The ledger is truncated to its
    /// capacity after the whole batch is inserted.
    pub fn record_at(&mut self, detections: &[EnrichedDetection], source: DetectionSource, timestamp: DateTime<Local>) {
        for detection in detections {
            self.entries
                .push_front(HistoryEntry::from_detection(detection, source, timestamp));
        }
        if self.entries.len() > self.capacity {
            let dropped = self.entries.len() - self.capacity;
            self.entries.truncate(self.capacity);
            debug!("History ledger dropped {} oldest entries", dropped);
        }
    }

    /// Remove every entry
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Entries, newest first
    pub fn entries(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    pub fn newest(&self) -> Option<&HistoryEntry> {
        self.entries.front()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Counts and mean confidence per display name
    pub fn summarize(&self) -> HistorySummary {
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        let mut sums: BTreeMap<String, f64> = BTreeMap::new();

        for entry in &self.entries {
            *counts.entry(entry.disease.clone()).or_insert(0) += 1;
            *sums.entry(entry.disease.clone()).or_insert(0.0) += entry.confidence as f64;
        }

        let mean_confidence_by_disease = sums
            .into_iter()
            .map(|(disease, sum)| {
                let count = counts.get(&disease).copied().unwrap_or(1) as f64;
                (disease, (sum / count) as f32)
            })
            .collect();

        HistorySummary {
            total_count: self.entries.len(),
            distinct_disease_count: counts.len(),
            count_by_disease: counts,
            mean_confidence_by_disease,
        }
    }

    /// Snapshot of all entries in newest-first order
    pub fn export(&self) -> Vec<HistoryRecord> {
        self.entries.iter().map(HistoryEntry::to_record).collect()
    }

    /// Snapshot rendered as pretty-printed JSON
    pub fn export_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.export())?)
    }
}
