//! leafscan-core: apple-leaf disease knowledge and session bookkeeping
//!
//! Holds the static disease catalog, the detector-label resolver, the
//! detection records passed between pipeline stages, and the per-session
//! history ledger. Nothing here performs I/O beyond reading a config file.

pub mod config;
pub mod debounce;
pub mod detection;
pub mod disease;
pub mod error;
pub mod history;
pub mod knowledge;
pub mod resolver;

pub use config::{BoxColor, DetectionSettings, LeafScanConfig, Rgb};
pub use debounce::Debouncer;
pub use detection::{BoundingBox, ClassNames, EnrichedDetection, RawDetection};
pub use disease::{DiseaseProfile, SeverityTier};
pub use error::{Error, Result};
pub use history::{DetectionSource, HistoryEntry, HistoryLedger, HistoryRecord, HistorySummary};
pub use resolver::resolve;
