//! Deterministic debounce for continuous-capture logging
//!
//! A camera streams the same leaf frame after frame, often with several
//! diseases in view at once. A detection is logged when its disease was not
//! present in the previous frame, or when that disease has not been logged
//! for at least the configured window. Each disease is logged at most once
//! per frame.

use crate::detection::EnrichedDetection;
use chrono::{DateTime, Local};
use std::collections::{HashMap, HashSet};
use std::time::Duration;

/// Default quiet period per disease
pub const DEFAULT_DEBOUNCE_WINDOW: Duration = Duration::from_secs(3);

#[derive(Debug, Clone)]
pub struct Debouncer {
    window: Duration,
    last_logged: HashMap<String, DateTime<Local>>,
    previous_frame: HashSet<String>,
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE_WINDOW)
    }
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_logged: HashMap::new(),
            previous_frame: HashSet::new(),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Number of diseases whose quiet period is still running
    pub fn tracked(&self) -> usize {
        self.last_logged.len()
    }

    /// Detections from one frame that should reach the ledger, in input order
    pub fn filter(&mut self, detections: &[EnrichedDetection], now: DateTime<Local>) -> Vec<EnrichedDetection> {
        // Expired timings behave exactly like absent ones
        let window = self.window;
        self.last_logged.retain(|_, last| !window_elapsed(window, *last, now));

        let mut current_frame = HashSet::new();
        let mut accepted = Vec::new();

        for detection in detections {
            let disease = detection.display_name();
            if !current_frame.insert(disease.to_string()) {
                continue;
            }

            let appeared = !self.previous_frame.contains(disease);
            let quiet = !self.last_logged.contains_key(disease);

            if appeared || quiet {
                self.last_logged.insert(disease.to_string(), now);
                accepted.push(detection.clone());
            }
        }

        self.previous_frame = current_frame;
        accepted
    }

    /// Forget all timing state, e.g. after the ledger is cleared
    pub fn reset(&mut self) {
        self.last_logged.clear();
        self.previous_frame.clear();
    }
}

/// A clock stepping backwards never counts as elapsed
fn window_elapsed(window: Duration, last: DateTime<Local>, now: DateTime<Local>) -> bool {
    (now - last)
        .to_std()
        .map(|elapsed| elapsed >= window)
        .unwrap_or(false)
}
