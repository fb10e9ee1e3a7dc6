use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Pipeline phases, reported in this order over the course of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Phase1,
    Phase2,
    Phase3,
    Phase4,
    Phase5,
    Completed,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Phase1 => "phase1",
            Phase::Phase2 => "phase2",
            Phase::Phase3 => "phase3",
            Phase::Phase4 => "phase4",
            Phase::Phase5 => "phase5",
            Phase::Completed => "completed",
        }
    }
}

/// A single progress record delivered to the status sink.
#[derive(Debug, Clone, Serialize)]
pub struct StatusUpdate {
    pub phase: Phase,
    pub progress_percent: f64,
    pub message: String,
    pub current_item: usize,
    pub total_items: usize,
    pub detail_message: String,
}

/// Sink for progress records emitted by a running scan.
///
/// The CLI implements this with a progress bar; embedders can forward the
/// records wherever they like. The default implementation discards them.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, _update: &StatusUpdate) {}
}

/// No-op reporter for silent operation.
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {}

/// Wraps a reporter with a high-water mark so concurrent workers emitting
/// counter-derived percentages can never make the bar move backwards.
pub(crate) struct StatusTracker<'a> {
    reporter: &'a dyn ProgressReporter,
    // percent scaled by 100 so it fits an atomic
    high_water: AtomicU64,
}

impl<'a> StatusTracker<'a> {
    pub(crate) fn new(reporter: &'a dyn ProgressReporter) -> Self {
        Self {
            reporter,
            high_water: AtomicU64::new(0),
        }
    }

    pub(crate) fn update(
        &self,
        phase: Phase,
        progress_percent: f64,
        message: &str,
        current_item: usize,
        total_items: usize,
        detail_message: &str,
    ) {
        let clamped = progress_percent.clamp(0.0, 100.0);
        let scaled = (clamped * 100.0) as u64;

        let mut prev = self.high_water.load(Ordering::Relaxed);
        loop {
            if scaled < prev {
                return;
            }
            match self.high_water.compare_exchange_weak(
                prev,
                scaled,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(observed) => prev = observed,
            }
        }

        self.reporter.report(&StatusUpdate {
            phase,
            progress_percent: clamped,
            message: message.to_string(),
            current_item,
            total_items,
            detail_message: detail_message.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct RecordingReporter {
        percents: Mutex<Vec<f64>>,
    }

    impl ProgressReporter for RecordingReporter {
        fn report(&self, update: &StatusUpdate) {
            self.percents.lock().unwrap().push(update.progress_percent);
        }
    }

    #[test]
    fn regressing_updates_are_dropped() {
        let reporter = RecordingReporter {
            percents: Mutex::new(Vec::new()),
        };
        let tracker = StatusTracker::new(&reporter);

        tracker.update(Phase::Phase1, 10.0, "a", 0, 0, "");
        tracker.update(Phase::Phase1, 5.0, "b", 0, 0, "");
        tracker.update(Phase::Phase1, 10.0, "c", 0, 0, "");
        tracker.update(Phase::Phase2, 25.0, "d", 0, 0, "");

        let seen = reporter.percents.lock().unwrap().clone();
        assert_eq!(seen, vec![10.0, 10.0, 25.0]);
    }

    #[test]
    fn phase_names_match_the_wire_format() {
        assert_eq!(Phase::Phase1.as_str(), "phase1");
        assert_eq!(Phase::Completed.as_str(), "completed");
        let json = serde_json::to_string(&Phase::Phase3).unwrap();
        assert_eq!(json, "\"phase3\"");
    }
}
