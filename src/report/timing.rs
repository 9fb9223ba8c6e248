//! Run timing marks

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use crate::models::{Timing, TimingEntry};

/// An open measurement
#[derive(Debug)]
pub struct TimerMark {
    name: String,
    started: Instant,
}

/// Collects timing entries relative to the start of a run.
///
/// Cloning shares the same entry list so concurrently running audits can
/// record into one timer.
#[derive(Debug, Clone)]
pub struct Timer {
    origin: Instant,
    entries: Arc<Mutex<Vec<TimingEntry>>>,
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

fn millis(duration: std::time::Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}

impl Timer {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            entries: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn start(&self, name: impl Into<String>) -> TimerMark {
        TimerMark {
            name: name.into(),
            started: Instant::now(),
        }
    }

    pub fn end(&self, mark: TimerMark) {
        let entry = TimingEntry {
            start_time: millis(mark.started.duration_since(self.origin)),
            duration: millis(mark.started.elapsed()),
            name: mark.name,
        };
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry);
    }

    /// Entries sorted by start time plus the total elapsed time
    pub fn finish(&self) -> Timing {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        entries.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));
        Timing {
            entries,
            total: millis(self.origin.elapsed()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marks_are_recorded_in_start_order() {
        let timer = Timer::new();
        let outer = timer.start("run");
        std::thread::sleep(std::time::Duration::from_millis(2));
        let inner = timer.start("audit:viewport");
        timer.end(inner);
        timer.end(outer);

        let timing = timer.finish();
        let names: Vec<&str> = timing.entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["run", "audit:viewport"]);
        assert!(timing.total >= timing.entries[0].duration);
    }

    #[test]
    fn test_clones_share_entries() {
        let timer = Timer::new();
        let clone = timer.clone();
        clone.end(clone.start("a"));
        assert_eq!(timer.finish().entries.len(), 1);
    }
}
