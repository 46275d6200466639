//! Advisory status messages shown while an analysis is running.
//!
//! Messages carry no control-flow meaning. Every timer is owned by a
//! [`StatusTicker`]; cancelling or dropping the ticker aborts whatever has not
//! fired yet.

use std::{sync::Arc, time::Duration};

use tokio::task::JoinHandle;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvisoryStatus {
    /// Loading epoch the message belongs to.
    pub epoch: u64,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusSchedule {
    entries: Vec<(Duration, String)>,
}

impl Default for StatusSchedule {
    fn default() -> Self {
        Self::new([
            (Duration::ZERO, "Analyzing your resume"),
            (
                Duration::from_secs(4),
                "Comparing your experience against the job requirements",
            ),
            (Duration::from_secs(12), "Scoring the match"),
            (Duration::from_secs(25), "Drafting improvement suggestions"),
            (Duration::from_secs(45), "Generating your improved resume"),
        ])
    }
}

impl StatusSchedule {
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (Duration, S)>,
        S: Into<String>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|(delay, message)| (delay, message.into()))
                .collect(),
        }
    }

    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn entries(&self) -> &[(Duration, String)] {
        &self.entries
    }
}

/// A set of pending advisory timers. Must be started from within a tokio
/// runtime.
pub struct StatusTicker {
    epoch: u64,
    timers: Vec<JoinHandle<()>>,
}

impl StatusTicker {
    pub fn start<F>(schedule: &StatusSchedule, epoch: u64, sink: F) -> Self
    where
        F: Fn(AdvisoryStatus) + Send + Sync + 'static,
    {
        let sink = Arc::new(sink);
        let timers = schedule
            .entries()
            .iter()
            .cloned()
            .map(|(delay, message)| {
                let sink = Arc::clone(&sink);
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    sink(AdvisoryStatus { epoch, message });
                })
            })
            .collect();

        Self { epoch, timers }
    }

    /// Number of timers that have neither fired nor been cancelled.
    pub fn pending(&self) -> usize {
        self.timers.iter().filter(|timer| !timer.is_finished()).count()
    }

    pub fn cancel(&mut self) {
        if self.timers.is_empty() {
            return;
        }
        let pending = self.pending();
        for timer in self.timers.drain(..) {
            timer.abort();
        }
        debug!(epoch = self.epoch, pending, "status: cancelled advisory timers");
    }
}

impl Drop for StatusTicker {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
#[path = "tests/status_tests.rs"]
mod tests;
