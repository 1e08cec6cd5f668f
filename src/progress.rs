//! Cosmetic progress sequence shown while a generation request is in flight.
//!
//! The ticker has no link to the backend call: it advances on its own clock
//! and only stops when its owner drops or stops the [`ProgressHandle`].

use std::{sync::Arc, time::Duration};

use tokio::{task::JoinHandle, time::MissedTickBehavior};
use tracing::debug;

use crate::models::GenerationProgress;

pub struct ProgressStep {
    pub percent: u8,
    pub message: &'static str,
}

pub const PROGRESS_STEPS: [ProgressStep; 5] = [
    ProgressStep { percent: 20, message: "Analyzing your requirements..." },
    ProgressStep { percent: 40, message: "Selecting optimal template..." },
    ProgressStep { percent: 60, message: "Generating custom content..." },
    ProgressStep { percent: 80, message: "Applying your brand colors..." },
    ProgressStep { percent: 100, message: "Finalizing your website..." },
];

pub type ProgressSink = Arc<dyn Fn(GenerationProgress) + Send + Sync>;

#[derive(Debug, Clone)]
pub struct ProgressSimulator {
    interval: Duration,
}

impl ProgressSimulator {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    /// Emits step 1 right away, then one step per interval until all five are out.
    pub fn start(&self, sink: ProgressSink) -> ProgressHandle {
        let interval = self.interval;
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // A stalled runtime shifts the remaining steps instead of bursting them.
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            for (index, step) in PROGRESS_STEPS.iter().enumerate() {
                ticker.tick().await;
                sink(GenerationProgress {
                    step_index: index + 1,
                    message: step.message.to_string(),
                    percent: step.percent,
                });
            }
            debug!("progress sequence complete");
        });
        ProgressHandle { task: Some(task) }
    }
}

/// Owning handle for a running ticker. Dropping it cancels the ticker.
pub struct ProgressHandle {
    task: Option<JoinHandle<()>>,
}

impl ProgressHandle {
    pub fn stop(mut self) {
        self.cancel();
    }

    fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            if !task.is_finished() {
                debug!("stopping progress ticker");
            }
            task.abort();
        }
    }
}

impl Drop for ProgressHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}
