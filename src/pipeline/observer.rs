//! Status notification channel between the orchestrator and front ends.

use crate::pipeline::state::{PipelineState, PipelineStatus};

/// Receives every status change, in order, after it has been committed.
///
/// Called from the task driving the run; implementations must be quick and
/// must not call back into the orchestrator.
pub trait StatusObserver: Send + Sync {
    fn on_status(&self, status: &PipelineStatus);
}

impl<F> StatusObserver for F
where
    F: Fn(&PipelineStatus) + Send + Sync,
{
    fn on_status(&self, status: &PipelineStatus) {
        self(status)
    }
}

/// Writes status changes to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl StatusObserver for LogObserver {
    fn on_status(&self, status: &PipelineStatus) {
        let first_line = status.message.lines().next().unwrap_or("");
        match status.state {
            PipelineState::Failed => log::error!("[{}] {}", status.state, first_line),
            _ => log::info!("[{}] {}", status.state, first_line),
        }
    }
}
