//! Execution callbacks
//!
//! These traits let the executor report progress without depending on a
//! specific terminal UI.

use crate::report::ActionOutcome;
use crate::types::Action;

/// Progress callback for apply operations
///
/// Implement this trait to receive progress updates during execution.
pub trait ProgressCallback {
    /// Called once before the first action
    fn on_start(&mut self, count: usize);

    /// Called when starting to apply a single action
    fn on_action_start(&mut self, action: &Action);

    /// Called when an action completes, successfully or not
    fn on_action_complete(&mut self, action: &Action, outcome: &ActionOutcome);

    /// Called after the last action
    fn on_complete(&mut self);
}

/// No-op progress callback
pub struct NoProgress;

impl ProgressCallback for NoProgress {
    fn on_start(&mut self, _count: usize) {}
    fn on_action_start(&mut self, _action: &Action) {}
    fn on_action_complete(&mut self, _action: &Action, _outcome: &ActionOutcome) {}
    fn on_complete(&mut self) {}
}
