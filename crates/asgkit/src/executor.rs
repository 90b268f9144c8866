//! Remediator - applies a plan against the platform, one action at a time

use crate::context::{NoProgress, ProgressCallback};
use crate::error::{Error, Result};
use crate::platform::Platform;
use crate::reconcile::Plan;
use crate::report::{ActionFailure, ActionOutcome, Report, ReportMode};
use crate::types::{Action, ActionKind};
use std::collections::BTreeSet;
use std::time::Instant;

/// Options for execution
#[derive(Debug, Clone, Copy, Default)]
pub struct ExecuteOptions {
    /// Don't make changes, just report what would happen
    pub dry_run: bool,
}

/// Execute a plan and build the final report
///
/// In dry-run mode the platform is never called. Otherwise actions are
/// applied sequentially in plan order; a failed action is recorded and the
/// remaining actions still run. Nothing is retried or rolled back.
pub fn execute<P>(
    plan: &Plan,
    platform: &dyn Platform,
    opts: ExecuteOptions,
    progress: &mut P,
) -> Report
where
    P: ProgressCallback,
{
    if opts.dry_run {
        return Report::advisory(plan);
    }

    let start = Instant::now();
    let mut report = Report::new(ReportMode::Executing);
    report.protected = plan.protected().iter().cloned().collect();

    // Groups whose create failed; their binds cannot succeed
    let mut not_created: BTreeSet<&str> = BTreeSet::new();

    progress.on_start(plan.len());
    for action in plan.actions() {
        progress.on_action_start(action);

        let failure = if not_created.contains(action.name()) {
            Some(ActionFailure::new(
                action,
                format!("skipped, '{}' could not be created", action.name()),
            ))
        } else {
            apply_action(platform, action).err().map(|err| {
                ActionFailure::from_error(&err)
                    .unwrap_or_else(|| ActionFailure::new(action, err.to_string()))
            })
        };

        let outcome = match failure {
            None => {
                report.record(action);
                ActionOutcome::Applied
            }
            Some(failure) => {
                if action.kind() == ActionKind::Create {
                    not_created.insert(action.name());
                }
                let error = failure.error.clone();
                report.failures.push(failure);
                ActionOutcome::Failed { error }
            }
        };
        progress.on_action_complete(action, &outcome);
    }
    progress.on_complete();

    log::debug!(
        "apply ({:.2}s): {} succeeded, {} failed",
        start.elapsed().as_secs_f64(),
        report.total(),
        report.failures.len()
    );

    report
}

/// Simple execution without progress reporting
pub fn execute_simple(plan: &Plan, platform: &dyn Platform, opts: ExecuteOptions) -> Report {
    execute(plan, platform, opts, &mut NoProgress)
}

/// Invoke the platform mutation for a single action
pub fn apply_action(platform: &dyn Platform, action: &Action) -> Result<()> {
    let name = action.name();
    let result = match action {
        Action::Create { rules, .. } => platform.create_group(name, rules),
        Action::Delete { .. } => platform.delete_group(name),
        Action::BindRunning { .. } => platform.bind_running(name),
        Action::UnbindRunning { .. } => platform.unbind_running(name),
        Action::BindStaging { .. } => platform.bind_staging(name),
        Action::UnbindStaging { .. } => platform.unbind_staging(name),
    };

    result.map_err(|source| Error::PlatformAction {
        action: action.kind(),
        group: name.to_string(),
        source,
    })
}
