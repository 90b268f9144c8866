//! Structured reconciliation report
//!
//! The report is keyed by action kind in both modes, so a caller can ask
//! "was kind K needed (or performed), and for which groups" directly.
//! Serialized shape:
//!
//! ```json
//! {
//!   "mode": "advising",
//!   "actions": { "bind_running": ["g1"], "delete": ["g2"] },
//!   "protected": ["g3"]
//! }
//! ```

use crate::error::Error;
use crate::reconcile::Plan;
use crate::types::{Action, ActionKind, GroupName};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Whether the report describes planned or performed actions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportMode {
    /// Dry run: actions are what would be done
    #[default]
    Advising,
    /// Apply: actions are what was done
    Executing,
}

/// Result of applying a single action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionOutcome {
    Applied,
    Failed { error: String },
}

impl ActionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Applied)
    }
}

/// A failed action, as surfaced in the report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionFailure {
    pub action: ActionKind,
    pub group: GroupName,
    pub error: String,
}

impl ActionFailure {
    pub fn new(action: &Action, error: impl Into<String>) -> Self {
        Self {
            action: action.kind(),
            group: action.name().to_string(),
            error: error.into(),
        }
    }

    /// Failure entry for a per-action error; other errors have none
    pub fn from_error(error: &Error) -> Option<Self> {
        match error {
            Error::PlatformAction {
                action,
                group,
                source,
            } => Some(Self {
                action: *action,
                group: group.clone(),
                error: source.to_string(),
            }),
            _ => None,
        }
    }
}

/// Final reconciliation result
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub mode: ReportMode,
    /// Names per action kind; absent kinds were not needed
    #[serde(default)]
    pub actions: BTreeMap<ActionKind, Vec<GroupName>>,
    /// Undeclared groups kept because of org/space bindings
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub protected: Vec<GroupName>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<ActionFailure>,
}

impl Report {
    pub fn new(mode: ReportMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    /// Report of what a plan would do, without touching the platform
    pub fn advisory(plan: &Plan) -> Self {
        let mut report = Self::new(ReportMode::Advising);
        for action in plan.actions() {
            report.record(action);
        }
        report.protected = plan.protected().iter().cloned().collect();
        report
    }

    /// Record a planned or successfully applied action
    pub fn record(&mut self, action: &Action) {
        self.actions
            .entry(action.kind())
            .or_default()
            .push(action.name().to_string());
    }

    /// Record a failed action
    pub fn record_failure(&mut self, action: &Action, error: impl Into<String>) {
        self.failures.push(ActionFailure::new(action, error));
    }

    /// Names affected by a kind of action
    pub fn names(&self, kind: ActionKind) -> &[GroupName] {
        self.actions.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Check if any action of this kind was needed or performed
    pub fn has(&self, kind: ActionKind) -> bool {
        !self.names(kind).is_empty()
    }

    /// Total number of recorded (non-failed) actions
    pub fn total(&self) -> usize {
        self.actions.values().map(Vec::len).sum()
    }

    /// Check if there were no actions and no failures
    pub fn is_empty(&self) -> bool {
        self.total() == 0 && self.failures.is_empty()
    }

    /// Check if no action failed
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Pretty JSON; kinds appear in a fixed order
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
