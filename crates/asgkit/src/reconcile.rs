//! Reconciliation engine - computes the remediation plan.
//!
//! Pure with respect to the platform: the only call made is the lazy
//! scoped-association check for deletion candidates. Nothing is mutated.

use crate::error::{Error, Result};
use crate::platform::{Platform, PlatformResult};
use crate::types::{Action, ActionKind, DesiredState, Disposition, GroupName, LiveInventory};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

/// Ordered remediation actions plus the per-name classification
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Plan {
    actions: Vec<Action>,
    protected: BTreeSet<GroupName>,
    dispositions: BTreeMap<GroupName, BTreeSet<Disposition>>,
}

impl Plan {
    /// Actions in apply order
    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    /// Undeclared groups kept because they have an org/space association
    pub fn protected(&self) -> &BTreeSet<GroupName> {
        &self.protected
    }

    pub fn dispositions(&self) -> &BTreeMap<GroupName, BTreeSet<Disposition>> {
        &self.dispositions
    }

    pub fn disposition(&self, name: &str) -> Option<&BTreeSet<Disposition>> {
        self.dispositions.get(name)
    }

    /// Check if there is nothing to do
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Affected names per action kind, in plan order
    pub fn by_kind(&self) -> BTreeMap<ActionKind, Vec<&str>> {
        let mut groups: BTreeMap<ActionKind, Vec<&str>> = BTreeMap::new();
        for action in &self.actions {
            groups.entry(action.kind()).or_default().push(action.name());
        }
        groups
    }

    pub fn summary(&self) -> PlanSummary {
        PlanSummary::from_plan(self)
    }

    /// The inventory that results from applying every action to `live`
    pub fn simulate(&self, live: &LiveInventory) -> LiveInventory {
        let mut next = live.clone();
        for action in &self.actions {
            let name = action.name().to_string();
            match action {
                Action::Create { .. } => {
                    next.all_names.insert(name);
                }
                Action::Delete { .. } => {
                    next.running_bound.remove(&name);
                    next.staging_bound.remove(&name);
                    next.all_names.remove(&name);
                }
                Action::BindRunning { .. } => {
                    next.running_bound.insert(name);
                }
                Action::UnbindRunning { .. } => {
                    next.running_bound.remove(&name);
                }
                Action::BindStaging { .. } => {
                    next.staging_bound.insert(name);
                }
                Action::UnbindStaging { .. } => {
                    next.staging_bound.remove(&name);
                }
            }
        }
        next
    }

    fn push(&mut self, action: Action) {
        self.dispositions
            .entry(action.name().to_string())
            .or_default()
            .insert(action.kind().into());
        self.actions.push(action);
    }

    fn mark(&mut self, name: &str, disposition: Disposition) {
        self.dispositions
            .entry(name.to_string())
            .or_default()
            .insert(disposition);
    }
}

/// Plan summary statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PlanSummary {
    pub creates: usize,
    pub deletes: usize,
    pub binds: usize,
    pub unbinds: usize,
    pub protected: usize,
    pub unchanged: usize,
}

impl PlanSummary {
    pub fn from_plan(plan: &Plan) -> Self {
        let mut summary = Self {
            protected: plan.protected.len(),
            ..Self::default()
        };
        for action in &plan.actions {
            match action.kind() {
                ActionKind::Create => summary.creates += 1,
                ActionKind::Delete => summary.deletes += 1,
                ActionKind::BindRunning | ActionKind::BindStaging => summary.binds += 1,
                ActionKind::UnbindRunning | ActionKind::UnbindStaging => summary.unbinds += 1,
            }
        }
        summary.unchanged = plan
            .dispositions
            .values()
            .filter(|d| d.contains(&Disposition::Unchanged))
            .count();
        summary
    }

    /// Total number of actions
    pub fn total(&self) -> usize {
        self.creates + self.deletes + self.binds + self.unbinds
    }

    pub fn has_changes(&self) -> bool {
        self.total() > 0
    }
}

/// Compute the plan, asking the platform about scoped associations
pub fn reconcile(
    desired: &DesiredState,
    live: &LiveInventory,
    platform: &dyn Platform,
) -> Result<Plan> {
    reconcile_with(desired, live, |name| platform.has_scoped_association(name))
}

/// Compute the plan with an explicit scoped-association predicate.
///
/// Names are visited in lexicographic order over declared and live names.
/// Per name the order is create, running binding, staging binding, so a
/// create always precedes the binds of the same group. Deletion only
/// targets undeclared names and binding only declared ones.
pub fn reconcile_with<F>(
    desired: &DesiredState,
    live: &LiveInventory,
    mut has_scoped_association: F,
) -> Result<Plan>
where
    F: FnMut(&str) -> PlatformResult<bool>,
{
    let start = Instant::now();
    let mut plan = Plan::default();

    let names: BTreeSet<&str> = desired
        .names()
        .chain(live.all_names.iter())
        .map(String::as_str)
        .collect();

    for name in names {
        let before = plan.actions.len();

        match desired.get(name) {
            Some(group) => {
                if !live.contains(name) {
                    plan.push(Action::Create {
                        name: name.to_string(),
                        rules: group.rules.clone(),
                    });
                }

                let running = live.running_bound.contains(name);
                if group.running_default && !running {
                    plan.push(Action::BindRunning {
                        name: name.to_string(),
                    });
                } else if !group.running_default && running {
                    plan.push(Action::UnbindRunning {
                        name: name.to_string(),
                    });
                }

                let staging = live.staging_bound.contains(name);
                if group.staging_default && !staging {
                    plan.push(Action::BindStaging {
                        name: name.to_string(),
                    });
                } else if !group.staging_default && staging {
                    plan.push(Action::UnbindStaging {
                        name: name.to_string(),
                    });
                }
            }
            None => {
                if has_scoped_association(name).map_err(Error::PlatformUnavailable)? {
                    log::debug!("'{name}' is not declared but has org/space bindings, keeping it");
                    plan.protected.insert(name.to_string());
                    plan.mark(name, Disposition::Protected);
                } else {
                    plan.push(Action::Delete {
                        name: name.to_string(),
                    });
                }
            }
        }

        if plan.actions.len() == before && !plan.protected.contains(name) {
            plan.mark(name, Disposition::Unchanged);
        }
    }

    log::debug!(
        "reconcile ({:.2}s): {} declared, {} live, {} actions, {} protected",
        start.elapsed().as_secs_f64(),
        desired.len(),
        live.all_names.len(),
        plan.actions.len(),
        plan.protected.len()
    );

    Ok(plan)
}
