//! Core types for security group reconciliation

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Platform-wide unique security group name
pub type GroupName = String;

/// A security group as declared in the inventory files
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesiredGroup {
    pub name: GroupName,
    /// Opaque rule payload, passed through to `create`
    pub rules: Value,
    pub running_default: bool,
    pub staging_default: bool,
}

impl DesiredGroup {
    pub fn new(name: impl Into<GroupName>, running_default: bool, staging_default: bool) -> Self {
        Self {
            name: name.into(),
            rules: Value::Array(Vec::new()),
            running_default,
            staging_default,
        }
    }

    pub fn with_rules(mut self, rules: Value) -> Self {
        self.rules = rules;
        self
    }
}

/// The merged declared state, keyed by group name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DesiredState {
    groups: BTreeMap<GroupName, DesiredGroup>,
    origins: BTreeMap<GroupName, String>,
}

impl DesiredState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a group, replacing any earlier declaration of the same name.
    ///
    /// Returns the origin of the replaced declaration, if there was one.
    pub fn insert(&mut self, group: DesiredGroup, origin: impl Into<String>) -> Option<String> {
        let name = group.name.clone();
        self.groups.insert(name.clone(), group);
        self.origins.insert(name, origin.into())
    }

    pub fn get(&self, name: &str) -> Option<&DesiredGroup> {
        self.groups.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.groups.contains_key(name)
    }

    /// Where a group was (last) declared
    pub fn origin(&self, name: &str) -> Option<&str> {
        self.origins.get(name).map(String::as_str)
    }

    pub fn names(&self) -> impl Iterator<Item = &GroupName> {
        self.groups.keys()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

impl FromIterator<DesiredGroup> for DesiredState {
    fn from_iter<I: IntoIterator<Item = DesiredGroup>>(iter: I) -> Self {
        let mut state = Self::new();
        for group in iter {
            state.insert(group, "<inline>");
        }
        state
    }
}

/// Point-in-time snapshot of the platform's groups and global bindings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveInventory {
    pub all_names: BTreeSet<GroupName>,
    pub running_bound: BTreeSet<GroupName>,
    pub staging_bound: BTreeSet<GroupName>,
}

impl LiveInventory {
    pub fn new<A, R, S>(all: A, running: R, staging: S) -> Self
    where
        A: IntoIterator,
        A::Item: Into<GroupName>,
        R: IntoIterator,
        R::Item: Into<GroupName>,
        S: IntoIterator,
        S::Item: Into<GroupName>,
    {
        let mut inventory = Self {
            all_names: all.into_iter().map(Into::into).collect(),
            running_bound: running.into_iter().map(Into::into).collect(),
            staging_bound: staging.into_iter().map(Into::into).collect(),
        };
        inventory.normalize();
        inventory
    }

    /// Fold bound names missing from `all_names` into it.
    ///
    /// Returns the names that had to be added.
    pub fn normalize(&mut self) -> Vec<GroupName> {
        let missing: Vec<GroupName> = self
            .running_bound
            .union(&self.staging_bound)
            .filter(|name| !self.all_names.contains(*name))
            .cloned()
            .collect();
        self.all_names.extend(missing.iter().cloned());
        missing
    }

    pub fn contains(&self, name: &str) -> bool {
        self.all_names.contains(name)
    }
}

/// Kind of a remediation action
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Create,
    Delete,
    BindRunning,
    UnbindRunning,
    BindStaging,
    UnbindStaging,
}

impl ActionKind {
    pub const ALL: [ActionKind; 6] = [
        ActionKind::Create,
        ActionKind::Delete,
        ActionKind::BindRunning,
        ActionKind::UnbindRunning,
        ActionKind::BindStaging,
        ActionKind::UnbindStaging,
    ];

    /// Stable machine-readable name, used as report key
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Delete => "delete",
            Self::BindRunning => "bind_running",
            Self::UnbindRunning => "unbind_running",
            Self::BindStaging => "bind_staging",
            Self::UnbindStaging => "unbind_staging",
        }
    }

    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            Self::Create => "Create",
            Self::Delete => "Delete",
            Self::BindRunning => "Bind running",
            Self::UnbindRunning => "Unbind running",
            Self::BindStaging => "Bind staging",
            Self::UnbindStaging => "Unbind staging",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A remediation action against the platform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Action {
    Create { name: GroupName, rules: Value },
    Delete { name: GroupName },
    BindRunning { name: GroupName },
    UnbindRunning { name: GroupName },
    BindStaging { name: GroupName },
    UnbindStaging { name: GroupName },
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        match self {
            Self::Create { .. } => ActionKind::Create,
            Self::Delete { .. } => ActionKind::Delete,
            Self::BindRunning { .. } => ActionKind::BindRunning,
            Self::UnbindRunning { .. } => ActionKind::UnbindRunning,
            Self::BindStaging { .. } => ActionKind::BindStaging,
            Self::UnbindStaging { .. } => ActionKind::UnbindStaging,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Create { name, .. }
            | Self::Delete { name }
            | Self::BindRunning { name }
            | Self::UnbindRunning { name }
            | Self::BindStaging { name }
            | Self::UnbindStaging { name } => name,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind(), self.name())
    }
}

/// Derived classification of a group name after reconciliation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    Unchanged,
    ToCreate,
    ToDelete,
    NeedsBindRunning,
    NeedsUnbindRunning,
    NeedsBindStaging,
    NeedsUnbindStaging,
    /// Undeclared but has an org/space association, exempt from deletion
    Protected,
}

impl From<ActionKind> for Disposition {
    fn from(kind: ActionKind) -> Self {
        match kind {
            ActionKind::Create => Self::ToCreate,
            ActionKind::Delete => Self::ToDelete,
            ActionKind::BindRunning => Self::NeedsBindRunning,
            ActionKind::UnbindRunning => Self::NeedsUnbindRunning,
            ActionKind::BindStaging => Self::NeedsBindStaging,
            ActionKind::UnbindStaging => Self::NeedsUnbindStaging,
        }
    }
}
