//! Platform capability abstraction.
//!
//! The [`Platform`] trait is everything the reconciler needs from the live
//! system: four reads and six writes. Implementations:
//! - `cfclient::CfClient` talks to the Cloud Foundry v2 API
//! - [`MockPlatform`] keeps state in memory for tests

use crate::error::PlatformError;
use crate::types::{ActionKind, GroupName};
use serde_json::Value;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

/// Result of a single platform call
pub type PlatformResult<T> = std::result::Result<T, PlatformError>;

/// Backend trait for the security group platform
pub trait Platform: Send + Sync {
    /// Names of every security group that exists
    fn list_all_group_names(&self) -> PlatformResult<BTreeSet<GroupName>>;

    /// Names of groups bound to the global running scope
    fn list_running_bound_names(&self) -> PlatformResult<BTreeSet<GroupName>>;

    /// Names of groups bound to the global staging scope
    fn list_staging_bound_names(&self) -> PlatformResult<BTreeSet<GroupName>>;

    /// Whether the group is bound to at least one org or space
    fn has_scoped_association(&self, name: &str) -> PlatformResult<bool>;

    /// Create a group with the given rule payload
    fn create_group(&self, name: &str, rules: &Value) -> PlatformResult<()>;

    /// Delete a group
    fn delete_group(&self, name: &str) -> PlatformResult<()>;

    fn bind_running(&self, name: &str) -> PlatformResult<()>;

    fn unbind_running(&self, name: &str) -> PlatformResult<()>;

    fn bind_staging(&self, name: &str) -> PlatformResult<()>;

    fn unbind_staging(&self, name: &str) -> PlatformResult<()>;
}

/// Operations a [`MockPlatform`] can be told to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockOp {
    ListAll,
    ListRunning,
    ListStaging,
    ScopedAssociation,
    Mutation(ActionKind),
}

#[derive(Debug, Default)]
struct MockState {
    groups: HashMap<GroupName, Value>,
    running: BTreeSet<GroupName>,
    staging: BTreeSet<GroupName>,
    scoped: HashSet<GroupName>,
    failures: HashMap<(MockOp, Option<GroupName>), String>,
    calls: Vec<(ActionKind, GroupName)>,
    association_queries: Vec<GroupName>,
}

/// In-memory platform for tests.
///
/// Mutations update the in-memory state, so a second reconcile against the
/// same mock observes the effect of the first apply.
#[derive(Debug, Default)]
pub struct MockPlatform {
    state: Mutex<MockState>,
}

impl MockPlatform {
    /// Create a new empty mock platform
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Add an existing group
    pub fn with_group(self, name: &str) -> Self {
        self.lock()
            .groups
            .insert(name.to_string(), Value::Array(Vec::new()));
        self
    }

    /// Add an existing group bound to the running scope
    pub fn with_running(self, name: &str) -> Self {
        let this = self.with_group(name);
        this.lock().running.insert(name.to_string());
        this
    }

    /// Add an existing group bound to the staging scope
    pub fn with_staging(self, name: &str) -> Self {
        let this = self.with_group(name);
        this.lock().staging.insert(name.to_string());
        this
    }

    /// Add an existing group with an org/space association
    pub fn with_scoped(self, name: &str) -> Self {
        let this = self.with_group(name);
        this.lock().scoped.insert(name.to_string());
        this
    }

    /// Make an operation fail, for every name (`None`) or one name
    pub fn fail_on(self, op: MockOp, name: Option<&str>, message: &str) -> Self {
        self.lock()
            .failures
            .insert((op, name.map(str::to_string)), message.to_string());
        self
    }

    /// Mutations performed so far, in order
    pub fn calls(&self) -> Vec<(ActionKind, GroupName)> {
        self.lock().calls.clone()
    }

    /// Names whose scoped association was queried
    pub fn association_queries(&self) -> Vec<GroupName> {
        self.lock().association_queries.clone()
    }

    /// Rules stored for a group
    pub fn rules(&self, name: &str) -> Option<Value> {
        self.lock().groups.get(name).cloned()
    }

    fn check(state: &MockState, op: MockOp, name: Option<&str>) -> PlatformResult<()> {
        let specific = name.and_then(|n| state.failures.get(&(op, Some(n.to_string()))));
        match specific.or_else(|| state.failures.get(&(op, None))) {
            Some(message) => Err(PlatformError::new(message.clone())),
            None => Ok(()),
        }
    }

    fn mutate<F>(&self, kind: ActionKind, name: &str, apply: F) -> PlatformResult<()>
    where
        F: FnOnce(&mut MockState) -> PlatformResult<()>,
    {
        let mut state = self.lock();
        Self::check(&state, MockOp::Mutation(kind), Some(name))?;
        apply(&mut state)?;
        state.calls.push((kind, name.to_string()));
        Ok(())
    }

    fn require_group(state: &MockState, name: &str) -> PlatformResult<()> {
        if state.groups.contains_key(name) {
            Ok(())
        } else {
            Err(PlatformError::with_status(
                format!("security group '{name}' not found"),
                404,
            ))
        }
    }
}

impl Platform for MockPlatform {
    fn list_all_group_names(&self) -> PlatformResult<BTreeSet<GroupName>> {
        let state = self.lock();
        Self::check(&state, MockOp::ListAll, None)?;
        Ok(state.groups.keys().cloned().collect())
    }

    fn list_running_bound_names(&self) -> PlatformResult<BTreeSet<GroupName>> {
        let state = self.lock();
        Self::check(&state, MockOp::ListRunning, None)?;
        Ok(state.running.clone())
    }

    fn list_staging_bound_names(&self) -> PlatformResult<BTreeSet<GroupName>> {
        let state = self.lock();
        Self::check(&state, MockOp::ListStaging, None)?;
        Ok(state.staging.clone())
    }

    fn has_scoped_association(&self, name: &str) -> PlatformResult<bool> {
        let mut state = self.lock();
        state.association_queries.push(name.to_string());
        Self::check(&state, MockOp::ScopedAssociation, Some(name))?;
        Ok(state.scoped.contains(name))
    }

    fn create_group(&self, name: &str, rules: &Value) -> PlatformResult<()> {
        self.mutate(ActionKind::Create, name, |state| {
            if state.groups.contains_key(name) {
                return Err(PlatformError::with_status(
                    format!("security group '{name}' already exists"),
                    400,
                ));
            }
            state.groups.insert(name.to_string(), rules.clone());
            Ok(())
        })
    }

    fn delete_group(&self, name: &str) -> PlatformResult<()> {
        self.mutate(ActionKind::Delete, name, |state| {
            Self::require_group(state, name)?;
            state.groups.remove(name);
            state.running.remove(name);
            state.staging.remove(name);
            state.scoped.remove(name);
            Ok(())
        })
    }

    fn bind_running(&self, name: &str) -> PlatformResult<()> {
        self.mutate(ActionKind::BindRunning, name, |state| {
            Self::require_group(state, name)?;
            state.running.insert(name.to_string());
            Ok(())
        })
    }

    fn unbind_running(&self, name: &str) -> PlatformResult<()> {
        self.mutate(ActionKind::UnbindRunning, name, |state| {
            state.running.remove(name);
            Ok(())
        })
    }

    fn bind_staging(&self, name: &str) -> PlatformResult<()> {
        self.mutate(ActionKind::BindStaging, name, |state| {
            Self::require_group(state, name)?;
            state.staging.insert(name.to_string());
            Ok(())
        })
    }

    fn unbind_staging(&self, name: &str) -> PlatformResult<()> {
        self.mutate(ActionKind::UnbindStaging, name, |state| {
            state.staging.remove(name);
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_platform_new() {
        let mock = MockPlatform::new();
        assert!(mock.list_all_group_names().unwrap().is_empty());
        assert!(mock.list_running_bound_names().unwrap().is_empty());
        assert!(mock.calls().is_empty());
    }

    #[test]
    fn test_mock_platform_builders() {
        let mock = MockPlatform::new()
            .with_group("plain")
            .with_running("run")
            .with_staging("stage")
            .with_scoped("scoped");

        let all = mock.list_all_group_names().unwrap();
        assert_eq!(all.len(), 4);
        assert!(mock.list_running_bound_names().unwrap().contains("run"));
        assert!(mock.list_staging_bound_names().unwrap().contains("stage"));
        assert!(mock.has_scoped_association("scoped").unwrap());
        assert!(!mock.has_scoped_association("plain").unwrap());
        assert_eq!(mock.association_queries(), ["scoped", "plain"]);
    }

    #[test]
    fn test_mock_platform_mutations() {
        let mock = MockPlatform::new();
        let rules = serde_json::json!([{"protocol": "all", "destination": "10.0.0.0/24"}]);

        mock.create_group("web", &rules).unwrap();
        mock.bind_running("web").unwrap();
        assert!(mock.create_group("web", &rules).is_err());
        assert_eq!(mock.rules("web"), Some(rules));
        assert!(mock.list_running_bound_names().unwrap().contains("web"));

        mock.delete_group("web").unwrap();
        assert!(mock.list_all_group_names().unwrap().is_empty());
        assert!(mock.list_running_bound_names().unwrap().is_empty());

        assert_eq!(
            mock.calls(),
            [
                (ActionKind::Create, "web".to_string()),
                (ActionKind::BindRunning, "web".to_string()),
                (ActionKind::Delete, "web".to_string()),
            ]
        );
    }

    #[test]
    fn test_mock_platform_failures() {
        let mock = MockPlatform::new()
            .with_group("a")
            .with_group("b")
            .fail_on(MockOp::Mutation(ActionKind::Delete), Some("a"), "locked")
            .fail_on(MockOp::ListStaging, None, "timeout");

        let err = mock.delete_group("a").unwrap_err();
        assert_eq!(err.message, "locked");
        mock.delete_group("b").unwrap();
        assert!(mock.list_staging_bound_names().is_err());
        assert_eq!(mock.calls(), [(ActionKind::Delete, "b".to_string())]);
    }

    #[test]
    fn test_bind_missing_group_fails() {
        let mock = MockPlatform::new();
        let err = mock.bind_staging("ghost").unwrap_err();
        assert_eq!(err.status, Some(404));
    }
}
