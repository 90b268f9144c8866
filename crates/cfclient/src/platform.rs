//! [`Platform`] implementation backed by the Cloud Controller

use crate::client::{CfClient, Lifecycle};
use asgkit::{GroupName, Platform, PlatformResult};
use serde_json::Value;
use std::collections::BTreeSet;

fn names(groups: Vec<crate::SecurityGroup>) -> BTreeSet<GroupName> {
    groups.into_iter().map(|g| g.name).collect()
}

impl Platform for CfClient {
    fn list_all_group_names(&self) -> PlatformResult<BTreeSet<GroupName>> {
        Ok(names(self.list_security_groups()?))
    }

    fn list_running_bound_names(&self) -> PlatformResult<BTreeSet<GroupName>> {
        Ok(names(self.list_bound(Lifecycle::Running)?))
    }

    fn list_staging_bound_names(&self) -> PlatformResult<BTreeSet<GroupName>> {
        Ok(names(self.list_bound(Lifecycle::Staging)?))
    }

    fn has_scoped_association(&self, name: &str) -> PlatformResult<bool> {
        Ok(self.has_space_association(name)?)
    }

    fn create_group(&self, name: &str, rules: &Value) -> PlatformResult<()> {
        let group = self.create(name, rules)?;
        log::debug!("created '{}' ({})", group.name, group.guid);
        Ok(())
    }

    fn delete_group(&self, name: &str) -> PlatformResult<()> {
        Ok(self.delete(name)?)
    }

    fn bind_running(&self, name: &str) -> PlatformResult<()> {
        Ok(self.bind(name, Lifecycle::Running)?)
    }

    fn unbind_running(&self, name: &str) -> PlatformResult<()> {
        Ok(self.unbind(name, Lifecycle::Running)?)
    }

    fn bind_staging(&self, name: &str) -> PlatformResult<()> {
        Ok(self.bind(name, Lifecycle::Staging)?)
    }

    fn unbind_staging(&self, name: &str) -> PlatformResult<()> {
        Ok(self.unbind(name, Lifecycle::Staging)?)
    }
}
