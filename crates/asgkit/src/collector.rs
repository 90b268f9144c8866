//! Live-state collector - takes one snapshot of the platform

use crate::error::{Error, Result};
use crate::platform::Platform;
use crate::types::LiveInventory;
use std::time::Instant;

/// Collect a consistent [`LiveInventory`] from the platform.
///
/// Any failed read aborts with [`Error::PlatformUnavailable`]; a partial
/// snapshot is never returned.
pub fn collect_inventory(platform: &dyn Platform) -> Result<LiveInventory> {
    let start = Instant::now();

    let all_names = platform
        .list_all_group_names()
        .map_err(Error::PlatformUnavailable)?;
    let running_bound = platform
        .list_running_bound_names()
        .map_err(Error::PlatformUnavailable)?;
    let staging_bound = platform
        .list_staging_bound_names()
        .map_err(Error::PlatformUnavailable)?;

    let mut inventory = LiveInventory {
        all_names,
        running_bound,
        staging_bound,
    };
    for name in inventory.normalize() {
        log::warn!("'{name}' is globally bound but missing from the group listing");
    }

    log::debug!(
        "live inventory ({:.2}s): {} groups, {} running, {} staging",
        start.elapsed().as_secs_f64(),
        inventory.all_names.len(),
        inventory.running_bound.len(),
        inventory.staging_bound.len()
    );
    log::trace!("live groups: {:?}", inventory.all_names);
    log::trace!("running bound: {:?}", inventory.running_bound);
    log::trace!("staging bound: {:?}", inventory.staging_bound);

    Ok(inventory)
}
