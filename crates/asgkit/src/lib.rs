//! # asgkit
//!
//! Reconciles declared application security groups against the live
//! bindings of a Cloud Foundry style platform.
//!
//! ## Pipeline
//!
//! - **Loader**: YAML declarations into a [`DesiredState`]
//! - **Collector**: one snapshot of the platform into a [`LiveInventory`]
//! - **Reconcile**: a pure comparison producing an ordered [`Plan`]
//! - **Executor**: applies the plan (or not, in dry-run mode) and builds a [`Report`]
//!
//! The platform is reached only through the [`Platform`] trait, so the
//! whole pipeline runs against [`MockPlatform`] in tests.
//!
//! ## Example
//!
//! ```ignore
//! use asgkit::{collect_inventory, execute_simple, load_paths, reconcile};
//! use asgkit::{ExecuteOptions, LoadOptions};
//!
//! let desired = load_paths(&paths, LoadOptions::default())?;
//! let live = collect_inventory(&platform)?;
//! let plan = reconcile(&desired, &live, &platform)?;
//! let report = execute_simple(&plan, &platform, ExecuteOptions { dry_run: true });
//! println!("{}", report.to_json()?);
//! ```
//!
//! The [`policy`] module holds the separate rule-content scan.

pub mod collector;
pub mod context;
pub mod error;
pub mod executor;
pub mod loader;
pub mod platform;
pub mod policy;
pub mod reconcile;
pub mod report;
pub mod types;

pub use collector::collect_inventory;
pub use context::{NoProgress, ProgressCallback};
pub use error::{Error, PlatformError, Result};
pub use executor::{apply_action, execute, execute_simple, ExecuteOptions};
pub use loader::{load_paths, load_sources, parse_source, LoadOptions, Source};
pub use platform::{MockOp, MockPlatform, Platform, PlatformResult};
pub use policy::{ScanPolicy, ScanReport, Violation};
pub use reconcile::{reconcile, reconcile_with, Plan, PlanSummary};
pub use report::{ActionFailure, ActionOutcome, Report, ReportMode};
pub use types::{
    Action, ActionKind, DesiredGroup, DesiredState, Disposition, GroupName, LiveInventory,
};
