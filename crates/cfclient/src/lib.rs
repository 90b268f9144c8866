//! # cfclient
//!
//! Blocking Cloud Foundry v2 API client for application security groups.
//!
//! The session is taken from the cf CLI (`cf login` must have been run);
//! only the refresh token is used, to obtain a fresh access token.
//!
//! ```no_run
//! use cfclient::{CfClient, ClientOptions};
//!
//! let client = CfClient::connect(&ClientOptions::default()).unwrap();
//! for group in client.list_security_groups().unwrap() {
//!     println!("{} {}", group.guid, group.name);
//! }
//! ```
//!
//! [`CfClient`] implements [`asgkit::Platform`].

pub mod client;
pub mod config;
pub mod error;
mod platform;

pub use client::{CfClient, ClientOptions, Lifecycle, SecurityGroup};
pub use config::{CfConfig, config_path};
pub use error::{Error, Result};
