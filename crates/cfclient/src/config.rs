//! cf CLI session configuration (`.cf/config.json`)

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// The subset of the cf CLI config needed to reach the Cloud Controller.
///
/// The file carries many more keys; they are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CfConfig {
    /// Cloud Controller API endpoint
    #[serde(default)]
    pub target: String,
    /// UAA endpoint used for token refresh
    #[serde(default)]
    pub authorization_endpoint: String,
    #[serde(default)]
    pub refresh_token: String,
    #[serde(default, rename = "SSLDisabled")]
    pub ssl_disabled: bool,
}

impl CfConfig {
    /// Load from an explicit `config.json` path
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Self::parse(&content, path)
    }

    /// Locate and load the session config.
    ///
    /// `cf_home` overrides the `CF_HOME` environment variable, which in turn
    /// overrides the user's home directory.
    pub fn discover(cf_home: Option<&Path>) -> Result<Self> {
        Self::load(&config_path(cf_home)?)
    }

    fn parse(content: &str, path: &Path) -> Result<Self> {
        let config: Self = serde_json::from_str(content).map_err(|e| Error::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.target.is_empty() {
            return Err(Error::NotLoggedIn("Target"));
        }
        if self.authorization_endpoint.is_empty() {
            return Err(Error::NotLoggedIn("AuthorizationEndpoint"));
        }
        if self.refresh_token.is_empty() {
            return Err(Error::NotLoggedIn("RefreshToken"));
        }
        Ok(())
    }
}

/// Path of `config.json` under the cf home directory
pub fn config_path(cf_home: Option<&Path>) -> Result<PathBuf> {
    let home = match cf_home {
        Some(home) => home.to_path_buf(),
        None => std::env::var_os("CF_HOME")
            .map(PathBuf::from)
            .or_else(dirs::home_dir)
            .ok_or(Error::NoHome)?,
    };
    Ok(home.join(".cf").join("config.json"))
}
