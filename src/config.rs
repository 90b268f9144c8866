//! Optional user configuration (`~/.config/asgsync/config.toml`)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    #[serde(default)]
    pub cf: CfSection,

    #[serde(default)]
    pub reconcile: ReconcileSection,

    #[serde(default)]
    pub scan: ScanSection,
}

/// How to reach the platform
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct CfSection {
    /// Directory holding `.cf/config.json`, instead of `$CF_HOME`
    pub home: Option<String>,

    #[serde(default)]
    pub skip_ssl_validation: bool,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct ReconcileSection {
    #[serde(default)]
    pub strict: bool,

    /// Inputs used when none are given on the command line
    #[serde(default)]
    pub inputs: Vec<String>,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct ScanSection {
    pub min_cidr: Option<u8>,

    #[serde(default)]
    pub banned_networks: Vec<String>,

    #[serde(default)]
    pub skip: Vec<String>,

    #[serde(default)]
    pub skip_re: Vec<String>,
}

impl AppConfig {
    /// Default location of the config file
    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Could not determine home directory")?;
        Ok(home.join(".config").join("asgsync").join("config.toml"))
    }

    /// Load from an explicit path, or the default location.
    ///
    /// A missing default file yields the defaults; a missing explicit file
    /// is an error.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let path = Self::default_path()?;
                if !path.exists() {
                    log::debug!("no config at {}, using defaults", path.display());
                    return Ok(Self::default());
                }
                path
            }
        };

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Could not read config file: {}", path.display()))?;
        let config = Self::parse(&content)
            .with_context(|| format!("Invalid config file: {}", path.display()))?;
        log::debug!("loaded config from {}", path.display());
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Invalid TOML format in asgsync config")
    }

    /// cf home directory with `~` expanded
    pub fn cf_home(&self) -> Option<PathBuf> {
        self.cf.home.as_deref().map(expand_path)
    }

    /// Configured default inputs with `~` expanded
    pub fn reconcile_inputs(&self) -> Vec<PathBuf> {
        self.reconcile
            .inputs
            .iter()
            .map(|input| expand_path(input))
            .collect()
    }
}

fn expand_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_full_config() {
        let config = AppConfig::parse(
            r#"
            [cf]
            home = "/opt/cf"
            skip_ssl_validation = true

            [reconcile]
            strict = true
            inputs = ["/etc/asgs", "extra.yml"]

            [scan]
            min_cidr = 24
            banned_networks = ["10.0.0.0/8", "169.254.169.254"]
            skip = ["public_networks"]
            skip_re = ["^legacy-"]
            "#,
        )
        .unwrap();

        assert_eq!(config.cf_home(), Some(PathBuf::from("/opt/cf")));
        assert!(config.cf.skip_ssl_validation);
        assert!(config.reconcile.strict);
        assert_eq!(
            config.reconcile_inputs(),
            [PathBuf::from("/etc/asgs"), PathBuf::from("extra.yml")]
        );
        assert_eq!(config.scan.min_cidr, Some(24));
        assert_eq!(config.scan.banned_networks.len(), 2);
        assert_eq!(config.scan.skip_re, ["^legacy-"]);
    }

    #[test]
    fn test_empty_config_is_default() {
        let config = AppConfig::parse("").unwrap();
        assert!(config.cf.home.is_none());
        assert!(!config.reconcile.strict);
        assert!(config.scan.min_cidr.is_none());
    }

    #[test]
    fn test_unknown_section_is_rejected() {
        assert!(AppConfig::parse("[bogus]\nkey = 1\n").is_err());
    }

    #[test]
    fn test_tilde_expansion() {
        let config = AppConfig::parse("[cf]\nhome = \"~/cf\"\n").unwrap();
        let home = config.cf_home().unwrap();
        assert!(!home.to_string_lossy().starts_with('~'));
        assert!(home.ends_with("cf"));
    }

    #[test]
    fn test_load_explicit_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("asgsync.toml");
        std::fs::write(&path, "[reconcile]\nstrict = true\n").unwrap();

        let config = AppConfig::load(Some(&path)).unwrap();
        assert!(config.reconcile.strict);
    }

    #[test]
    fn test_load_missing_explicit_path_fails() {
        let dir = TempDir::new().unwrap();
        assert!(AppConfig::load(Some(&dir.path().join("nope.toml"))).is_err());
    }
}
