//! Cloud Controller v2 client.
//!
//! Covers the security group endpoints only: listing (with `next_url`
//! pagination), the running/staging default bindings, the org/space
//! associations of a group, and create/delete/bind/unbind.

use crate::config::CfConfig;
use crate::error::{Error, Result};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// Security groups collection
const GROUPS_PATH: &str = "/v2/security_groups";

/// HTTP basic credentials of the public `cf` client (`cf:`)
const CF_CLIENT_BASIC: &str = "Basic Y2Y6";

/// Upper bound for any single request
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Platform-wide default binding scope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Running,
    Staging,
}

impl Lifecycle {
    fn path(self) -> &'static str {
        match self {
            Self::Running => "/v2/config/running_security_groups",
            Self::Staging => "/v2/config/staging_security_groups",
        }
    }
}

/// One page of a v2 collection
#[derive(Debug, Deserialize)]
struct Page<T> {
    #[serde(default)]
    total_results: u64,
    #[serde(default)]
    next_url: Option<String>,
    #[serde(default = "Vec::new")]
    resources: Vec<Resource<T>>,
}

#[derive(Debug, Deserialize)]
struct Resource<T> {
    metadata: Metadata,
    entity: T,
}

#[derive(Debug, Deserialize)]
struct Metadata {
    guid: String,
}

#[derive(Debug, Deserialize)]
struct GroupEntity {
    name: String,
    #[serde(default)]
    rules: Value,
    #[serde(default)]
    running_default: bool,
    #[serde(default)]
    staging_default: bool,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    token_type: String,
}

/// A security group as listed by the platform
#[derive(Debug, Clone, PartialEq)]
pub struct SecurityGroup {
    pub guid: String,
    pub name: String,
    /// Rule list as returned, `null` when the group has none
    pub rules: Value,
    pub running_default: bool,
    pub staging_default: bool,
}

impl From<Resource<GroupEntity>> for SecurityGroup {
    fn from(resource: Resource<GroupEntity>) -> Self {
        Self {
            guid: resource.metadata.guid,
            name: resource.entity.name,
            rules: resource.entity.rules,
            running_default: resource.entity.running_default,
            staging_default: resource.entity.staging_default,
        }
    }
}

/// How to reach the platform
#[derive(Debug, Clone, Default)]
pub struct ClientOptions {
    /// Directory containing `.cf/config.json`, instead of `CF_HOME`/`HOME`
    pub cf_home: Option<PathBuf>,
    /// Disable TLS certificate verification
    pub skip_ssl_validation: bool,
}

/// Authenticated Cloud Controller client.
///
/// GUIDs are looked up by name once and cached for the lifetime of the
/// client.
pub struct CfClient {
    agent: ureq::Agent,
    target: String,
    authorization: String,
    guids: Mutex<HashMap<String, String>>,
}

impl CfClient {
    /// Read the cf CLI session and refresh its token
    pub fn connect(options: &ClientOptions) -> Result<Self> {
        let config = CfConfig::discover(options.cf_home.as_deref())?;
        Self::from_config(&config, options.skip_ssl_validation)
    }

    pub fn from_config(config: &CfConfig, skip_ssl_validation: bool) -> Result<Self> {
        let verify = !(config.ssl_disabled || skip_ssl_validation);
        if !verify {
            log::warn!("TLS certificate verification is disabled");
        }
        let agent = build_agent(verify);
        let authorization = refresh_token(&agent, config)?;
        log::debug!("authenticated against {}", config.target);

        Ok(Self {
            agent,
            target: config.target.trim_end_matches('/').to_string(),
            authorization,
            guids: Mutex::new(HashMap::new()),
        })
    }

    /// Cloud Controller endpoint
    pub fn target(&self) -> &str {
        &self.target
    }

    fn guids(&self) -> MutexGuard<'_, HashMap<String, String>> {
        match self.guids.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T> {
        let url = resolve_url(&self.target, path);
        log::trace!("GET {url}");

        let mut request = self
            .agent
            .get(&url)
            .header("Authorization", self.authorization.as_str())
            .header("Accept", "application/json");
        for (key, value) in query {
            request = request.query(*key, *value);
        }

        request
            .call()
            .map_err(|e| Error::from(e).during(&format!("GET {path}")))?
            .body_mut()
            .read_json()
            .map_err(Error::from)
    }

    /// Fetch every page of a collection
    fn list<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<Resource<T>>> {
        let mut resources = Vec::new();
        let mut next = Some(path.to_string());
        while let Some(page_path) = next {
            let page: Page<T> = self.get_json(&page_path, &[])?;
            resources.extend(page.resources);
            next = page.next_url.filter(|url| !url.is_empty());
        }
        Ok(resources)
    }

    /// All security groups with their rules
    pub fn list_security_groups(&self) -> Result<Vec<SecurityGroup>> {
        let groups: Vec<SecurityGroup> = self
            .list::<GroupEntity>(GROUPS_PATH)?
            .into_iter()
            .map(SecurityGroup::from)
            .collect();

        let mut guids = self.guids();
        for group in &groups {
            guids.insert(group.name.clone(), group.guid.clone());
        }
        Ok(groups)
    }

    /// Groups bound platform-wide for a lifecycle
    pub fn list_bound(&self, lifecycle: Lifecycle) -> Result<Vec<SecurityGroup>> {
        Ok(self
            .list::<GroupEntity>(lifecycle.path())?
            .into_iter()
            .map(SecurityGroup::from)
            .collect())
    }

    /// GUID of a group, from cache or by name query
    pub fn guid(&self, name: &str) -> Result<String> {
        if let Some(guid) = self.guids().get(name) {
            return Ok(guid.clone());
        }

        let filter = format!("name:{name}");
        let page: Page<GroupEntity> = self.get_json(GROUPS_PATH, &[("q", filter.as_str())])?;
        let guid = page
            .resources
            .into_iter()
            .find(|r| r.entity.name == name)
            .map(|r| r.metadata.guid)
            .ok_or_else(|| Error::GroupNotFound(name.to_string()))?;

        self.guids().insert(name.to_string(), guid.clone());
        Ok(guid)
    }

    /// Whether any space uses the group, for running or staging
    pub fn has_space_association(&self, name: &str) -> Result<bool> {
        let guid = self.guid(name)?;
        for relation in ["spaces", "staging_spaces"] {
            let path = format!("{GROUPS_PATH}/{guid}/{relation}");
            let page: Page<Value> = self.get_json(&path, &[("results-per-page", "1")])?;
            if page.total_results > 0 || !page.resources.is_empty() {
                log::trace!("'{name}' has {relation}");
                return Ok(true);
            }
        }
        Ok(false)
    }

    pub fn create(&self, name: &str, rules: &Value) -> Result<SecurityGroup> {
        let url = resolve_url(&self.target, GROUPS_PATH);
        let body = json!({ "name": name, "rules": rules });

        let created: Resource<GroupEntity> = self
            .agent
            .post(&url)
            .header("Authorization", self.authorization.as_str())
            .header("Accept", "application/json")
            .send_json(&body)
            .map_err(|e| Error::from(e).during(&format!("POST {GROUPS_PATH}")))?
            .body_mut()
            .read_json()?;

        let group = SecurityGroup::from(created);
        self.guids().insert(group.name.clone(), group.guid.clone());
        Ok(group)
    }

    pub fn delete(&self, name: &str) -> Result<()> {
        let guid = self.guid(name)?;
        let path = format!("{GROUPS_PATH}/{guid}");
        self.send_delete(&path)?;
        self.guids().remove(name);
        Ok(())
    }

    /// Make the group a platform-wide default for a lifecycle
    pub fn bind(&self, name: &str, lifecycle: Lifecycle) -> Result<()> {
        let path = format!("{}/{}", lifecycle.path(), self.guid(name)?);
        let url = resolve_url(&self.target, &path);
        self.agent
            .put(&url)
            .header("Authorization", self.authorization.as_str())
            .send_empty()
            .map_err(|e| Error::from(e).during(&format!("PUT {path}")))?;
        Ok(())
    }

    pub fn unbind(&self, name: &str, lifecycle: Lifecycle) -> Result<()> {
        let path = format!("{}/{}", lifecycle.path(), self.guid(name)?);
        self.send_delete(&path)
    }

    fn send_delete(&self, path: &str) -> Result<()> {
        let url = resolve_url(&self.target, path);
        self.agent
            .delete(&url)
            .header("Authorization", self.authorization.as_str())
            .call()
            .map_err(|e| Error::from(e).during(&format!("DELETE {path}")))?;
        Ok(())
    }
}

fn build_agent(verify_tls: bool) -> ureq::Agent {
    let mut builder = ureq::Agent::config_builder().timeout_global(Some(REQUEST_TIMEOUT));
    if !verify_tls {
        builder = builder.tls_config(
            ureq::tls::TlsConfig::builder()
                .disable_verification(true)
                .build(),
        );
    }
    ureq::Agent::new_with_config(builder.build())
}

/// Exchange the session's refresh token for an `Authorization` header value
fn refresh_token(agent: &ureq::Agent, config: &CfConfig) -> Result<String> {
    let url = format!(
        "{}/oauth/token",
        config.authorization_endpoint.trim_end_matches('/')
    );

    let token: TokenResponse = agent
        .post(&url)
        .header("Authorization", CF_CLIENT_BASIC)
        .header("Accept", "application/json")
        .send_form([
            ("grant_type", "refresh_token"),
            ("refresh_token", config.refresh_token.as_str()),
            ("client_id", "cf"),
        ])
        .map_err(|e| match e {
            ureq::Error::StatusCode(code) => {
                Error::Auth(format!("rejected with HTTP {code}, run `cf login` again"))
            }
            other => Error::Auth(other.to_string()),
        })?
        .body_mut()
        .read_json()?;

    Ok(authorization_header(&token))
}

fn authorization_header(token: &TokenResponse) -> String {
    format!("{} {}", token.token_type, token.access_token)
}

/// Resolve a path or a `next_url` against the API target
fn resolve_url(target: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        path.to_string()
    } else {
        format!("{}/{}", target.trim_end_matches('/'), path.trim_start_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_relative_next_url() {
        assert_eq!(
            resolve_url(
                "https://api.sys.example.com/",
                "/v2/security_groups?order-direction=asc&page=2&results-per-page=50"
            ),
            "https://api.sys.example.com/v2/security_groups?order-direction=asc&page=2&results-per-page=50"
        );
    }

    #[test]
    fn test_resolve_absolute_url() {
        assert_eq!(
            resolve_url("https://api.a", "https://api.b/v2/security_groups?page=3"),
            "https://api.b/v2/security_groups?page=3"
        );
    }

    #[test]
    fn test_page_parsing() {
        let body = r#"{
            "total_results": 2,
            "total_pages": 2,
            "prev_url": null,
            "next_url": "/v2/security_groups?page=2",
            "resources": [{
                "metadata": {"guid": "b85a788e", "url": "/v2/security_groups/b85a788e"},
                "entity": {
                    "name": "public_networks",
                    "rules": [{"protocol": "all", "destination": "0.0.0.0-9.255.255.255"}],
                    "running_default": true,
                    "staging_default": false,
                    "spaces_url": "/v2/security_groups/b85a788e/spaces"
                }
            }]
        }"#;

        let page: Page<GroupEntity> = serde_json::from_str(body).unwrap();
        assert_eq!(page.next_url.as_deref(), Some("/v2/security_groups?page=2"));

        let groups: Vec<SecurityGroup> = page.resources.into_iter().map(Into::into).collect();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].guid, "b85a788e");
        assert_eq!(groups[0].name, "public_networks");
        assert!(groups[0].running_default);
        assert_eq!(groups[0].rules[0]["destination"], "0.0.0.0-9.255.255.255");
    }

    #[test]
    fn test_last_page_and_null_rules() {
        let body = r#"{
            "total_results": 1,
            "next_url": null,
            "resources": [{"metadata": {"guid": "g"}, "entity": {"name": "dns", "rules": null}}]
        }"#;

        let page: Page<GroupEntity> = serde_json::from_str(body).unwrap();
        assert!(page.next_url.is_none());
        let group = SecurityGroup::from(page.resources.into_iter().next().unwrap());
        assert!(group.rules.is_null());
        assert!(!group.staging_default);
    }

    #[test]
    fn test_empty_association_page() {
        let page: Page<Value> =
            serde_json::from_str(r#"{"total_results": 0, "next_url": null, "resources": []}"#)
                .unwrap();
        assert_eq!(page.total_results, 0);
        assert!(page.resources.is_empty());
    }

    #[test]
    fn test_authorization_header() {
        let token: TokenResponse = serde_json::from_str(
            r#"{"access_token": "abc", "token_type": "bearer", "expires_in": 599, "jti": "x"}"#,
        )
        .unwrap();
        assert_eq!(authorization_header(&token), "bearer abc");
    }

    #[test]
    fn test_lifecycle_paths() {
        assert_eq!(
            Lifecycle::Running.path(),
            "/v2/config/running_security_groups"
        );
        assert_eq!(
            Lifecycle::Staging.path(),
            "/v2/config/staging_security_groups"
        );
    }

    #[test]
    fn test_build_agent_without_verification() {
        // Construction only; no request is made
        let _agent = build_agent(false);
        let _agent = build_agent(true);
    }
}
