//! Declared-state loader
//!
//! Turns declarative YAML sources into a [`DesiredState`]. Each source holds
//! either a list of group records or a single record:
//!
//! ```yaml
//! - name: public-networks
//!   running_default: true
//!   staging_default: "TRUE"
//!   rules:
//!     - protocol: all
//!       destination: 0.0.0.0-9.255.255.255
//! ```
//!
//! Sources are merged in order. A name declared twice keeps the later
//! declaration unless strict mode is enabled.

use crate::error::{Error, Result};
use crate::types::{DesiredGroup, DesiredState};
use serde_yaml::{Mapping, Value};
use std::io::Read;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Options for loading declared state
#[derive(Debug, Clone, Copy, Default)]
pub struct LoadOptions {
    /// Reject duplicate group names instead of letting the later one win
    pub strict: bool,
}

/// A raw declarative source, already read into memory
#[derive(Debug, Clone)]
pub struct Source {
    /// Name used in diagnostics (usually the file path)
    pub name: String,
    pub content: String,
}

impl Source {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }
}

/// Load and merge declared state from files, directories or `-` (stdin)
pub fn load_paths(paths: &[PathBuf], options: LoadOptions) -> Result<DesiredState> {
    let files = expand_inputs(paths)?;
    let mut sources = Vec::with_capacity(files.len());
    for path in &files {
        sources.push(read_source(path)?);
    }
    load_sources(sources, options)
}

/// Merge already-read sources, in order
pub fn load_sources<I>(sources: I, options: LoadOptions) -> Result<DesiredState>
where
    I: IntoIterator<Item = Source>,
{
    let mut state = DesiredState::new();

    for source in sources {
        let groups = parse_source(&source.content, &source.name)?;
        log::debug!("{}: {} group(s)", source.name, groups.len());

        for group in groups {
            if let Some(first) = state.origin(&group.name) {
                if options.strict && first != source.name {
                    return Err(Error::DuplicateGroup {
                        name: group.name,
                        first: first.to_string(),
                        second: source.name,
                    });
                }
                log::warn!(
                    "security group '{}' from {} overrides the declaration in {}",
                    group.name,
                    source.name,
                    first
                );
            }
            state.insert(group, source.name.clone());
        }
    }

    Ok(state)
}

/// Decode one source into group records
pub fn parse_source(content: &str, source_name: &str) -> Result<Vec<DesiredGroup>> {
    let document: Value = serde_yaml::from_str(content)
        .map_err(|e| Error::malformed(source_name, format!("invalid YAML: {e}")))?;

    match document {
        Value::Null => Ok(Vec::new()),
        Value::Sequence(records) => records
            .iter()
            .enumerate()
            .map(|(index, record)| parse_record(record, source_name, index))
            .collect(),
        Value::Mapping(_) => Ok(vec![parse_record(&document, source_name, 0)?]),
        _ => Err(Error::malformed(
            source_name,
            "expected a list of security group records or a single record",
        )),
    }
}

fn parse_record(record: &Value, source_name: &str, index: usize) -> Result<DesiredGroup> {
    let Value::Mapping(fields) = record else {
        return Err(Error::malformed(
            source_name,
            format!("record {index} is not a mapping"),
        ));
    };

    let name = record_name(fields)
        .ok_or_else(|| Error::malformed(source_name, format!("record {index} has no name")))?;

    let rules = match fields.get("rules") {
        None | Some(Value::Null) => serde_json::Value::Array(Vec::new()),
        Some(rules) => serde_json::to_value(rules).map_err(|e| {
            Error::malformed(source_name, format!("rules of '{name}' are not representable: {e}"))
        })?,
    };

    Ok(DesiredGroup {
        name,
        rules,
        running_default: bool_like(fields.get("running_default")),
        staging_default: bool_like(fields.get("staging_default")),
    })
}

/// `name`, or the older `policy_name` key
fn record_name(fields: &Mapping) -> Option<String> {
    ["name", "policy_name"]
        .iter()
        .find_map(|key| match fields.get(*key) {
            Some(Value::String(name)) if !name.trim().is_empty() => Some(name.trim().to_string()),
            _ => None,
        })
}

/// Hand-authored flags: native booleans or "true"/"false" in any case.
/// Anything else counts as false.
pub fn bool_like(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s.trim().eq_ignore_ascii_case("true"),
        _ => false,
    }
}

/// Expand directories into their YAML files, keeping argument order
pub fn expand_inputs(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for path in paths {
        if path.as_os_str() == "-" || !path.is_dir() {
            files.push(path.clone());
            continue;
        }

        let mut found = Vec::new();
        for entry in WalkDir::new(path).sort_by_file_name() {
            let entry = entry.map_err(|e| unreadable(path, e))?;
            if entry.file_type().is_file() && is_yaml(entry.path()) {
                found.push(entry.into_path());
            }
        }
        if found.is_empty() {
            log::warn!("no YAML files found in {}", path.display());
        }
        files.extend(found);
    }

    Ok(files)
}

fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yml" | "yaml")
    )
}

fn read_source(path: &Path) -> Result<Source> {
    if path.as_os_str() == "-" {
        let mut content = String::new();
        std::io::stdin()
            .read_to_string(&mut content)
            .map_err(|e| Error::malformed("<stdin>", format!("unreadable: {e}")))?;
        return Ok(Source::new("<stdin>", content));
    }

    let content = std::fs::read_to_string(path).map_err(|e| unreadable(path, e))?;
    Ok(Source::new(path.display().to_string(), content))
}

fn unreadable(path: &Path, err: impl std::fmt::Display) -> Error {
    Error::malformed(path.display().to_string(), format!("unreadable: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_parse_list_of_records() {
        let yaml = r#"
- name: dns
  running_default: true
  staging_default: false
  rules:
    - protocol: udp
      destination: 10.0.0.2
      ports: "53"
- name: proxy
"#;
        let groups = parse_source(yaml, "groups.yml").unwrap();
        assert_eq!(groups.len(), 2);

        assert_eq!(groups[0].name, "dns");
        assert!(groups[0].running_default);
        assert!(!groups[0].staging_default);
        assert_eq!(groups[0].rules[0]["destination"], "10.0.0.2");

        assert_eq!(groups[1].name, "proxy");
        assert!(!groups[1].running_default);
        assert_eq!(groups[1].rules, serde_json::json!([]));
    }

    #[test]
    fn test_parse_single_record_with_policy_name() {
        let yaml = "policy_name: legacy\nrunning_default: True\n";
        let groups = parse_source(yaml, "legacy.yml").unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].name, "legacy");
        assert!(groups[0].running_default);
    }

    #[test]
    fn test_bool_like_is_lenient() {
        let yaml = r#"
- { name: a, running_default: "TRUE", staging_default: "False" }
- { name: b, running_default: "yes", staging_default: 1 }
- { name: c, running_default: " true ", staging_default: true }
"#;
        let groups = parse_source(yaml, "flags.yml").unwrap();
        assert!(groups[0].running_default);
        assert!(!groups[0].staging_default);
        assert!(!groups[1].running_default);
        assert!(!groups[1].staging_default);
        assert!(groups[2].running_default);
        assert!(groups[2].staging_default);
    }

    #[test]
    fn test_missing_name_is_malformed() {
        let err = parse_source("- running_default: true\n", "bad.yml").unwrap_err();
        match err {
            Error::MalformedInput {
                source_name,
                message,
            } => {
                assert_eq!(source_name, "bad.yml");
                assert!(message.contains("no name"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_invalid_yaml_is_malformed() {
        let err = parse_source("- name: [unclosed\n", "broken.yml").unwrap_err();
        assert!(matches!(err, Error::MalformedInput { .. }));

        let err = parse_source("just a string", "scalar.yml").unwrap_err();
        assert!(matches!(err, Error::MalformedInput { .. }));
    }

    #[test]
    fn test_empty_source_has_no_groups() {
        assert!(parse_source("", "empty.yml").unwrap().is_empty());
    }

    #[test]
    fn test_later_source_wins() {
        let sources = vec![
            Source::new("a.yml", "- { name: web, running_default: true }"),
            Source::new("b.yml", "- { name: web, staging_default: true }"),
        ];
        let state = load_sources(sources, LoadOptions::default()).unwrap();

        let web = state.get("web").unwrap();
        assert!(!web.running_default);
        assert!(web.staging_default);
        assert_eq!(state.origin("web"), Some("b.yml"));
    }

    #[test]
    fn test_strict_rejects_duplicates() {
        let sources = vec![
            Source::new("a.yml", "- name: web"),
            Source::new("b.yml", "- name: web"),
        ];
        let err = load_sources(sources, LoadOptions { strict: true }).unwrap_err();
        match err {
            Error::DuplicateGroup {
                name,
                first,
                second,
            } => {
                assert_eq!(name, "web");
                assert_eq!(first, "a.yml");
                assert_eq!(second, "b.yml");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_load_paths_expands_directories() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("nested");
        fs::create_dir(&nested).unwrap();
        fs::write(dir.path().join("b.yml"), "- name: beta").unwrap();
        fs::write(dir.path().join("a.yaml"), "- name: alpha").unwrap();
        fs::write(nested.join("c.yml"), "name: gamma").unwrap();
        fs::write(dir.path().join("notes.txt"), "not yaml").unwrap();

        let files = expand_inputs(&[dir.path().to_path_buf()]).unwrap();
        assert_eq!(files.len(), 3);
        assert!(files[0].ends_with("a.yaml"));
        assert!(files[1].ends_with("b.yml"));

        let state = load_paths(&[dir.path().to_path_buf()], LoadOptions::default()).unwrap();
        let names: Vec<&String> = state.names().collect();
        assert_eq!(names, ["alpha", "beta", "gamma"]);
    }

    #[test]
    fn test_load_paths_missing_file() {
        let err = load_paths(
            &[PathBuf::from("/nonexistent/groups.yml")],
            LoadOptions::default(),
        )
        .unwrap_err();
        match err {
            Error::MalformedInput {
                source_name,
                message,
            } => {
                assert_eq!(source_name, "/nonexistent/groups.yml");
                assert!(message.starts_with("unreadable"), "{message}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_strict_allows_repeat_within_one_source() {
        let sources = vec![Source::new(
            "a.yml",
            "- { name: web, running_default: true }\n- { name: web, staging_default: true }",
        )];
        let state = load_sources(sources, LoadOptions { strict: true }).unwrap();

        let web = state.get("web").unwrap();
        assert!(!web.running_default);
        assert!(web.staging_default);
        assert_eq!(state.origin("web"), Some("a.yml"));
    }
}
