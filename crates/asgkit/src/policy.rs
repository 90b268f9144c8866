//! Network policy scan over security group rules
//!
//! Every destination of a group is collapsed into the smallest set of CIDR
//! blocks before checking, so a wide network split across several rules is
//! judged as a whole.

use crate::error::{Error, Result};
use ipnetwork::Ipv4Network;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::net::Ipv4Addr;

/// Default minimum prefix length of a destination block
pub const DEFAULT_MIN_PREFIX: u8 = 22;

/// Inclusive address interval, widened to avoid overflow at 255.255.255.255
type Interval = (u64, u64);

/// Policy applied to each group's rules
#[derive(Debug, Clone)]
pub struct ScanPolicy {
    min_prefix: u8,
    banned: Vec<Ipv4Network>,
    skip: BTreeSet<String>,
    skip_re: Vec<Regex>,
}

impl Default for ScanPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_PREFIX)
    }
}

impl ScanPolicy {
    pub fn new(min_prefix: u8) -> Self {
        Self {
            min_prefix,
            banned: Vec::new(),
            skip: BTreeSet::new(),
            skip_re: Vec::new(),
        }
    }

    pub fn min_prefix(&self) -> u8 {
        self.min_prefix
    }

    pub fn banned(&self) -> &[Ipv4Network] {
        &self.banned
    }

    /// Ban a network, address, range or comma-separated list of those
    pub fn ban(&mut self, text: &str) -> Result<()> {
        self.banned.extend(parse_destination(text)?);
        self.banned = collapse(&self.banned);
        Ok(())
    }

    /// Exempt a group by exact name
    pub fn skip(&mut self, name: impl Into<String>) {
        self.skip.insert(name.into());
    }

    /// Exempt groups whose name matches a regular expression
    pub fn skip_matching(&mut self, pattern: &str) -> Result<()> {
        let re = Regex::new(pattern).map_err(|source| Error::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;
        self.skip_re.push(re);
        Ok(())
    }

    pub fn is_skipped(&self, name: &str) -> bool {
        self.skip.contains(name) || self.skip_re.iter().any(|re| re.is_match(name))
    }

    /// Check one group, returning the reason it fails, if any
    pub fn check(&self, name: &str, rules: &Value) -> Option<String> {
        if self.is_skipped(name) {
            log::debug!("skipping '{name}'");
            return None;
        }

        let rules = match rules {
            Value::Null => return None,
            Value::Array(rules) => rules,
            _ => return Some("rules are not a list".to_string()),
        };

        let mut networks = Vec::new();
        for (index, rule) in rules.iter().enumerate() {
            let Some(destination) = rule.get("destination") else {
                return Some(format!("rule {} has no destination", index + 1));
            };
            let Some(destination) = destination.as_str() else {
                return Some(format!("rule {} has a non-string destination", index + 1));
            };
            match parse_destination(destination) {
                Ok(parsed) => networks.extend(parsed),
                Err(_) => return Some(format!("invalid destination '{destination}'")),
            }
        }

        for block in collapse(&networks) {
            if block.prefix() < self.min_prefix {
                log::debug!("{name} rule {block} fails /{} check", self.min_prefix);
                return Some(format!("{block} is wider than /{}", self.min_prefix));
            }
            if let Some(banned) = self.banned.iter().find(|b| overlaps(&block, b)) {
                log::debug!("{name} rule {block} fails banned nets");
                return Some(format!("{block} overlaps banned network {banned}"));
            }
        }
        None
    }

    /// Check every group, in the order given
    pub fn scan<'a, I>(&self, groups: I) -> ScanReport
    where
        I: IntoIterator<Item = (&'a str, &'a Value)>,
    {
        let mut report = ScanReport::default();
        for (name, rules) in groups {
            report.checked += 1;
            if let Some(reason) = self.check(name, rules) {
                report.violations.push(Violation {
                    name: name.to_string(),
                    reason,
                });
            }
        }
        report
    }
}

/// A group failing the policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub name: String,
    pub reason: String,
}

/// Result of a scan
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanReport {
    pub violations: Vec<Violation>,
    pub checked: usize,
}

impl ScanReport {
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Parse a rule destination into CIDR blocks.
///
/// Accepts `10.0.0.1`, `10.0.0.0/24`, `10.0.0.1-10.0.0.9` and comma-separated
/// lists of those.
pub fn parse_destination(text: &str) -> Result<Vec<Ipv4Network>> {
    let mut networks = Vec::new();
    for part in text.split(',').map(str::trim) {
        if part.is_empty() {
            return Err(Error::InvalidNetwork(text.to_string()));
        }
        match part.split_once('-') {
            Some((start, end)) => {
                let start = parse_addr(start.trim(), text)?;
                let end = parse_addr(end.trim(), text)?;
                if start > end {
                    return Err(Error::InvalidNetwork(text.to_string()));
                }
                networks.extend(summarize((
                    u64::from(u32::from(start)),
                    u64::from(u32::from(end)),
                )));
            }
            None => {
                let network: Ipv4Network = part
                    .parse()
                    .map_err(|_| Error::InvalidNetwork(text.to_string()))?;
                networks.push(normalize(network));
            }
        }
    }
    Ok(networks)
}

fn parse_addr(addr: &str, text: &str) -> Result<Ipv4Addr> {
    addr.parse()
        .map_err(|_| Error::InvalidNetwork(text.to_string()))
}

/// Merge overlapping and adjacent blocks into the smallest covering set
pub fn collapse(networks: &[Ipv4Network]) -> Vec<Ipv4Network> {
    let mut intervals: Vec<Interval> = networks.iter().map(interval).collect();
    intervals.sort_unstable();

    let mut merged: Vec<Interval> = Vec::with_capacity(intervals.len());
    for (start, end) in intervals {
        match merged.last_mut() {
            Some(last) if start <= last.1 + 1 => last.1 = last.1.max(end),
            _ => merged.push((start, end)),
        }
    }

    merged.into_iter().flat_map(summarize).collect()
}

fn interval(network: &Ipv4Network) -> Interval {
    let start = u64::from(u32::from(network.network()));
    let size = 1u64 << (32 - u32::from(network.prefix()));
    (start, start + size - 1)
}

fn overlaps(a: &Ipv4Network, b: &Ipv4Network) -> bool {
    let (a_start, a_end) = interval(a);
    let (b_start, b_end) = interval(b);
    a_start <= b_end && b_start <= a_end
}

/// Clear host bits, so `10.0.0.7/24` becomes `10.0.0.0/24`
fn normalize(network: Ipv4Network) -> Ipv4Network {
    Ipv4Network::new(network.network(), network.prefix()).unwrap_or(network)
}

/// Smallest list of aligned blocks exactly covering an interval
fn summarize((mut start, end): Interval) -> Vec<Ipv4Network> {
    let mut blocks = Vec::new();
    while start <= end {
        let align = if start == 0 { 32 } else { start.trailing_zeros().min(32) };
        let fit = 63 - (end - start + 1).leading_zeros();
        let bits = align.min(fit);
        let addr = Ipv4Addr::from(start as u32);
        if let Ok(block) = Ipv4Network::new(addr, (32 - bits) as u8) {
            blocks.push(block);
        }
        start += 1u64 << bits;
    }
    blocks
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn nets(list: &[&str]) -> Vec<Ipv4Network> {
        list.iter().map(|n| n.parse().unwrap()).collect()
    }

    fn names(report: &ScanReport) -> Vec<&str> {
        report.violations.iter().map(|v| v.name.as_str()).collect()
    }

    #[test]
    fn test_parse_single_address_and_cidr() {
        assert_eq!(parse_destination("10.0.0.1").unwrap(), nets(&["10.0.0.1/32"]));
        assert_eq!(parse_destination("10.0.0.7/24").unwrap(), nets(&["10.0.0.0/24"]));
    }

    #[test]
    fn test_parse_range_summarizes() {
        assert_eq!(
            parse_destination("10.0.0.0-10.0.0.255").unwrap(),
            nets(&["10.0.0.0/24"])
        );
        assert_eq!(
            parse_destination("10.0.0.1-10.0.0.6").unwrap(),
            nets(&["10.0.0.1/32", "10.0.0.2/31", "10.0.0.4/31", "10.0.0.6/32"])
        );
        assert_eq!(
            parse_destination("0.0.0.0-255.255.255.255").unwrap(),
            nets(&["0.0.0.0/0"])
        );
    }

    #[test]
    fn test_parse_comma_list() {
        assert_eq!(
            parse_destination("10.0.0.1, 10.0.1.0/24").unwrap(),
            nets(&["10.0.0.1/32", "10.0.1.0/24"])
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            parse_destination("not-an-ip"),
            Err(Error::InvalidNetwork(_))
        ));
        assert!(parse_destination("10.0.0.9-10.0.0.1").is_err());
        assert!(parse_destination("10.0.0.1,").is_err());
        assert!(parse_destination("10.0.0.0/33").is_err());
    }

    #[test]
    fn test_collapse_merges_adjacent_blocks() {
        assert_eq!(
            collapse(&nets(&["10.0.1.0/24", "10.0.0.0/24", "10.0.0.4/30"])),
            nets(&["10.0.0.0/23"])
        );
        assert_eq!(
            collapse(&nets(&["10.0.0.0/24", "10.0.2.0/24"])),
            nets(&["10.0.0.0/24", "10.0.2.0/24"])
        );
    }

    #[test]
    fn test_prefix_check() {
        let policy = ScanPolicy::default();
        assert_eq!(
            policy.check("ok", &json!([{"destination": "10.0.0.0/22"}])),
            None
        );
        assert_eq!(
            policy.check("wide", &json!([{"destination": "10.0.0.0/16"}])),
            Some("10.0.0.0/16 is wider than /22".to_string())
        );
    }

    #[test]
    fn test_split_network_is_aggregated() {
        let policy = ScanPolicy::default();
        let rules = json!([
            {"protocol": "all", "destination": "10.0.0.0/22"},
            {"protocol": "all", "destination": "10.0.4.0/22"},
        ]);
        assert_eq!(
            policy.check("split", &rules),
            Some("10.0.0.0/21 is wider than /22".to_string())
        );
    }

    #[test]
    fn test_banned_overlap() {
        let mut policy = ScanPolicy::new(24);
        policy.ban("192.168.0.0/16").unwrap();

        let reason = policy
            .check("internal", &json!([{"destination": "192.168.10.0/24"}]))
            .unwrap();
        assert!(reason.contains("banned network 192.168.0.0/16"));
        assert_eq!(
            policy.check("public", &json!([{"destination": "8.8.8.8"}])),
            None
        );
    }

    #[test]
    fn test_missing_destination_fails() {
        let policy = ScanPolicy::default();
        assert_eq!(
            policy.check("icmp", &json!([{"destination": "10.0.0.1"}, {"protocol": "icmp"}])),
            Some("rule 2 has no destination".to_string())
        );
    }

    #[test]
    fn test_null_rules_pass() {
        assert_eq!(ScanPolicy::default().check("empty", &Value::Null), None);
    }

    #[test]
    fn test_skip_lists() {
        let mut policy = ScanPolicy::default();
        policy.skip("public_networks");
        policy.skip_matching("^legacy-").unwrap();

        let wide = json!([{"destination": "0.0.0.0-255.255.255.255"}]);
        let groups = [
            ("public_networks", &wide),
            ("legacy-app", &wide),
            ("modern-app", &wide),
        ];
        let report = policy.scan(groups);
        assert_eq!(report.checked, 3);
        assert_eq!(names(&report), ["modern-app"]);
        assert!(!report.is_clean());
    }

    #[test]
    fn test_invalid_skip_pattern() {
        let mut policy = ScanPolicy::default();
        assert!(matches!(
            policy.skip_matching("(unclosed"),
            Err(Error::InvalidPattern { .. })
        ));
    }

    #[test]
    fn test_report_json_shape() {
        let report = ScanReport {
            violations: vec![Violation {
                name: "wide".into(),
                reason: "10.0.0.0/8 is wider than /22".into(),
            }],
            checked: 2,
        };
        assert_eq!(
            serde_json::to_value(&report).unwrap(),
            json!({
                "violations": [{"name": "wide", "reason": "10.0.0.0/8 is wider than /22"}],
                "checked": 2
            })
        );
    }
}
