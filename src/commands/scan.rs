//! `asgsync scan`

use crate::Context;
use crate::cli::ScanArgs;
use crate::config::ScanSection;
use crate::ui;
use anyhow::{Context as _, Result, bail};
use asgkit::ScanPolicy;
use asgkit::policy::DEFAULT_MIN_PREFIX;
use std::time::Instant;

pub fn run(ctx: &Context, args: ScanArgs) -> Result<()> {
    let policy = build_policy(&args, &ctx.config.scan)?;
    log::debug!(
        "policy: min /{}, banned {:?}",
        policy.min_prefix(),
        policy.banned()
    );

    let client = super::connect(ctx, &args.platform)?;

    let start = Instant::now();
    let groups = client
        .list_security_groups()
        .context("Failed to list security groups")?;
    let listed = start.elapsed();

    let start = Instant::now();
    let report = policy.scan(groups.iter().map(|g| (g.name.as_str(), &g.rules)));
    log::debug!(
        "list ({:.2}s): {} groups, check ({:.2}s): failing {:?}",
        listed.as_secs_f64(),
        groups.len(),
        start.elapsed().as_secs_f64(),
        report.violations.iter().map(|v| &v.name).collect::<Vec<_>>()
    );

    if args.json {
        println!("{}", report.to_json().context("Failed to serialize scan result")?);
    } else if !(ctx.quiet && report.is_clean()) {
        ui::display_scan(&report);
    }

    if !report.is_clean() {
        bail!(
            "{} security group(s) violate network policy",
            report.violations.len()
        );
    }
    Ok(())
}

/// Merge configured policy with command-line flags
fn build_policy(args: &ScanArgs, section: &ScanSection) -> Result<ScanPolicy> {
    let min_prefix = args
        .min_cidr
        .or(section.min_cidr)
        .unwrap_or(DEFAULT_MIN_PREFIX);
    let mut policy = ScanPolicy::new(min_prefix);

    for network in section.banned_networks.iter().chain(&args.networks) {
        policy
            .ban(network)
            .with_context(|| format!("Invalid banned network: {network}"))?;
    }
    for name in section.skip.iter().chain(&args.skip) {
        policy.skip(name.as_str());
    }
    for pattern in section.skip_re.iter().chain(&args.skip_re) {
        policy.skip_matching(pattern)?;
    }

    if min_prefix < 8 {
        ui::warn(&format!("minimum prefix /{min_prefix} allows very wide destinations"));
    }
    Ok(policy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::PlatformArgs;
    use serde_json::json;

    fn args() -> ScanArgs {
        ScanArgs {
            skip_re: Vec::new(),
            skip: Vec::new(),
            networks: Vec::new(),
            min_cidr: None,
            json: false,
            platform: PlatformArgs::default(),
        }
    }

    #[test]
    fn test_default_min_prefix() {
        let policy = build_policy(&args(), &ScanSection::default()).unwrap();
        assert_eq!(policy.min_prefix(), 22);
    }

    #[test]
    fn test_flag_overrides_config() {
        let section = ScanSection {
            min_cidr: Some(20),
            ..ScanSection::default()
        };
        let mut args = args();
        assert_eq!(build_policy(&args, &section).unwrap().min_prefix(), 20);

        args.min_cidr = Some(26);
        assert_eq!(build_policy(&args, &section).unwrap().min_prefix(), 26);
    }

    #[test]
    fn test_config_and_flags_combine() {
        let section = ScanSection {
            banned_networks: vec!["10.0.0.0/8".into()],
            skip: vec!["public_networks".into()],
            ..ScanSection::default()
        };
        let mut args = args();
        args.networks.push("172.16.0.0-172.31.255.255".into());
        args.skip_re.push("^dns-".into());

        let policy = build_policy(&args, &section).unwrap();
        assert_eq!(policy.banned().len(), 2);
        assert!(policy.is_skipped("public_networks"));
        assert!(policy.is_skipped("dns-internal"));

        let rules = json!([{"destination": "172.20.1.0/24"}]);
        assert!(policy.check("app", &rules).is_some());
    }

    #[test]
    fn test_invalid_network_is_reported() {
        let mut args = args();
        args.networks.push("10.0.0.0/99".into());
        let err = build_policy(&args, &ScanSection::default()).unwrap_err();
        assert!(err.to_string().contains("10.0.0.0/99"));
    }
}
