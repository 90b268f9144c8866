use asgkit::{ActionKind, Report, ReportMode, ScanReport};
use colored::{ColoredString, Colorize};

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Print a warning message
pub fn warn(msg: &str) {
    println!("{} {}", "⚠".yellow(), msg);
}

// ============================================================================
// Reconcile Report
// ============================================================================

fn kind_symbol(kind: ActionKind) -> ColoredString {
    match kind {
        ActionKind::Create => "+".green(),
        ActionKind::Delete => "-".red(),
        ActionKind::BindRunning | ActionKind::BindStaging => "↑".cyan(),
        ActionKind::UnbindRunning | ActionKind::UnbindStaging => "↓".yellow(),
    }
}

/// One-line summary of a report, without colors
pub fn summary_line(report: &Report) -> String {
    let verb = match report.mode {
        ReportMode::Advising => "would be applied",
        ReportMode::Executing => "applied",
    };
    let mut line = format!("{} {} {}", report.total(), plural(report.total(), "change"), verb);
    if !report.protected.is_empty() {
        line.push_str(&format!(", {} protected", report.protected.len()));
    }
    if !report.failures.is_empty() {
        line.push_str(&format!(", {} failed", report.failures.len()));
    }
    line
}

fn plural(count: usize, word: &str) -> String {
    if count == 1 {
        word.to_string()
    } else {
        format!("{word}s")
    }
}

/// Display a reconcile report grouped by action kind
pub fn display_report(report: &Report) {
    if report.is_empty() && report.protected.is_empty() {
        println!();
        println!("  {} Security groups are in sync", "✓".green());
        return;
    }

    let title = match report.mode {
        ReportMode::Advising => "Planned Changes",
        ReportMode::Executing => "Applied Changes",
    };

    println!();
    println!("┌─ {} ─────────────────────────────────────────┐", title.bold());
    println!("│");

    for kind in ActionKind::ALL {
        let names = report.names(kind);
        if names.is_empty() {
            continue;
        }
        println!("│ {}", kind.label().bold());
        for name in names {
            println!("│   {} {}", kind_symbol(kind), name);
        }
        println!("│");
    }

    if !report.protected.is_empty() {
        println!("│ {}", "Protected (org/space bindings)".bold());
        for name in &report.protected {
            println!("│   {} {}", "○".dimmed(), name.dimmed());
        }
        println!("│");
    }

    if !report.failures.is_empty() {
        println!("│ {}", "Failed".red().bold());
        for failure in &report.failures {
            println!(
                "│   {} {} {} {}",
                "✗".red(),
                failure.action,
                failure.group,
                failure.error.dimmed()
            );
        }
        println!("│");
    }

    println!("├─────────────────────────────────────────────────────┤");
    println!("│ Summary: {}", summary_line(report));
    println!("└─────────────────────────────────────────────────────┘");
}

// ============================================================================
// Scan Report
// ============================================================================

/// Display scan violations
pub fn display_scan(report: &ScanReport) {
    println!();
    if report.is_clean() {
        success(&format!(
            "{} security {} checked, no policy violations",
            report.checked,
            plural(report.checked, "group")
        ));
        return;
    }

    println!(
        "{} {} of {} security {} violate network policy",
        "✗".red(),
        report.violations.len(),
        report.checked,
        plural(report.checked, "group")
    );
    for violation in &report.violations {
        println!("  {} {}", violation.name.bold(), violation.reason.dimmed());
    }
}
