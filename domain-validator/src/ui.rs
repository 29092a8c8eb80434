//! Display logic for the domain-validator CLI.
//!
//! Styled header and run summary for the human-readable mode. Everything
//! goes through the `console` crate; `--json` bypasses this module.

use console::{pad_str, style, Alignment};
use domain_validator_lib::{PassReport, RunSummary, StatsSnapshot, ValidatorConfig};
use std::time::Duration;

use crate::Args;

// ── Header ───────────────────────────────────────────────────────────────────

/// Print a styled header before the first batch is sent.
pub fn print_header(args: &Args, config: &ValidatorConfig, row_count: usize) {
    println!(
        "{} {} {}",
        style("domain-validator").bold(),
        style(format!("v{}", env!("CARGO_PKG_VERSION"))).dim(),
        style(format!(
            "- Validating {} row{} from {}",
            row_count,
            plural(row_count),
            args.source
        ))
        .dim(),
    );

    let mut meta_parts = vec![
        format!("Batch size: {}", config.batch_size),
        format!("Batch timeout: {}s", config.batch_timeout.as_secs()),
        format!(
            "Failed rows: {}",
            if config.include_failed { "kept" } else { "dropped" }
        ),
    ];
    if config.enable_retry {
        meta_parts.push(format!("Retry: {}", config.retry_scope));
    }

    println!("{}", style(meta_parts.join(" | ")).dim());
    println!();
}

// ── Summary ──────────────────────────────────────────────────────────────────

/// Print the final summary bar, then the problem breakdown.
pub fn print_summary(summary: &RunSummary, args: &Args) {
    let stats = &summary.stats;

    println!(
        "  {}",
        style("────────────────────────────────────────────────────").dim()
    );
    println!(
        "  {} row{} written in {:.1}s  {}  {}  {}  {}",
        style(stats.written).bold(),
        plural(stats.written as usize),
        Duration::from_millis(summary.elapsed_ms).as_secs_f64(),
        style("|").dim(),
        style(format!("{} parked", stats.invalid_domains)).red(),
        style("|").dim(),
        style(format!("{} failed", stats.failed_requests)).yellow(),
    );

    if args.debug {
        print_pass(&summary.first_pass);
        if let Some(retry) = &summary.retry_pass {
            print_pass(retry);
        }
    }

    print_problem_summary(stats);
    println!("  {} {}", style("Output:").dim(), args.dest);
}

fn print_pass(pass: &PassReport) {
    let name = pass.pass.to_string();
    let label = pad_str(&name, 12, Alignment::Left, None);
    println!(
        "  {} {}  {} batch{} of {}  {} requests  {} abandoned  {:.1}s",
        style("•").dim(),
        style(label).cyan(),
        pass.batches,
        if pass.batches == 1 { "" } else { "es" },
        pass.batch_size,
        pass.dispatched,
        pass.abandoned,
        Duration::from_millis(pass.elapsed_ms).as_secs_f64(),
    );
}

/// Print the non-zero problem counters, if any.
pub fn print_problem_summary(stats: &StatsSnapshot) {
    let lines = problem_lines(stats);
    if lines.is_empty() {
        return;
    }

    println!("  {}", style("Some rows need a second look:").yellow());
    for line in lines {
        println!("  {} {}", style("•").dim(), line);
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────────

fn problem_lines(stats: &StatsSnapshot) -> Vec<String> {
    [
        (stats.timeouts, "request timeout", "request timeouts"),
        (stats.cancelled, "cancelled request", "cancelled requests"),
        (stats.abandoned, "request abandoned by a batch timeout", "requests abandoned by a batch timeout"),
        (stats.retry_queued, "row retried", "rows retried"),
        (stats.skipped_rows, "row without a usable URL", "rows without a usable URL"),
        (stats.duplicate_urls, "duplicate URL collapsed", "duplicate URLs collapsed"),
        (stats.write_errors, "row could not be written", "rows could not be written"),
    ]
    .into_iter()
    .filter(|(count, _, _)| *count > 0)
    .map(|(count, one, many)| format!("{} {}", count, if count == 1 { one } else { many }))
    .collect()
}

fn plural(count: usize) -> &'static str {
    if count == 1 {
        ""
    } else {
        "s"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_problem_lines_skip_zero_counters() {
        assert!(problem_lines(&StatsSnapshot::default()).is_empty());

        let stats = StatsSnapshot {
            timeouts: 1,
            skipped_rows: 3,
            ..Default::default()
        };
        assert_eq!(
            problem_lines(&stats),
            vec![
                "1 request timeout".to_string(),
                "3 rows without a usable URL".to_string(),
            ]
        );
    }

    #[test]
    fn test_problem_lines_ignore_outcome_counters() {
        // Parked and failed counts are shown on the summary bar instead.
        let stats = StatsSnapshot {
            failed_requests: 4,
            invalid_domains: 2,
            written: 10,
            ..Default::default()
        };
        assert!(problem_lines(&stats).is_empty());
    }

    #[test]
    fn test_plural() {
        assert_eq!(plural(0), "s");
        assert_eq!(plural(1), "");
        assert_eq!(plural(2), "s");
    }
}
