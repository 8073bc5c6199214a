//! Console report
//!
//! Renders an [`AnalysisReport`] as the plain-text report printed by the
//! `tempora` and `tempora-cli` binaries.

use std::fmt::Write;

use crate::clock::{format_difference, AnalysisReport, ClockDetails};

const TITLE: &str = "TEMPORA - CLOCK SYNCHRONIZATION SYSTEM";

fn header(out: &mut String, title: &str) {
    let _ = writeln!(out, "🕰️  {}", title);
    let _ = writeln!(out, "{}", "=".repeat(50));
}

fn section(out: &mut String, icon: &str, title: &str) {
    let _ = writeln!(out);
    let _ = writeln!(out, "{} {}:", icon, title);
    let _ = writeln!(out, "{}", "-".repeat(30));
}

/// One line per clock: icon, name, location, time and signed difference
pub fn clock_line(clock: &ClockDetails) -> String {
    let location = if clock.location.is_empty() {
        String::new()
    } else {
        format!(" ({})", clock.location)
    };
    format!(
        "{} {}{}: {} ({})",
        clock.status.icon(),
        clock.name,
        location,
        clock.time,
        format_difference(clock.difference)
    )
}

/// Render the full report
///
/// `advice` holds the per-clock adjustment lines from
/// [`ClockRegistry::recommendations_per_clock`](crate::clock::ClockRegistry::recommendations_per_clock).
pub fn render_report(report: &AnalysisReport, advice: &[String]) -> String {
    let mut out = String::new();
    let summary = &report.summary;

    header(&mut out, TITLE);
    let _ = writeln!(out, "📍 Grand Clock Tower Time: {}", report.reference_time);
    if report.tolerance > 0 {
        let _ = writeln!(out, "🎯 Tolerance: ±{} min", report.tolerance);
    }

    section(&mut out, "📊", "CLOCK ANALYSIS");
    if report.clocks.is_empty() {
        let _ = writeln!(out, "No clocks registered");
    }
    for clock in &report.clocks {
        let _ = writeln!(out, "{}", clock_line(clock));
    }

    section(&mut out, "📈", "SUMMARY STATISTICS");
    let _ = writeln!(out, "Total Clocks: {}", summary.total_clocks);
    let _ = writeln!(out, "Synchronized: {}", summary.synchronized);
    let _ = writeln!(out, "Running Ahead: {}", summary.ahead);
    let _ = writeln!(out, "Running Behind: {}", summary.behind);
    let _ = writeln!(out, "Synchronization Rate: {}%", summary.synchronization_rate);
    let _ = writeln!(out, "Max Difference: {} minutes", summary.max_difference);
    let _ = writeln!(out, "Average Difference: {:.1} minutes", summary.average_difference);
    let _ = writeln!(out, "Median Difference: {:.1} minutes", summary.median_difference);
    let _ = writeln!(out, "Total System Drift: {:+} minutes", summary.total_drift);

    if summary.worst_performer.is_some() || summary.best_performer.is_some() {
        section(&mut out, "🏆", "PERFORMANCE HIGHLIGHTS");
        if let Some(worst) = &summary.worst_performer {
            let _ = writeln!(
                out,
                "🚨 Most Misaligned: {} ({} min off)",
                worst.name, worst.absolute_difference
            );
        }
        if let Some(best) = &summary.best_performer {
            let _ = writeln!(
                out,
                "⭐ Best Non-Synchronized: {} ({} min off)",
                best.name, best.absolute_difference
            );
        }
    }

    if !report.insights.is_empty() {
        section(&mut out, "💡", "SYSTEM INSIGHTS");
        for insight in &report.insights {
            let _ = writeln!(out, "{}", insight);
        }
    }

    section(&mut out, "🔧", "SYNCHRONIZATION RECOMMENDATIONS");
    for line in advice.iter().chain(&report.recommendations) {
        let _ = writeln!(out, "{}", line);
    }

    section(&mut out, "📋", "TIME DIFFERENCES ARRAY");
    let differences = serde_json::to_string(&report.differences).unwrap_or_default();
    let _ = writeln!(out, "{}", differences);

    out
}
