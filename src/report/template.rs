use std::fmt::{self, Write};

use super::metrics::{ReportMetrics, Trend};
use crate::models::{SessionMemory, SessionStats};

/// Report used when the narrative generator is unavailable. Built only from
/// the computed numbers, so it is always correct if terse.
pub fn fallback_report(
    memory: &SessionMemory,
    role: &str,
    stats: &SessionStats,
    metrics: &ReportMetrics,
) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = write_report(&mut out, memory, role, stats, metrics);
    out
}

fn write_report(
    out: &mut String,
    memory: &SessionMemory,
    role: &str,
    stats: &SessionStats,
    metrics: &ReportMetrics,
) -> fmt::Result {
    writeln!(out, "# Session report: {role}")?;
    writeln!(out)?;
    writeln!(out, "## Verdict")?;
    writeln!(
        out,
        "Final focus score **{}/100**, grade **{}**. {}",
        metrics.final_score,
        metrics.grade,
        verdict_line(metrics)
    )?;
    writeln!(out)?;
    writeln!(out, "## Numbers")?;
    writeln!(out, "| Metric | Value |")?;
    writeln!(out, "| --- | --- |")?;
    writeln!(out, "| Chunks observed | {} |", metrics.total_iterations)?;
    writeln!(
        out,
        "| Average / best / worst | {:.1} / {} / {} |",
        metrics.average_score, metrics.max_score, metrics.min_score
    )?;
    writeln!(out, "| Trend | {} |", metrics.trend.as_str())?;
    writeln!(out, "| Deep work | {:.1} min |", metrics.deep_work_minutes)?;
    writeln!(out, "| Distraction events | {} |", metrics.distraction_events)?;
    writeln!(out, "| Session length | {} s |", stats.duration_seconds)?;
    writeln!(out, "| Window switches | {} |", stats.total_switches)?;
    writeln!(
        out,
        "| Pauses | {} ({} s) |",
        stats.pause_count, stats.total_pause_seconds
    )?;
    writeln!(out, "| Time distracted | {} s |", stats.total_distraction_time)?;
    if let Some(clicked) = &stats.most_clicked {
        writeln!(out, "| Most clicked | {} ({} clicks) |", clicked.name, clicked.count)?;
    }

    if !stats.top_apps.is_empty() {
        writeln!(out)?;
        writeln!(out, "## Top applications")?;
        for app in &stats.top_apps {
            writeln!(out, "- {}: {} s", app.name, app.seconds)?;
        }
    }

    if !stats.recent_windows.is_empty() {
        writeln!(out)?;
        writeln!(out, "## Last windows")?;
        writeln!(out, "{}", stats.recent_windows.join(" -> "))?;
    }

    writeln!(out)?;
    writeln!(out, "## Observations")?;
    writeln!(out, "{}", memory.summary_so_far.trim())
}

fn verdict_line(metrics: &ReportMetrics) -> &'static str {
    if metrics.total_iterations == 0 {
        return "The session was too short to judge.";
    }
    match metrics.trend {
        Trend::Improving => "Your focus grew stronger as the session went on.",
        Trend::Declining => "Your focus faded as the session went on.",
        Trend::Stable => "Your focus held steady throughout.",
    }
}
