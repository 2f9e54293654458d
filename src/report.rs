//! Plain-text renderings of the schedule and the execution history.

use std::fmt::Write;

use cronhands_core::{JobMetricStatistics, ScheduledJobSnapshot};

/// One line per scheduled job.
pub(crate) fn schedule_table(jobs: &[ScheduledJobSnapshot]) -> String {
    let mut out = String::from("--- Current System Schedule ---\n");
    if jobs.is_empty() {
        out.push_str("No jobs scheduled.\n");
        return out;
    }
    for job in jobs {
        let next_run = job
            .next_fire_time
            .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
            .unwrap_or_else(|| "never".to_string());
        let _ = writeln!(
            out,
            "Job: {} | Group: {} | Next run: {} | State: {}",
            job.name, job.group, next_run, job.state
        );
    }
    out
}

/// Success rate and per-job durations over the retained history.
pub(crate) fn health_report(stats: &JobMetricStatistics) -> String {
    let mut out = String::from("=============== HEALTH REPORT ===============\n");
    if stats.is_empty() {
        out.push_str("No executions recorded yet.\n");
        return out;
    }

    let _ = writeln!(out, "Success rate: {:.2}%", stats.success_percentage());
    let _ = writeln!(
        out,
        "Total runs:   {} ({} failed)",
        stats.total_runs(),
        stats.failure_count()
    );
    let _ = writeln!(out, "{:<32} {:>10} {:>10} {:>6}", "Job", "Avg ms", "Max ms", "Runs");
    for (job, duration) in stats.duration_stats_by_job() {
        let _ = writeln!(
            out,
            "{:<32} {:>10.1} {:>10.0} {:>6}",
            job, duration.average_ms, duration.max_ms, duration.count
        );
    }
    if let Some(slowest) = stats.slowest_execution() {
        let _ = writeln!(
            out,
            "Slowest: {} ({} ms at {})",
            slowest.name,
            slowest.duration_ms,
            slowest.start_time.format("%H:%M:%S")
        );
    }
    out
}
