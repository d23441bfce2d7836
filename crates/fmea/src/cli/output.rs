//! Plain-text rendering for the `report` and `status` commands.

use std::fmt::Write;

use crate::record::FailureModeRecord;
use crate::stats::Overview;
use crate::storage::StorageStats;

/// Longest text column shown before truncation.
const TEXT_WIDTH: usize = 24;

/// Render the dashboard as text: summary, histogram, top list and all records.
#[must_use]
pub fn render_report(overview: &Overview) -> String {
    let mut out = String::new();
    let summary = &overview.summary;

    let _ = writeln!(out, "Summary");
    let _ = writeln!(out, "-------");
    let _ = writeln!(out, "Entries:        {}", overview.records.len());
    let _ = writeln!(out, "Average RPN:    {:.2}", summary.average_rpn);
    let _ = writeln!(out, "Max RPN:        {}", summary.max_rpn);
    let _ = writeln!(out, "Min RPN:        {}", summary.min_rpn);
    let _ = writeln!(out, "High risk:      {}", summary.high_risk_count);
    let _ = writeln!(out);

    let _ = writeln!(out, "Risk distribution");
    let _ = writeln!(out, "-----------------");
    for bucket in overview.histogram.buckets() {
        let _ = writeln!(out, "{:<16}{}", bucket.label, bucket.count);
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "Top {} by RPN", overview.top.len());
    let _ = writeln!(out, "------------");
    write_table(&mut out, &overview.top);
    let _ = writeln!(out);

    let _ = writeln!(out, "All entries");
    let _ = writeln!(out, "-----------");
    write_table(&mut out, &overview.records);

    out
}

fn write_table(out: &mut String, records: &[FailureModeRecord]) {
    if records.is_empty() {
        let _ = writeln!(out, "(no entries)");
        return;
    }
    let _ = writeln!(
        out,
        "{:>5}  {:<w$}  {:<w$}  {:>2} {:>2} {:>2}  {:>4}",
        "ID",
        "Step",
        "Failure mode",
        "S",
        "O",
        "D",
        "RPN",
        w = TEXT_WIDTH
    );
    for r in records {
        let _ = writeln!(
            out,
            "{:>5}  {:<w$}  {:<w$}  {:>2} {:>2} {:>2}  {:>4}",
            r.id,
            truncate(&r.step, TEXT_WIDTH),
            truncate(&r.failure_mode, TEXT_WIDTH),
            r.severity,
            r.occurrence,
            r.detection,
            r.rpn,
            w = TEXT_WIDTH
        );
    }
}

/// Shorten `s` to at most `max` characters, marking the cut with `...`.
fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}

/// Render database status.
#[must_use]
pub fn render_status(path: &std::path::Path, stats: &StorageStats) -> String {
    let fmt_time = |t: Option<chrono::DateTime<chrono::Utc>>| {
        t.map_or_else(|| "-".to_string(), |t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
    };

    let mut out = String::new();
    let _ = writeln!(out, "fmea status");
    let _ = writeln!(out, "-----------");
    let _ = writeln!(out, "Database:      {}", path.display());
    let _ = writeln!(out, "Entries:       {}", stats.total_records);
    let _ = writeln!(out, "Oldest entry:  {}", fmt_time(stats.oldest_record));
    let _ = writeln!(out, "Newest entry:  {}", fmt_time(stats.newest_record));
    let _ = writeln!(out, "Size:          {} bytes", stats.db_size_bytes);
    out
}
