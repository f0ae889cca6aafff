use crate::aggregate::ReportOutcome;
use crate::{ScanReport, TimeZone, format_time};

pub fn render_markdown(rep: &ScanReport, tz: TimeZone, tfmt: Option<&str>) -> String {
    let mut s = String::new();
    s.push_str("# AmScan Report\n\n");
    s.push_str(&format!("Source: `{}`\n\n", rep.source));
    s.push_str(&format!("Generated: {}\n\n", format_time(rep.generated_at, tz, tfmt)));
    match rep.session_start {
        Some(t) => s.push_str(&format!("User Logon Time: {}\n\n", format_time(t, tz, tfmt))),
        None => s.push_str("User Logon Time: unknown\n\n"),
    }

    s.push_str("## Summary\n");
    s.push_str(&format!("- Lines Read: {}\n", rep.total_lines));
    s.push_str(&format!("- Records: {}\n", rep.records));
    s.push_str(&format!("- Skipped Lines: {}\n", rep.malformed_lines));
    s.push_str(&format!("- Only After Session: {}\n", if rep.filters.only_after_session { "yes" } else { "no" }));
    s.push_str(&format!("- Only Unsigned/Cheat: {}\n", if rep.filters.only_suspect { "yes" } else { "no" }));
    s.push_str(&format!("- Reported Entries: {}\n\n", rep.entries.len()));

    s.push_str("## Entries\n");
    if rep.entries.is_empty() {
        match rep.outcome {
            ReportOutcome::NoMatches => s.push_str("No entries matched the selected filters.\n"),
            ReportOutcome::Entries | ReportOutcome::NoRecords => s.push_str("No execution records found.\n"),
        }
        return s;
    }
    s.push_str("| Executed Time | Signature | Content Match | Path |\n");
    s.push_str("|---|---|---|---|\n");
    for e in &rep.entries {
        s.push_str(&format!("| {} | {} | {} | `{}` |\n", format_time(e.execution_time, tz, tfmt), e.signature.as_str(), if e.matched { "YES" } else { "NO" }, e.path.replace('|', "\\|")));
    }
    s
}
