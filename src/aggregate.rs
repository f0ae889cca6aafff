use serde::Serialize;
use crate::classify::{ClassificationResult, ScanFilters, SignatureStatus};

/// What the report renderer gets to work with.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Aggregate {
    /// Surviving entries, most recent first.
    Entries(Vec<ClassificationResult>),
    /// Records were classified but every one was filtered out.
    NoMatches { classified: usize },
    /// The input held no usable records.
    NoRecords,
}

/// Which of the three aggregate shapes a report was built from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportOutcome { Entries, NoMatches, NoRecords }

impl Aggregate {
    pub fn kind(&self) -> ReportOutcome {
        match self { Aggregate::Entries(_) => ReportOutcome::Entries, Aggregate::NoMatches { .. } => ReportOutcome::NoMatches, Aggregate::NoRecords => ReportOutcome::NoRecords }
    }

    pub fn entries(&self) -> &[ClassificationResult] {
        match self { Aggregate::Entries(v) => v, _ => &[] }
    }
}

/// Drops `NotFound` entries when any filter is active, then sorts by time descending.
pub fn aggregate(mut results: Vec<ClassificationResult>, filters: ScanFilters) -> Aggregate {
    if results.is_empty() { return Aggregate::NoRecords; }
    let classified = results.len();
    if filters.any() { results.retain(|r| r.signature != SignatureStatus::NotFound); }
    if results.is_empty() { return Aggregate::NoMatches { classified }; }
    results.sort_by(|a, b| b.execution_time.cmp(&a.execution_time));
    Aggregate::Entries(results)
}
