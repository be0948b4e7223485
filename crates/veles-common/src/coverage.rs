//! Coverage bookkeeping for decode passes.
//!
//! The container format is only partially understood, so every decoder
//! reports not just its result but an accounting of what it did with the
//! bytes: ranges it explained, ranges it explicitly could not interpret, and
//! whether it leaned on heuristics or forced skips to get through. The
//! downstream persistence layer aggregates these reports across files to
//! track how much of the format is actually recovered.

/// A byte range a decoder understood, with a structural label.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExplainedRange {
    /// Start offset, inclusive.
    pub start: usize,
    /// End offset, exclusive.
    pub end: usize,
    /// Structural path label, e.g. `"lod[0].vertices"`.
    pub label: String,
}

/// A byte range a decoder explicitly could not interpret.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UnknownRegion {
    /// Start offset, inclusive.
    pub start: usize,
    /// End offset, exclusive.
    pub end: usize,
    /// Context label when the surrounding structure is known,
    /// e.g. `"post_lod_data"`.
    pub label: Option<String>,
}

impl UnknownRegion {
    /// Slice the raw bytes of this region out of the decoded buffer.
    pub fn bytes<'a>(&self, data: &'a [u8]) -> &'a [u8] {
        let start = self.start.min(data.len());
        let end = self.end.min(data.len());
        &data[start..end]
    }
}

/// Bookkeeping of what a single decode pass understood.
///
/// Ranges may overlap when a corrective re-scan supersedes an earlier
/// unknown marking; the byte accounting resolves overlaps in favour of
/// explained ranges and never counts a byte twice.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CoverageReport {
    /// Total length in bytes of the decoded buffer.
    pub total: usize,
    /// Ranges the decoder understood.
    pub explained: Vec<ExplainedRange>,
    /// Ranges the decoder could not interpret.
    pub unknown: Vec<UnknownRegion>,
    /// At least one detection strategy returned a best-effort answer.
    pub used_heuristics: bool,
    /// At least one forward skip was forced without structural confirmation.
    pub used_forced_skip: bool,
    /// Values filtered out as implausible (e.g. header bytes misread as
    /// vertex positions), counted rather than silently dropped.
    pub anomalies: usize,
}

impl CoverageReport {
    /// Create a report for a buffer of `total` bytes.
    pub fn new(total: usize) -> Self {
        Self {
            total,
            ..Self::default()
        }
    }

    /// Record an explained range with a structural label.
    pub fn explain(&mut self, start: usize, end: usize, label: impl Into<String>) {
        if end > start {
            self.explained.push(ExplainedRange {
                start,
                end: end.min(self.total),
                label: label.into(),
            });
        }
    }

    /// Record an unexplained range.
    pub fn mark_unknown(&mut self, start: usize, end: usize) {
        self.mark_unknown_labeled(start, end, None);
    }

    /// Record an unexplained range with a context label.
    pub fn mark_unknown_labeled(&mut self, start: usize, end: usize, label: Option<String>) {
        if end > start {
            self.unknown.push(UnknownRegion {
                start,
                end: end.min(self.total),
                label,
            });
        }
    }

    /// Note that a heuristic branch was taken.
    pub fn flag_heuristics(&mut self) {
        self.used_heuristics = true;
    }

    /// Note that a forced skip was taken.
    pub fn flag_forced_skip(&mut self) {
        self.used_forced_skip = true;
    }

    /// Count implausible values filtered from the output.
    pub fn note_anomalies(&mut self, count: usize) {
        self.anomalies += count;
    }

    /// Total bytes covered by explained ranges, overlaps merged.
    pub fn bytes_explained(&self) -> usize {
        self.merged_explained().iter().map(|(s, e)| e - s).sum()
    }

    /// Explained ranges merged into a disjoint ascending interval set.
    pub fn merged_explained(&self) -> Vec<(usize, usize)> {
        let intervals: Vec<(usize, usize)> =
            self.explained.iter().map(|r| (r.start, r.end)).collect();
        merge(&intervals)
    }

    /// Total bytes covered by unknown ranges and not superseded by any
    /// explained range.
    pub fn bytes_unknown(&self) -> usize {
        let explained: Vec<(usize, usize)> =
            self.explained.iter().map(|r| (r.start, r.end)).collect();
        let explained = merge(&explained);

        let unknown: Vec<(usize, usize)> = self.unknown.iter().map(|r| (r.start, r.end)).collect();
        let unknown = merge(&unknown);

        unknown
            .iter()
            .map(|&(start, end)| {
                let mut remaining = end - start;
                for &(es, ee) in &explained {
                    let os = es.max(start);
                    let oe = ee.min(end);
                    if oe > os {
                        remaining -= oe - os;
                    }
                }
                remaining
            })
            .sum()
    }

    /// Whether the pass explained every byte with no heuristics or skips.
    pub fn is_complete(&self) -> bool {
        !self.used_heuristics
            && !self.used_forced_skip
            && self.bytes_explained() == self.total
            && self.bytes_unknown() == 0
    }

    /// Fold another report's flags and anomaly count into this one.
    ///
    /// Used when a decode pass delegates a sub-range to another decoder and
    /// wants its caveats to survive.
    pub fn absorb_flags(&mut self, other: &CoverageReport) {
        self.used_heuristics |= other.used_heuristics;
        self.used_forced_skip |= other.used_forced_skip;
        self.anomalies += other.anomalies;
    }
}

/// Merge sorted-or-unsorted intervals into a disjoint ascending set.
fn merge(intervals: &[(usize, usize)]) -> Vec<(usize, usize)> {
    let mut sorted: Vec<(usize, usize)> = intervals.iter().copied().filter(|r| r.1 > r.0).collect();
    sorted.sort_unstable();

    let mut merged: Vec<(usize, usize)> = Vec::with_capacity(sorted.len());
    for (start, end) in sorted {
        match merged.last_mut() {
            Some(last) if start <= last.1 => last.1 = last.1.max(end),
            _ => merged.push((start, end)),
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_additivity_when_clean() {
        let mut report = CoverageReport::new(100);
        report.explain(0, 60, "header");
        report.explain(60, 100, "payload");
        assert_eq!(report.bytes_explained(), 100);
        assert_eq!(report.bytes_unknown(), 0);
        assert!(report.is_complete());
    }

    #[test]
    fn test_additivity_bound() {
        let mut report = CoverageReport::new(100);
        report.explain(0, 50, "header");
        report.mark_unknown(50, 80);
        assert!(report.bytes_explained() + report.bytes_unknown() <= report.total);
        assert_eq!(report.bytes_explained(), 50);
        assert_eq!(report.bytes_unknown(), 30);
        assert!(!report.is_complete());
    }

    #[test]
    fn test_superseding_rescan_not_double_counted() {
        // A corrective re-scan explained part of a region that was first
        // marked unknown; the explained range wins, nothing counts twice.
        let mut report = CoverageReport::new(100);
        report.mark_unknown(40, 100);
        report.explain(0, 40, "core");
        report.explain(60, 90, "lod[0]");
        assert_eq!(report.bytes_explained(), 70);
        assert_eq!(report.bytes_unknown(), 30);
        assert_eq!(report.bytes_explained() + report.bytes_unknown(), 100);
    }

    #[test]
    fn test_overlapping_explained_merged() {
        let mut report = CoverageReport::new(50);
        report.explain(0, 30, "a");
        report.explain(20, 50, "b");
        assert_eq!(report.bytes_explained(), 50);
    }

    #[test]
    fn test_heuristic_flag_breaks_completeness() {
        let mut report = CoverageReport::new(10);
        report.explain(0, 10, "all");
        report.flag_heuristics();
        assert!(!report.is_complete());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_report_serializes_for_persistence() {
        let mut report = CoverageReport::new(100);
        report.explain(0, 36, "header");
        report.mark_unknown_labeled(36, 100, Some("post_lod_data".to_string()));
        report.flag_heuristics();

        let json = serde_json::to_string(&report).unwrap();
        let back: CoverageReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back.total, 100);
        assert_eq!(back.explained, report.explained);
        assert_eq!(back.unknown, report.unknown);
        assert!(back.used_heuristics);
    }

    #[test]
    fn test_region_bytes() {
        let data = [1u8, 2, 3, 4, 5];
        let region = UnknownRegion {
            start: 1,
            end: 4,
            label: None,
        };
        assert_eq!(region.bytes(&data), &[2, 3, 4]);
    }
}
