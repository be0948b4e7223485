//! Tagged outcome of a heuristic detection strategy.

use crate::CoverageReport;

/// The result of a detection strategy that may have had to guess.
///
/// Format-variant detection, anchor scanning and marker selection all have
/// branches where the evidence is ambiguous. Those strategies return
/// `BestEffort` instead of silently picking an answer, so the uncertainty
/// survives into the [`CoverageReport`] and downstream consumers can
/// distinguish "fully understood" from "probably correct".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Detected<T> {
    /// The evidence admitted exactly one answer.
    Confident(T),
    /// An answer was chosen on a fallback branch; the reason says why.
    BestEffort(T, String),
}

impl<T> Detected<T> {
    /// Get the detected value, discarding confidence.
    pub fn value(&self) -> &T {
        match self {
            Detected::Confident(v) | Detected::BestEffort(v, _) => v,
        }
    }

    /// Whether the detection was unambiguous.
    pub fn is_confident(&self) -> bool {
        matches!(self, Detected::Confident(_))
    }

    /// The fallback reason, if any.
    pub fn reason(&self) -> Option<&str> {
        match self {
            Detected::Confident(_) => None,
            Detected::BestEffort(_, reason) => Some(reason),
        }
    }

    /// Unwrap the value, flagging the report when this was a best effort.
    pub fn record_in(self, report: &mut CoverageReport) -> T {
        match self {
            Detected::Confident(v) => v,
            Detected::BestEffort(v, _) => {
                report.flag_heuristics();
                v
            }
        }
    }

    /// Map the detected value, preserving confidence.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Detected<U> {
        match self {
            Detected::Confident(v) => Detected::Confident(f(v)),
            Detected::BestEffort(v, reason) => Detected::BestEffort(f(v), reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_in_sets_flag_only_for_best_effort() {
        let mut report = CoverageReport::new(0);
        assert_eq!(Detected::Confident(1).record_in(&mut report), 1);
        assert!(!report.used_heuristics);

        let guess = Detected::BestEffort(2, "ambiguous layout".to_string());
        assert_eq!(guess.record_in(&mut report), 2);
        assert!(report.used_heuristics);
    }
}
