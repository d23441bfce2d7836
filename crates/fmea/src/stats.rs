//! Descriptive statistics over failure mode records.
//!
//! Everything here is a pure function of the record slice it is handed; the
//! dashboard and reports recompute them over the full table on each request.

use serde::Serialize;

use crate::record::FailureModeRecord;

/// RPN above which an entry counts as high risk.
pub const HIGH_RISK_THRESHOLD: u16 = 60;

/// Upper bound (inclusive) of the low risk tier.
pub const LOW_RISK_MAX: u16 = 30;

/// Summary figures shown on the dashboard and reports pages.
///
/// All fields are zero for an empty record set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Summary {
    /// Mean RPN rounded to two decimal places.
    pub average_rpn: f64,
    /// Highest RPN.
    pub max_rpn: u16,
    /// Lowest RPN.
    pub min_rpn: u16,
    /// Number of records with RPN above [`HIGH_RISK_THRESHOLD`].
    pub high_risk_count: usize,
}

/// Compute the summary figures for a set of records.
#[must_use]
pub fn summarize(records: &[FailureModeRecord]) -> Summary {
    let Some(first) = records.first() else {
        return Summary::default();
    };

    let mut sum: u64 = 0;
    let mut max_rpn = first.rpn.get();
    let mut min_rpn = first.rpn.get();
    let mut high_risk_count = 0;

    for record in records {
        let rpn = record.rpn.get();
        sum += u64::from(rpn);
        max_rpn = max_rpn.max(rpn);
        min_rpn = min_rpn.min(rpn);
        if RiskTier::for_rpn(rpn) == RiskTier::High {
            high_risk_count += 1;
        }
    }

    Summary {
        average_rpn: round2(mean(sum, records.len())),
        max_rpn,
        min_rpn,
        high_risk_count,
    }
}

#[allow(clippy::cast_precision_loss)]
fn mean(sum: u64, count: usize) -> f64 {
    sum as f64 / count as f64
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// The `n` records with the highest RPN, highest first.
///
/// The sort is stable, so records with equal RPN keep the order they had in
/// `records` (store order: ascending id).
#[must_use]
pub fn top_n(records: &[FailureModeRecord], n: usize) -> Vec<FailureModeRecord> {
    let mut sorted: Vec<&FailureModeRecord> = records.iter().collect();
    sorted.sort_by(|a, b| b.rpn.cmp(&a.rpn));
    sorted.into_iter().take(n).cloned().collect()
}

/// Fixed risk bands partitioning the RPN range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskTier {
    /// RPN 1 to 30.
    Low,
    /// RPN 31 to 60.
    Medium,
    /// RPN above 60.
    High,
}

impl RiskTier {
    /// All tiers, lowest first.
    pub const ALL: [Self; 3] = [Self::Low, Self::Medium, Self::High];

    /// The tier an RPN falls into.
    #[must_use]
    pub fn for_rpn(rpn: u16) -> Self {
        match rpn {
            0..=LOW_RISK_MAX => Self::Low,
            _ if rpn <= HIGH_RISK_THRESHOLD => Self::Medium,
            _ => Self::High,
        }
    }

    /// Display label including the RPN range.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Low => "Low (1-30)",
            Self::Medium => "Medium (31-60)",
            Self::High => "High (>60)",
        }
    }
}

impl std::fmt::Display for RiskTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Number of records in each [`RiskTier`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RiskHistogram {
    /// Records with RPN <= 30.
    pub low: usize,
    /// Records with 31 <= RPN <= 60.
    pub medium: usize,
    /// Records with RPN > 60.
    pub high: usize,
}

impl RiskHistogram {
    /// Count for a single tier.
    #[must_use]
    pub fn count(&self, tier: RiskTier) -> usize {
        match tier {
            RiskTier::Low => self.low,
            RiskTier::Medium => self.medium,
            RiskTier::High => self.high,
        }
    }

    /// Sum over all tiers.
    #[must_use]
    pub fn total(&self) -> usize {
        self.low + self.medium + self.high
    }

    /// `(tier, count)` pairs, lowest tier first.
    #[must_use]
    pub fn buckets(&self) -> Vec<Bucket> {
        RiskTier::ALL
            .iter()
            .map(|&tier| Bucket {
                tier,
                label: tier.label(),
                count: self.count(tier),
            })
            .collect()
    }
}

/// One row of the risk histogram, ready for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Bucket {
    /// The tier.
    pub tier: RiskTier,
    /// Display label.
    pub label: &'static str,
    /// Records in the tier.
    pub count: usize,
}

/// Count records per risk tier.
#[must_use]
pub fn risk_histogram(records: &[FailureModeRecord]) -> RiskHistogram {
    records
        .iter()
        .fold(RiskHistogram::default(), |mut hist, record| {
            match RiskTier::for_rpn(record.rpn.get()) {
                RiskTier::Low => hist.low += 1,
                RiskTier::Medium => hist.medium += 1,
                RiskTier::High => hist.high += 1,
            }
            hist
        })
}

/// Everything the dashboard shows, computed from one read of the table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Overview {
    /// All records, highest RPN first.
    pub records: Vec<FailureModeRecord>,
    /// Summary figures.
    pub summary: Summary,
    /// The highest-RPN records.
    pub top: Vec<FailureModeRecord>,
    /// Records per risk tier.
    pub histogram: RiskHistogram,
}

impl Overview {
    /// Aggregate `records`, keeping the `top_count` highest.
    #[must_use]
    pub fn from_records(records: Vec<FailureModeRecord>, top_count: usize) -> Self {
        let summary = summarize(&records);
        let top = top_n(&records, top_count);
        let histogram = risk_histogram(&records);
        Self {
            records,
            summary,
            top,
            histogram,
        }
    }
}
