//! Derived drug statistics and the ±10% normal band.
//!
//! The band is a deliberate simplification — a symmetric ±10% interval
//! around the historical mean, not a statistically derived confidence
//! interval.  It exists as a rough self-report sanity check only and must
//! not be strengthened into anything that sounds clinical.

/// Aggregate over all measurements for one (trial, drug) pairing.
/// Computed on demand; never stored.
#[derive(Debug, Clone, PartialEq)]
pub struct DrugStatistics {
    /// Arithmetic mean of scores, rounded to one decimal place.
    pub avg_score: f64,
    /// Number of measurements in the aggregate.
    pub count: i64,
    /// `round1(avg_score × 0.9)`.
    pub lower_bound: f64,
    /// `round1(avg_score × 1.1)`.
    pub upper_bound: f64,
}

impl DrugStatistics {
    /// Build from a raw SQL aggregate.  `None` when there are no rows —
    /// the first measurement for a pairing has no baseline to compare to.
    pub fn from_aggregate(avg: Option<f64>, count: i64) -> Option<Self> {
        if count == 0 {
            return None;
        }
        let avg_score = round1(avg?);
        Some(Self {
            avg_score,
            count,
            lower_bound: round1(avg_score * 0.9),
            upper_bound: round1(avg_score * 1.1),
        })
    }

    /// Whether `score` falls inside the normal band (inclusive both ends).
    pub fn within_band(&self, score: i64) -> bool {
        self.lower_bound <= score as f64 && score as f64 <= self.upper_bound
    }
}

/// Round to one decimal place.
pub(crate) fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}
