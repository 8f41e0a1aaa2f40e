use crate::models::Trend;

/// Direction detection over a chronologically ordered series.
///
/// Implementations must degrade to [`Trend::Stable`] when the series is too
/// short to say anything; they never fail.
pub trait TrendStrategy: Send + Sync {
    fn detect(&self, series: &[f64], delta: f64) -> Trend;
}

/// Compares the mean of the later half of a series against the earlier half.
/// With an odd length the middle point belongs to the later half.
#[derive(Debug, Clone)]
pub struct SplitHalfTrend {
    pub min_points: usize,
}

impl TrendStrategy for SplitHalfTrend {
    fn detect(&self, series: &[f64], delta: f64) -> Trend {
        if series.len() < self.min_points.max(2) {
            return Trend::Stable;
        }

        let (earlier, later) = series.split_at(series.len() / 2);
        let change = mean(later) - mean(earlier);

        if change > delta {
            Trend::Increasing
        } else if change < -delta {
            Trend::Decreasing
        } else {
            Trend::Stable
        }
    }
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}
