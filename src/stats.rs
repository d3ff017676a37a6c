use crate::table::{DimensionRow, TimeRow};

/// Per-domain roll-up consumed by the report synthesizer.
#[derive(Debug, Clone)]
pub struct DomainSummary {
    pub domain: String,
    pub total_clicks: u64,
    pub total_impressions: u64,
    pub avg_ctr: f64,
    pub avg_position: f64,
}

/// Cleaned per-dimension tables retained for report rendering.
/// A missing export file stays `None`; downstream rendering omits that block.
#[derive(Debug, Clone, Default)]
pub struct DomainDetails {
    pub time_series: Option<Vec<TimeRow>>,
    pub countries: Option<Vec<DimensionRow>>,
    pub devices: Option<Vec<DimensionRow>>,
    pub pages: Option<Vec<DimensionRow>>,
    pub queries: Option<Vec<DimensionRow>>,
}

/// Distribution statistics for one metric across all domains, with the
/// owning domain attributed to the extremes.
#[derive(Debug, Clone)]
pub struct Distribution {
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
    pub p25: f64,
    pub p75: f64,
    pub p90: f64,
    pub iqr: f64,
    pub min: f64,
    pub max: f64,
    pub min_domain: String,
    pub max_domain: String,
    pub total: f64,
}

/// Compute distribution statistics for one metric over the summary list.
/// Returns `None` for an empty list. Ties on min/max go to the first
/// occurrence in input order.
pub fn distribution<F>(summaries: &[DomainSummary], value: F) -> Option<Distribution>
where
    F: Fn(&DomainSummary) -> f64,
{
    if summaries.is_empty() {
        return None;
    }

    let values: Vec<f64> = summaries.iter().map(&value).collect();

    let mut min_idx = 0;
    let mut max_idx = 0;
    for (i, v) in values.iter().enumerate().skip(1) {
        if *v < values[min_idx] {
            min_idx = i;
        }
        if *v > values[max_idx] {
            max_idx = i;
        }
    }

    let total: f64 = values.iter().sum();
    let mean = total / values.len() as f64;

    let mut sorted = values.clone();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let median = percentile(&sorted, 50.0);
    let p25 = percentile(&sorted, 25.0);
    let p75 = percentile(&sorted, 75.0);
    let p90 = percentile(&sorted, 90.0);

    // Sample standard deviation; undefined for a single value, reported as 0.
    let std_dev = if values.len() < 2 {
        0.0
    } else {
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>()
            / (values.len() - 1) as f64;
        variance.sqrt()
    };

    Some(Distribution {
        mean,
        median,
        std_dev,
        p25,
        p75,
        p90,
        iqr: p75 - p25,
        min: values[min_idx],
        max: values[max_idx],
        min_domain: summaries[min_idx].domain.clone(),
        max_domain: summaries[max_idx].domain.clone(),
        total,
    })
}

/// Percentile with linear interpolation between order statistics.
/// Input must be sorted ascending.
pub fn percentile(sorted: &[f64], pct: f64) -> f64 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        n => {
            let rank = pct / 100.0 * (n - 1) as f64;
            let lo = rank.floor() as usize;
            let hi = rank.ceil() as usize;
            if lo == hi {
                sorted[lo]
            } else {
                sorted[lo] + (sorted[hi] - sorted[lo]) * (rank - lo as f64)
            }
        }
    }
}

/// Click-through rate from aggregate clicks over aggregate impressions.
/// A zero impression total yields 0 rather than a division error.
pub fn blended_ctr(clicks: u64, impressions: u64) -> f64 {
    if impressions == 0 {
        0.0
    } else {
        clicks as f64 / impressions as f64 * 100.0
    }
}
