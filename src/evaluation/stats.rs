//! Descriptive statistics over plain `f64` samples.
//!
//! Empty samples yield `NaN` for location statistics, matching what a mean of
//! nothing is. Standard deviations of fewer values than their degrees of
//! freedom need are reported as `0.0`.

/// Decimal places every reported statistic is rounded to.
pub const REPORT_DECIMALS: i32 = 4;

/// Round to [`REPORT_DECIMALS`] places, ties to even.
pub fn round4(value: f64) -> f64 {
    let scale = 10f64.powi(REPORT_DECIMALS);
    (value * scale).round_ties_even() / scale
}

/// Arithmetic mean.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Median; the mean of the two middle values for even-sized samples.
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Sample standard deviation (n - 1 denominator), `0.0` below two values.
pub fn sample_std(values: &[f64]) -> f64 {
    std_with_ddof(values, 1)
}

/// Population standard deviation (n denominator), `0.0` for an empty sample.
pub fn population_std(values: &[f64]) -> f64 {
    std_with_ddof(values, 0)
}

fn std_with_ddof(values: &[f64], ddof: usize) -> f64 {
    let n = values.len();
    if n <= ddof {
        return 0.0;
    }
    let m = mean(values);
    let var = values.iter().map(|x| (x - m).powi(2)).sum::<f64>() / (n - ddof) as f64;
    var.sqrt()
}
