//! Small numerical utilities shared across the pipeline.
//!
//! Everything here operates on plain `&[f64]` slices and is deliberately
//! free of model-specific assumptions; the fitting and EVT modules build
//! on these primitives.

/// Safe comparison for floating point values (pushes NaN to the end).
pub fn float_total_cmp(a: &f64, b: &f64) -> std::cmp::Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => std::cmp::Ordering::Equal,
        (true, false) => std::cmp::Ordering::Greater,
        (false, true) => std::cmp::Ordering::Less,
        (false, false) => a.partial_cmp(b).unwrap(),
    }
}

/// Arithmetic mean; 0.0 for an empty slice.
pub fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    data.iter().sum::<f64>() / data.len() as f64
}

/// Unbiased sample variance (divides by n - 1); 0.0 when n < 2.
pub fn sample_variance(data: &[f64]) -> f64 {
    if data.len() < 2 {
        return 0.0;
    }
    let m = mean(data);
    data.iter().map(|&x| (x - m) * (x - m)).sum::<f64>() / (data.len() - 1) as f64
}

/// Sample skewness (third standardized moment).
pub fn skewness(data: &[f64]) -> f64 {
    let n = data.len();
    if n < 3 {
        return 0.0;
    }
    let m = mean(data);
    let m2 = data.iter().map(|&x| (x - m).powi(2)).sum::<f64>() / n as f64;
    if m2 <= 0.0 {
        return 0.0;
    }
    let m3 = data.iter().map(|&x| (x - m).powi(3)).sum::<f64>() / n as f64;
    m3 / m2.powf(1.5)
}

/// Excess kurtosis (fourth standardized moment minus 3, Fisher convention).
pub fn excess_kurtosis(data: &[f64]) -> f64 {
    let n = data.len();
    if n < 4 {
        return 0.0;
    }
    let m = mean(data);
    let m2 = data.iter().map(|&x| (x - m).powi(2)).sum::<f64>() / n as f64;
    if m2 <= 0.0 {
        return 0.0;
    }
    let m4 = data.iter().map(|&x| (x - m).powi(4)).sum::<f64>() / n as f64;
    m4 / (m2 * m2) - 3.0
}

/// Median of already-sorted data (handles even length).
pub fn median_of_sorted(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    if n == 0 {
        return f64::NAN;
    }
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        0.5 * (sorted[n / 2 - 1] + sorted[n / 2])
    }
}

/// Median of unsorted data.
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mut v = values.to_vec();
    v.sort_by(float_total_cmp);
    median_of_sorted(&v)
}

/// Empirical quantile of *sorted* data using linear interpolation between
/// order statistics, matching the convention of the common statistical
/// packages. `q` is a fraction in [0, 1].
pub fn quantile_of_sorted(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    if sorted.len() == 1 {
        return sorted[0];
    }
    let q = q.clamp(0.0, 1.0);
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    if lo == hi {
        sorted[lo]
    } else {
        let w = pos - lo as f64;
        sorted[lo] * (1.0 - w) + sorted[hi] * w
    }
}

/// Empirical quantile of unsorted data. `q` is a fraction in [0, 1].
pub fn quantile(values: &[f64], q: f64) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mut v = values.to_vec();
    v.sort_by(float_total_cmp);
    quantile_of_sorted(&v, q)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn mean_and_variance() {
        let data = vec![2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_approx_eq!(mean(&data), 5.0, 1e-12);
        assert_approx_eq!(sample_variance(&data), 32.0 / 7.0, 1e-12);
        assert_eq!(sample_variance(&[1.0]), 0.0);
    }

    #[test]
    fn median_even_and_odd() {
        assert_approx_eq!(median(&[3.0, 1.0, 2.0]), 2.0, 1e-12);
        assert_approx_eq!(median(&[4.0, 1.0, 3.0, 2.0]), 2.5, 1e-12);
        assert!(median(&[]).is_nan());
    }

    #[test]
    fn quantile_interpolates() {
        let data: Vec<f64> = (1..=5).map(|i| i as f64).collect();
        assert_approx_eq!(quantile(&data, 0.0), 1.0, 1e-12);
        assert_approx_eq!(quantile(&data, 1.0), 5.0, 1e-12);
        assert_approx_eq!(quantile(&data, 0.5), 3.0, 1e-12);
        // 0.95 * 4 = 3.8 -> between the 4th and 5th order statistic
        assert_approx_eq!(quantile(&data, 0.95), 4.8, 1e-12);
    }

    #[test]
    fn symmetric_data_has_zero_skew() {
        let data = vec![-2.0, -1.0, 0.0, 1.0, 2.0];
        assert_approx_eq!(skewness(&data), 0.0, 1e-12);
    }

    #[test]
    fn uniform_like_data_has_negative_excess_kurtosis() {
        let data: Vec<f64> = (0..100).map(|i| i as f64).collect();
        assert!(excess_kurtosis(&data) < 0.0);
    }

    #[test]
    fn nan_sorts_last() {
        let mut v = vec![2.0, f64::NAN, 1.0];
        v.sort_by(float_total_cmp);
        assert_eq!(v[0], 1.0);
        assert_eq!(v[1], 2.0);
        assert!(v[2].is_nan());
    }
}
