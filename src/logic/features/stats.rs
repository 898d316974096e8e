//! Small numeric helpers for the vectorizer. All return 0 instead of NaN/∞.

/// `numerator / denominator`, 0 when the denominator is 0 or the result is not finite
pub fn safe_div(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        return 0.0;
    }
    let value = numerator / denominator;
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation
pub fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let sum_squares: f64 = values.iter().map(|v| (v - m) * (v - m)).sum();
    (sum_squares / values.len() as f64).sqrt()
}

/// std-dev / mean, 0 when the mean is 0
pub fn coefficient_of_variation(values: &[f64]) -> f64 {
    safe_div(std_dev(values), mean(values))
}
