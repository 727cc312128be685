//! Summary statistics shared by the scoring and trend code.

/// Arithmetic mean. Empty input yields 0.0.
pub fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    data.iter().sum::<f64>() / data.len() as f64
}

/// Population standard deviation (divides by `n`, not `n - 1`).
pub fn population_std_dev(data: &[f64]) -> f64 {
    if data.len() < 2 {
        return 0.0;
    }
    let m = mean(data);
    let variance = data.iter().map(|x| (x - m).powi(2)).sum::<f64>() / data.len() as f64;
    variance.sqrt()
}

/// Round to `decimals` places, half away from zero.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// `(current - previous) / |previous| * 100`, or `None` when `previous` is zero.
pub fn growth_pct(current: f64, previous: f64) -> Option<f64> {
    if previous == 0.0 {
        return None;
    }
    Some((current - previous) / previous.abs() * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_mean_and_std_dev() {
        let data = [10.0, 12.0, 14.0];
        assert_relative_eq!(mean(&data), 12.0);
        // population variance = (4 + 0 + 4) / 3
        assert_relative_eq!(population_std_dev(&data), (8.0f64 / 3.0).sqrt());
        assert_eq!(population_std_dev(&[5.0]), 0.0);
        assert_eq!(mean(&[]), 0.0);
    }

    #[test]
    fn test_round_to() {
        assert_relative_eq!(round_to(12.345, 1), 12.3);
        assert_relative_eq!(round_to(1.255, 0), 1.0);
        assert_relative_eq!(round_to(-2.25, 1), -2.3);
    }

    #[test]
    fn test_growth_pct() {
        assert_eq!(growth_pct(120.0, 100.0), Some(20.0));
        assert_eq!(growth_pct(-50.0, -100.0), Some(50.0));
        assert_eq!(growth_pct(10.0, 0.0), None);
    }
}
