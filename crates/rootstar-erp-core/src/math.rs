//! Statistical helpers for ERP signal processing
//!
//! This module provides:
//! - Mean and population standard deviation
//! - Nearest-timestamp lookup
//! - Elementwise channel averaging
//! - Threshold grids and trapezoidal integration

/// Arithmetic mean. Returns `0.0` for an empty slice.
#[must_use]
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation (divides by `n`).
#[must_use]
pub fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / values.len() as f64;
    var.sqrt()
}

/// Index of the element closest to `target`.
///
/// Ties resolve to the first such element. Returns `None` for an empty slice.
#[must_use]
pub fn nearest_index(values: &[f64], target: f64) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &v) in values.iter().enumerate() {
        let diff = (v - target).abs();
        match best {
            Some((_, d)) if diff >= d => {}
            _ => best = Some((i, diff)),
        }
    }
    best.map(|(i, _)| i)
}

/// Elementwise mean of equally long signals.
///
/// The result has the length of the shortest input.
#[must_use]
pub fn average_signals(signals: &[&[f64]]) -> Vec<f64> {
    let Some(len) = signals.iter().map(|s| s.len()).min() else {
        return Vec::new();
    };
    let n = signals.len() as f64;
    (0..len)
        .map(|i| signals.iter().map(|s| s[i]).sum::<f64>() / n)
        .collect()
}

/// `res` evenly spaced values from `start` to `stop` inclusive.
#[must_use]
pub fn linspace(start: f64, stop: f64, res: usize) -> Vec<f64> {
    match res {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (res - 1) as f64;
            (0..res)
                .map(|i| if i == res - 1 { stop } else { start + step * i as f64 })
                .collect()
        }
    }
}

/// Trapezoidal integral of `y` over `x`.
#[must_use]
pub fn trapezoid(y: &[f64], x: &[f64]) -> f64 {
    x.windows(2)
        .zip(y.windows(2))
        .map(|(xs, ys)| (xs[1] - xs[0]) * (ys[0] + ys[1]) / 2.0)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_std_dev_population() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_relative_eq!(mean(&values), 5.0);
        assert_relative_eq!(std_dev(&values), 2.0);
    }

    #[test]
    fn test_nearest_index_prefers_first_tie() {
        let ts = [0.0, 1.0, 2.0, 3.0];
        assert_eq!(nearest_index(&ts, 1.5), Some(1));
        assert_eq!(nearest_index(&ts, 2.9), Some(3));
        assert_eq!(nearest_index(&ts, -4.0), Some(0));
        assert_eq!(nearest_index(&[], 1.0), None);
    }

    #[test]
    fn test_average_signals() {
        let a = [1.0, 1.0, 1.0];
        let b = [5.0, 5.0, 5.0];
        let c = [0.0, 0.0, 0.0];
        assert_eq!(average_signals(&[&a, &b, &c]), vec![2.0, 2.0, 2.0]);
        assert!(average_signals(&[]).is_empty());
    }

    #[test]
    fn test_linspace_endpoints() {
        let grid = linspace(0.0, 1.0, 5);
        assert_eq!(grid, vec![0.0, 0.25, 0.5, 0.75, 1.0]);
        assert_eq!(linspace(0.0, 1.0, 1), vec![0.0]);
        assert!(linspace(0.0, 1.0, 0).is_empty());
    }

    #[test]
    fn test_trapezoid_unit_square() {
        assert_relative_eq!(trapezoid(&[1.0, 1.0], &[0.0, 1.0]), 1.0);
        assert_relative_eq!(trapezoid(&[0.0, 1.0], &[0.0, 1.0]), 0.5);
    }
}
