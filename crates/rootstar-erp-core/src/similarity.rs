//! Template similarity metrics.
//!
//! Metrics score two templates with `1.0` meaning identical and `0.0`
//! maximally dissimilar. Any `Fn(&[f64], &[f64]) -> f64` is a
//! [`SimilarityMetric`], so plain functions and closures plug in directly.

/// Scores how alike two templates are.
pub trait SimilarityMetric {
    /// Similarity of `a` and `b`, conventionally in `[0, 1]`.
    fn similarity(&self, a: &[f64], b: &[f64]) -> f64;
}

impl<F> SimilarityMetric for F
where
    F: Fn(&[f64], &[f64]) -> f64,
{
    fn similarity(&self, a: &[f64], b: &[f64]) -> f64 {
        self(a, b)
    }
}

/// Cosine of the angle between `a` and `b`.
///
/// Returns `0.0` when either vector has zero norm. Only the common prefix is
/// compared when lengths differ.
#[must_use]
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    let mut dot = 0.0;
    let mut norm_a = 0.0;
    let mut norm_b = 0.0;

    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let norm_product = norm_a.sqrt() * norm_b.sqrt();
    if norm_product > 0.0 {
        dot / norm_product
    } else {
        0.0
    }
}

/// Cosine similarity mapped from `[-1, 1]` onto `[0, 1]`.
#[must_use]
pub fn bounded_cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    (1.0 + cosine_similarity(a, b)) / 2.0
}

/// `1 / (1 + d)` where `d` is the Euclidean distance between `a` and `b`.
#[must_use]
pub fn euclidean_similarity(a: &[f64], b: &[f64]) -> f64 {
    let distance = a
        .iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt();
    1.0 / (1.0 + distance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_euclidean_similarity() {
        assert_relative_eq!(
            euclidean_similarity(&[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0]),
            1.0 / (1.0 + 27f64.sqrt())
        );
        assert_relative_eq!(
            euclidean_similarity(&[1.0, 2.0, 3.0], &[0.0, 0.0, 0.0]),
            1.0 / (1.0 + 14f64.sqrt())
        );
        assert_relative_eq!(euclidean_similarity(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]), 1.0);
    }

    #[test]
    fn test_cosine_similarity() {
        assert_relative_eq!(
            cosine_similarity(&[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0]),
            32.0 / (14f64.sqrt() * 77f64.sqrt())
        );
        assert_relative_eq!(cosine_similarity(&[1.0, 2.0, 3.0], &[0.0, 0.0, 0.0]), 0.0);
        assert_relative_eq!(cosine_similarity(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_bounded_cosine_range() {
        assert_relative_eq!(bounded_cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]), 0.0);
        assert_relative_eq!(bounded_cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.5);
        assert_relative_eq!(bounded_cosine_similarity(&[2.0, 0.0], &[1.0, 0.0]), 1.0);
    }

    #[test]
    fn test_closures_are_metrics() {
        let constant = |_: &[f64], _: &[f64]| 0.25;
        let boxed: Box<dyn SimilarityMetric> = Box::new(constant);
        assert_relative_eq!(boxed.similarity(&[1.0], &[2.0]), 0.25);

        let function: &dyn SimilarityMetric = &cosine_similarity;
        assert_relative_eq!(function.similarity(&[1.0], &[3.0]), 1.0);
    }
}
