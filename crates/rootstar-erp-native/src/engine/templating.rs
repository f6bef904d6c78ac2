//! Template construction and similarity aggregation.

use rootstar_erp_core::{EventEpoch, SimilarityMetric, Template};

use crate::config::{SimilarityMode, TemplateMode};
use crate::extractor::FeatureExtractor;

use super::error::AuthResult;

/// Build templates from equal-length epochs.
///
/// # Errors
///
/// Returns an error if the epochs cannot be averaged.
pub(crate) fn build_templates(
    epochs: &[EventEpoch],
    extractor: &mut dyn FeatureExtractor,
    mode: TemplateMode,
) -> AuthResult<Vec<Template>> {
    let mut templates = Vec::new();

    if matches!(mode, TemplateMode::AverageTemplate | TemplateMode::AverageAndSingleTemplates) {
        let average = EventEpoch::average(epochs)?;
        templates.push(extractor.extract_features(&average));
    }
    if matches!(mode, TemplateMode::SingleTemplates | TemplateMode::AverageAndSingleTemplates) {
        templates.extend(epochs.iter().map(|epoch| extractor.extract_features(epoch)));
    }

    Ok(templates)
}

/// Score fresh templates against stored ones over the full cross product.
///
/// `None` when there is nothing to compare or any pair scores non-finite.
pub(crate) fn aggregate_similarity(
    stored: &[Template],
    fresh: &[Template],
    metric: &dyn SimilarityMetric,
    mode: SimilarityMode,
) -> Option<f64> {
    let scores: Vec<f64> = stored
        .iter()
        .flat_map(|s| fresh.iter().map(move |f| metric.similarity(s, f)))
        .collect();

    if scores.is_empty() || scores.iter().any(|s| !s.is_finite()) {
        return None;
    }

    let aggregate = match mode {
        SimilarityMode::AverageSimilarity => scores.iter().sum::<f64>() / scores.len() as f64,
        SimilarityMode::BestSimilarity => scores.iter().copied().fold(f64::NEG_INFINITY, f64::max),
    };
    Some(aggregate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::FlattenExtractor;
    use approx::assert_relative_eq;
    use rootstar_erp_core::similarity::cosine_similarity;

    fn epoch(values: &[f64]) -> EventEpoch {
        let timestamps = (0..values.len()).map(|i| i as f64 * 0.1).collect();
        EventEpoch::new(vec!["Cz".into()], 10, vec![values.to_vec()], timestamps).unwrap()
    }

    #[test]
    fn test_template_modes() {
        let epochs = [epoch(&[1.0, 3.0]), epoch(&[3.0, 5.0])];
        let mut extractor = FlattenExtractor::new();

        let avg = build_templates(&epochs, &mut extractor, TemplateMode::AverageTemplate).unwrap();
        assert_eq!(avg, vec![vec![2.0, 4.0]]);

        let single = build_templates(&epochs, &mut extractor, TemplateMode::SingleTemplates).unwrap();
        assert_eq!(single, vec![vec![1.0, 3.0], vec![3.0, 5.0]]);

        let both = build_templates(&epochs, &mut extractor, TemplateMode::AverageAndSingleTemplates).unwrap();
        assert_eq!(both, vec![vec![2.0, 4.0], vec![1.0, 3.0], vec![3.0, 5.0]]);
    }

    #[test]
    fn test_average_of_no_epochs_fails() {
        let mut extractor = FlattenExtractor::new();
        assert!(build_templates(&[], &mut extractor, TemplateMode::AverageTemplate).is_err());
        assert!(build_templates(&[], &mut extractor, TemplateMode::SingleTemplates).unwrap().is_empty());
    }

    #[test]
    fn test_aggregation_modes() {
        let stored = vec![vec![1.0, 0.0], vec![0.0, 1.0]];
        let fresh = vec![vec![1.0, 0.0]];
        let metric = cosine_similarity;

        let avg = aggregate_similarity(&stored, &fresh, &metric, SimilarityMode::AverageSimilarity).unwrap();
        assert_relative_eq!(avg, 0.5);
        let best = aggregate_similarity(&stored, &fresh, &metric, SimilarityMode::BestSimilarity).unwrap();
        assert_relative_eq!(best, 1.0);
    }

    #[test]
    fn test_undefined_aggregation() {
        let nan = |_: &[f64], _: &[f64]| f64::NAN;
        let stored = vec![vec![1.0]];
        assert!(aggregate_similarity(&stored, &stored, &nan, SimilarityMode::BestSimilarity).is_none());
        assert!(aggregate_similarity(&stored, &[], &cosine_similarity, SimilarityMode::AverageSimilarity).is_none());
    }
}
