//! Biometric evaluation metrics.
//!
//! Pure functions over arrays of similarity scores. Positive scores (`p`)
//! come from genuine attempts, negative scores (`n`) from impostor attempts.
//! A score is accepted when it is greater than or equal to the threshold.
//!
//! Every rate of an empty score array is 0, so `tpr + fnr == 1` and
//! `fpr + tnr == 1` hold only for non-empty input.
//!
//! These encode the statistical contract the engine's threshold decisions
//! are tuned against: pick the threshold from [`calc_eer`] or by walking a
//! [`roc`] curve.

use serde::{Deserialize, Serialize};

use crate::math::{linspace, trapezoid};
use crate::similarity::SimilarityMetric;

/// Default number of thresholds sampled between 0 and 1.
pub const DEFAULT_RESOLUTION: usize = 100;

fn accepted(scores: &[f64], t: f64) -> usize {
    scores.iter().filter(|&&s| s >= t).count()
}

fn rate(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64
    }
}

/// True positive (true acceptance) rate: share of `p_sims` accepted at `t`.
#[must_use]
pub fn tpr(p_sims: &[f64], t: f64) -> f64 {
    rate(accepted(p_sims, t), p_sims.len())
}

/// False positive (false acceptance) rate: share of `n_sims` accepted at `t`.
#[must_use]
pub fn fpr(n_sims: &[f64], t: f64) -> f64 {
    rate(accepted(n_sims, t), n_sims.len())
}

/// False negative (false rejection) rate: share of `p_sims` rejected at `t`.
#[must_use]
pub fn fnr(p_sims: &[f64], t: f64) -> f64 {
    rate(p_sims.len() - accepted(p_sims, t), p_sims.len())
}

/// True negative (true rejection) rate: share of `n_sims` rejected at `t`.
#[must_use]
pub fn tnr(n_sims: &[f64], t: f64) -> f64 {
    rate(n_sims.len() - accepted(n_sims, t), n_sims.len())
}

/// Counts at a single threshold.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    /// Genuine attempts accepted
    pub true_positives: usize,
    /// Impostor attempts accepted
    pub false_positives: usize,
    /// Genuine attempts rejected
    pub false_negatives: usize,
    /// Impostor attempts rejected
    pub true_negatives: usize,
}

/// Confusion matrix of `p_sims` / `n_sims` at threshold `t`.
#[must_use]
pub fn confusion_matrix(p_sims: &[f64], n_sims: &[f64], t: f64) -> ConfusionMatrix {
    let tp = accepted(p_sims, t);
    let fp = accepted(n_sims, t);
    ConfusionMatrix {
        true_positives: tp,
        false_positives: fp,
        false_negatives: p_sims.len() - tp,
        true_negatives: n_sims.len() - fp,
    }
}

/// Receiver operating characteristic sampled at evenly spaced thresholds.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RocCurve {
    /// False positive rate per threshold
    pub fpr: Vec<f64>,
    /// True positive rate per threshold
    pub tpr: Vec<f64>,
    /// Thresholds, ascending from 0 to 1
    pub thresholds: Vec<f64>,
}

impl RocCurve {
    /// Area under this curve.
    #[must_use]
    pub fn auc(&self) -> f64 {
        auc(&self.fpr, &self.tpr)
    }
}

/// ROC curve over `res` thresholds spaced evenly in `[0, 1]`.
#[must_use]
pub fn roc(p: &[f64], n: &[f64], res: usize) -> RocCurve {
    let thresholds = linspace(0.0, 1.0, res);
    RocCurve {
        fpr: thresholds.iter().map(|&t| fpr(n, t)).collect(),
        tpr: thresholds.iter().map(|&t| tpr(p, t)).collect(),
        thresholds,
    }
}

/// Score positive and negative samples against `template` with `metric`,
/// then compute the ROC curve.
pub fn calc_roc<M>(template: &[f64], p: &[Vec<f64>], n: &[Vec<f64>], metric: &M, res: usize) -> RocCurve
where
    M: SimilarityMetric + ?Sized,
{
    let p_sims: Vec<f64> = p.iter().map(|s| metric.similarity(template, s)).collect();
    let n_sims: Vec<f64> = n.iter().map(|s| metric.similarity(template, s)).collect();
    roc(&p_sims, &n_sims, res)
}

/// Trapezoidal area under an ROC curve.
///
/// The sign is corrected when `fpr` is not ascending, as produced by [`roc`].
#[must_use]
pub fn auc(fpr: &[f64], tpr: &[f64]) -> f64 {
    let ascending = fpr.windows(2).all(|w| w[1] - w[0] >= 0.0);
    let correction = if ascending { 1.0 } else { -1.0 };
    correction * trapezoid(tpr, fpr)
}

/// Approximate equal error rate of `p` and `n`.
///
/// Returns `(rate, threshold)`: the false negative rate at the sampled
/// threshold where `|FPR - FNR|` is smallest (first such threshold on ties).
#[must_use]
pub fn calc_eer(p: &[f64], n: &[f64], res: usize) -> (f64, f64) {
    let curve = roc(p, n, res.max(1));
    let fnr: Vec<f64> = curve.tpr.iter().map(|t| 1.0 - t).collect();

    let mut best = 0;
    for i in 1..fnr.len() {
        if (curve.fpr[i] - fnr[i]).abs() < (curve.fpr[best] - fnr[best]).abs() {
            best = i;
        }
    }
    (fnr[best], curve.thresholds[best])
}

/// Equal error rate read off precomputed `fpr` / `tpr` arrays.
///
/// Returns the FPR where `|FNR - FPR|` is smallest, skipping NaN entries, or
/// `None` if no finite entry exists.
#[must_use]
pub fn eer(fpr: &[f64], tpr: &[f64]) -> Option<f64> {
    fpr.iter()
        .zip(tpr)
        .map(|(&f, &t)| (f, ((1.0 - t) - f).abs()))
        .filter(|(_, gap)| !gap.is_nan())
        .fold(None, |best: Option<(f64, f64)>, (f, gap)| match best {
            Some((_, g)) if gap >= g => best,
            _ => Some((f, gap)),
        })
        .map(|(f, _)| f)
}
