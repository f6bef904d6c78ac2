//! FFT-based spectral analysis
//!
//! Single-sided amplitude spectra of containers and epochs.

use rustfft::{num_complex::Complex, FftPlanner};
use serde::{Deserialize, Serialize};

use rootstar_erp_core::SignalBlock;

/// Amplitude spectrum of every channel of a block.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PowerSpectrum {
    /// Channel names, in block order
    pub channel_names: Vec<String>,
    /// Frequency of each bin in Hz
    pub frequencies: Vec<f64>,
    /// Per channel, amplitude of each bin
    pub amplitudes: Vec<Vec<f64>>,
}

impl PowerSpectrum {
    /// Amplitudes of one channel.
    #[must_use]
    pub fn channel(&self, name: &str) -> Option<&[f64]> {
        let index = self.channel_names.iter().position(|c| c == name)?;
        Some(&self.amplitudes[index])
    }

    /// Frequency of the strongest bin of a channel.
    #[must_use]
    pub fn peak_frequency(&self, name: &str) -> Option<f64> {
        let amplitudes = self.channel(name)?;
        let (bin, _) = amplitudes
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))?;
        Some(self.frequencies[bin])
    }
}

/// FFT-based spectral analyzer
///
/// Keeps its FFT planner so repeated analyses of equal-length blocks reuse
/// the plan.
pub struct SpectralAnalyzer {
    planner: FftPlanner<f64>,
}

impl Default for SpectralAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl SpectralAnalyzer {
    /// Create a new spectral analyzer
    #[must_use]
    pub fn new() -> Self {
        Self { planner: FftPlanner::new() }
    }

    /// Single-sided amplitude spectrum of every channel.
    ///
    /// For `N` samples, bins `k < N / 2` are returned with frequency
    /// `k * rate / N` and amplitude `2 / N * |X_k|`.
    pub fn power_spectrum<B: SignalBlock + ?Sized>(&mut self, block: &B) -> PowerSpectrum {
        let n = block.sample_count();
        let half = n / 2;
        let rate = f64::from(block.sample_rate());

        let frequencies = (0..half).map(|k| k as f64 * rate / n as f64).collect();

        let amplitudes = if n == 0 {
            vec![Vec::new(); block.channel_names().len()]
        } else {
            let fft = self.planner.plan_fft_forward(n);
            let norm = 2.0 / n as f64;
            block
                .signals()
                .iter()
                .map(|signal| {
                    let mut buffer: Vec<Complex<f64>> = signal.iter().map(|&s| Complex::new(s, 0.0)).collect();
                    fft.process(&mut buffer);
                    buffer[..half].iter().map(|c| c.norm() * norm).collect()
                })
                .collect()
        };

        PowerSpectrum {
            channel_names: block.channel_names().to_vec(),
            frequencies,
            amplitudes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rootstar_erp_core::{Sample, SignalContainer};
    use std::f64::consts::PI;

    #[test]
    fn test_sine_amplitude_and_frequency() {
        let rate = 64;
        let mut container = SignalContainer::new(vec!["Cz".into(), "Pz".into()], rate);
        for i in 0..64 {
            let t = f64::from(i) / f64::from(rate);
            container
                .add_sample(&Sample::new(t, vec![3.0 * (2.0 * PI * 8.0 * t).sin(), 0.5 * (2.0 * PI * 4.0 * t).cos()]))
                .unwrap();
        }

        let spectrum = SpectralAnalyzer::new().power_spectrum(&container);
        assert_eq!(spectrum.frequencies.len(), 32);
        assert_relative_eq!(spectrum.frequencies[1], 1.0);

        let cz = spectrum.channel("Cz").unwrap();
        assert_relative_eq!(cz[8], 3.0, epsilon = 1e-9);
        assert_relative_eq!(cz[3], 0.0, epsilon = 1e-9);
        assert_relative_eq!(spectrum.peak_frequency("Pz").unwrap(), 4.0);
    }

    #[test]
    fn test_empty_block() {
        let container = SignalContainer::new(vec!["Cz".into()], 64);
        let spectrum = SpectralAnalyzer::default().power_spectrum(&container);
        assert!(spectrum.frequencies.is_empty());
        assert_eq!(spectrum.amplitudes, vec![Vec::<f64>::new()]);
        assert!(spectrum.peak_frequency("Cz").is_none());
    }
}
