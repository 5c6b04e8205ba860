use crate::config::{CompositeWeights, TruncationSide};
use crate::pipeline::traits::{BandwidthMode, PerceptualScoreOracle};
use crate::types::{FeatureSequence, QualityMetrics, SignalBuffer, SpectralBasis};

/// Floor under denominators of the energy and SNR ratios.
const EPSILON: f64 = 1e-8;

/// Frame-aligned or plain framewise features feeding the spectral metrics.
#[derive(Debug, Clone, Copy)]
pub enum SpectralInput<'a> {
    /// Rows gathered along a DTW warp path; index i of both sequences
    /// belongs to the same path step.
    Aligned {
        reference: &'a FeatureSequence,
        degraded: &'a FeatureSequence,
    },
    /// Framewise features of the (sample-aligned) pair; an approximation,
    /// flagged as such in the result.
    Raw {
        reference: &'a FeatureSequence,
        degraded: &'a FeatureSequence,
    },
}

/// Computes the full metric set from an aligned, gain-matched signal pair.
///
/// Degenerate audio content (silence, clipping, perfect matches) is never
/// an error here; every division is epsilon-floored and a bit-perfect match
/// reports `snr_db = f32::INFINITY`.
pub struct QualityMetricsEngine {
    weights: CompositeWeights,
    truncation: TruncationSide,
    wideband_min_rate_hz: u32,
}

impl QualityMetricsEngine {
    pub fn new(
        weights: CompositeWeights,
        truncation: TruncationSide,
        wideband_min_rate_hz: u32,
    ) -> Self {
        Self {
            weights,
            truncation,
            wideband_min_rate_hz,
        }
    }

    pub fn score(
        &self,
        reference: &SignalBuffer,
        aligned: &SignalBuffer,
        spectral: SpectralInput<'_>,
        oracle: Option<&dyn PerceptualScoreOracle>,
    ) -> QualityMetrics {
        // One truncation side for every sample-domain metric; mixing sides
        // would skew SNR against the energy ratio.
        let min_len = reference.len().min(aligned.len());
        let ref_samples = truncate(&reference.samples, min_len, self.truncation);
        let deg_samples = truncate(&aligned.samples, min_len, self.truncation);

        let rms_diff = mean_abs_diff(ref_samples, deg_samples);
        let zcr_diff =
            (zero_crossing_rate(ref_samples) - zero_crossing_rate(deg_samples)).abs();

        let ref_energy: f64 = energy(ref_samples);
        let deg_energy: f64 = energy(deg_samples);
        let energy_ratio = (deg_energy / (ref_energy + EPSILON)) as f32;

        let noise_energy: f64 = ref_samples
            .iter()
            .zip(deg_samples.iter())
            .map(|(&r, &d)| {
                let n = r as f64 - d as f64;
                n * n
            })
            .sum();
        let snr_db = if noise_energy == 0.0 {
            f32::INFINITY
        } else {
            (10.0 * ((ref_energy + EPSILON) / (noise_energy + EPSILON)).log10()) as f32
        };

        let (spectral_mse, spectral_correlation, spectral_basis) = match spectral {
            SpectralInput::Aligned { reference, degraded } => {
                let (mse, corr) = spectral_pair(reference, degraded);
                (mse, corr, SpectralBasis::Aligned)
            }
            SpectralInput::Raw { reference, degraded } => {
                let (mse, corr) = spectral_pair(reference, degraded);
                (mse, corr, SpectralBasis::Raw)
            }
        };

        let perceptual_score = self.perceptual(reference, ref_samples, deg_samples, oracle);

        let composite_score = self.composite(rms_diff, zcr_diff, energy_ratio, snr_db);

        QualityMetrics {
            rms_diff,
            snr_db,
            zcr_diff,
            energy_ratio,
            spectral_mse,
            spectral_correlation,
            spectral_basis,
            perceptual_score,
            composite_score,
        }
    }

    fn perceptual(
        &self,
        reference: &SignalBuffer,
        ref_samples: &[f32],
        deg_samples: &[f32],
        oracle: Option<&dyn PerceptualScoreOracle>,
    ) -> Option<f32> {
        let oracle = oracle?;
        let mode = if reference.sample_rate_hz >= self.wideband_min_rate_hz {
            BandwidthMode::Wideband
        } else {
            BandwidthMode::Narrowband
        };
        match oracle.score(reference.sample_rate_hz, mode, ref_samples, deg_samples) {
            Ok(score) if score.is_finite() => Some(score),
            Ok(score) => {
                tracing::warn!(score, "perceptual oracle returned a non-finite score");
                None
            }
            Err(err) => {
                tracing::warn!(error = %err, "perceptual oracle unavailable, continuing without it");
                None
            }
        }
    }

    /// Bounded aggregate of the degradation penalties. Increasing any
    /// individual penalty never increases the score.
    fn composite(&self, rms_diff: f32, zcr_diff: f32, energy_ratio: f32, snr_db: f32) -> f32 {
        let w = &self.weights;
        let snr_penalty = f64::from(-snr_db).max(0.0);
        let score = 100.0
            - f64::from(w.rms_diff) * f64::from(rms_diff)
            - f64::from(w.zcr_diff) * f64::from(zcr_diff)
            - f64::from(w.energy_ratio) * f64::from((energy_ratio - 1.0).abs())
            - f64::from(w.negative_snr_db) * snr_penalty;
        score.clamp(0.0, 100.0) as f32
    }
}

fn truncate(samples: &[f32], len: usize, side: TruncationSide) -> &[f32] {
    match side {
        TruncationSide::Start => &samples[..len],
        TruncationSide::End => &samples[samples.len() - len..],
    }
}

fn mean_abs_diff(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() {
        return 0.0;
    }
    let sum: f64 = a
        .iter()
        .zip(b.iter())
        .map(|(&x, &y)| (x as f64 - y as f64).abs())
        .sum();
    (sum / a.len() as f64) as f32
}

fn energy(samples: &[f32]) -> f64 {
    samples.iter().map(|&x| (x as f64) * (x as f64)).sum()
}

/// Fraction of adjacent-sample sign changes.
fn zero_crossing_rate(samples: &[f32]) -> f32 {
    if samples.len() < 2 {
        return 0.0;
    }
    let crossings = samples
        .windows(2)
        .filter(|pair| (pair[0] >= 0.0) != (pair[1] >= 0.0))
        .count();
    crossings as f32 / (samples.len() - 1) as f32
}

/// Mean squared error and Pearson correlation over the flattened frame/band
/// entries of two feature sequences, truncated to the common frame count.
fn spectral_pair(reference: &FeatureSequence, degraded: &FeatureSequence) -> (f32, f32) {
    let frames = reference.frame_count().min(degraded.frame_count());
    let dim = reference.dim().min(degraded.dim());
    if frames == 0 || dim == 0 {
        return (0.0, 0.0);
    }
    debug_assert_eq!(reference.dim(), degraded.dim());

    let n = (frames * dim) as f64;
    let mut sum_sq = 0.0f64;
    let mut sum_a = 0.0f64;
    let mut sum_b = 0.0f64;
    let mut sum_ab = 0.0f64;
    let mut sum_aa = 0.0f64;
    let mut sum_bb = 0.0f64;
    for frame_idx in 0..frames {
        let fa = &reference.frames[frame_idx];
        let fb = &degraded.frames[frame_idx];
        for band in 0..dim {
            let a = fa[band] as f64;
            let b = fb[band] as f64;
            let d = a - b;
            sum_sq += d * d;
            sum_a += a;
            sum_b += b;
            sum_ab += a * b;
            sum_aa += a * a;
            sum_bb += b * b;
        }
    }

    let mse = (sum_sq / n) as f32;
    let cov = sum_ab - sum_a * sum_b / n;
    let var_a = sum_aa - sum_a * sum_a / n;
    let var_b = sum_bb - sum_b * sum_b / n;
    let denom = (var_a * var_b).sqrt();
    let correlation = if denom > 1e-12 {
        (cov / denom) as f32
    } else {
        0.0
    };
    (mse, correlation)
}
