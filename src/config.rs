use serde::Serialize;

use crate::error::QaError;

/// Alignment strategy used to locate the reference inside the captured signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlignmentMethod {
    /// FFT cross-correlation; sample-accurate, assumes no tempo drift.
    CrossCorrelation,
    /// Radius-bounded DTW over log-mel features; tolerates timing drift.
    Dtw,
}

/// Which end of the longer buffer survives when the metric engine truncates
/// the pair to a common length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TruncationSide {
    /// Keep the head, drop the excess tail (head-anchored alignment).
    Start,
    /// Keep the tail, drop the excess head (tail-anchored alignment).
    End,
}

/// STFT / log-mel parameters. Both signals of a pair must be transformed
/// with identical values for frame distances to be meaningful.
#[derive(Debug, Clone)]
pub struct FeatureConfig {
    pub mel_bands: usize,
    /// Analysis window length in samples.
    pub window: usize,
    /// Hop length in samples between consecutive frames.
    pub hop: usize,
    pub min_freq_hz: f32,
    /// Upper filterbank edge; `None` means the Nyquist frequency.
    pub max_freq_hz: Option<f32>,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            mel_bands: 40,
            window: 1024,
            hop: 256,
            min_freq_hz: 0.0,
            max_freq_hz: None,
        }
    }
}

/// Gain-normalization parameters.
#[derive(Debug, Clone)]
pub struct GainConfig {
    /// Floor added to the degraded RMS before division.
    pub epsilon: f32,
    /// Ceiling on the linear gain applied to the degraded signal.
    /// The default (100.0) corresponds to +40 dB.
    pub max_gain: f32,
}

impl Default for GainConfig {
    fn default() -> Self {
        Self {
            epsilon: 1e-8,
            max_gain: 100.0,
        }
    }
}

/// Penalty weights of the composite score. Tunable configuration, not a
/// contract; the engine only guarantees that growing any penalty never
/// raises the composite.
#[derive(Debug, Clone, Serialize)]
pub struct CompositeWeights {
    pub rms_diff: f32,
    pub zcr_diff: f32,
    pub energy_ratio: f32,
    /// Applied to `max(0, -snr_db)`.
    pub negative_snr_db: f32,
}

impl Default for CompositeWeights {
    fn default() -> Self {
        Self {
            rms_diff: 50.0,
            zcr_diff: 25.0,
            energy_ratio: 15.0,
            negative_snr_db: 1.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct QaConfig {
    pub method: AlignmentMethod,
    /// DTW band half-width in frames. Must be at least 1.
    pub dtw_radius: usize,
    pub features: FeatureConfig,
    pub gain: GainConfig,
    pub weights: CompositeWeights,
    /// Sample rates at or above this use the wideband perceptual mode.
    pub wideband_min_rate_hz: u32,
    pub truncation: TruncationSide,
    /// When the captured signal is shorter than the reference, zero-pad it
    /// instead of failing with `QaError::LengthMismatch`.
    pub allow_padding: bool,
}

impl QaConfig {
    pub const DEFAULT_DTW_RADIUS: usize = 32;
    pub const DEFAULT_WIDEBAND_MIN_RATE_HZ: u32 = 16_000;

    pub fn validate(&self) -> Result<(), QaError> {
        if self.dtw_radius == 0 {
            return Err(QaError::invalid_config("dtw_radius must be at least 1"));
        }
        if self.features.mel_bands == 0 {
            return Err(QaError::invalid_config("mel_bands must be at least 1"));
        }
        if self.features.window == 0 || self.features.hop == 0 {
            return Err(QaError::invalid_config(
                "feature window and hop must be non-zero",
            ));
        }
        if self.features.hop > self.features.window {
            return Err(QaError::invalid_config(format!(
                "feature hop ({}) must not exceed the window ({})",
                self.features.hop, self.features.window
            )));
        }
        if !(self.gain.epsilon > 0.0) || !(self.gain.max_gain >= 1.0) {
            return Err(QaError::invalid_config(
                "gain epsilon must be positive and max_gain at least 1.0",
            ));
        }
        let w = &self.weights;
        for (name, value) in [
            ("rms_diff", w.rms_diff),
            ("zcr_diff", w.zcr_diff),
            ("energy_ratio", w.energy_ratio),
            ("negative_snr_db", w.negative_snr_db),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(QaError::invalid_config(format!(
                    "composite weight {name} must be finite and non-negative"
                )));
            }
        }
        Ok(())
    }
}

impl Default for QaConfig {
    fn default() -> Self {
        Self {
            method: AlignmentMethod::CrossCorrelation,
            dtw_radius: Self::DEFAULT_DTW_RADIUS,
            features: FeatureConfig::default(),
            gain: GainConfig::default(),
            weights: CompositeWeights::default(),
            wideband_min_rate_hz: Self::DEFAULT_WIDEBAND_MIN_RATE_HZ,
            truncation: TruncationSide::Start,
            allow_padding: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qa_config_default() {
        let config = QaConfig::default();
        assert_eq!(config.method, AlignmentMethod::CrossCorrelation);
        assert_eq!(config.dtw_radius, QaConfig::DEFAULT_DTW_RADIUS);
        assert_eq!(config.truncation, TruncationSide::Start);
        assert_eq!(
            config.wideband_min_rate_hz,
            QaConfig::DEFAULT_WIDEBAND_MIN_RATE_HZ
        );
        assert!(config.allow_padding);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_zero_radius() {
        let config = QaConfig {
            dtw_radius: 0,
            ..QaConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(QaError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn validate_rejects_hop_larger_than_window() {
        let mut config = QaConfig::default();
        config.features.hop = config.features.window + 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_negative_weight() {
        let mut config = QaConfig::default();
        config.weights.zcr_diff = -1.0;
        assert!(config.validate().is_err());
    }
}
