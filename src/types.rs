use serde::Serialize;

/// Immutable mono audio view. Transformations return new buffers; no
/// component mutates a `SignalBuffer` in place. Stereo inputs are reduced
/// to one channel before entering the engine.
#[derive(Debug, Clone)]
pub struct SignalBuffer {
    pub samples: Vec<f32>,
    pub sample_rate_hz: u32,
}

impl SignalBuffer {
    pub fn new(samples: Vec<f32>, sample_rate_hz: u32) -> Self {
        Self {
            samples,
            sample_rate_hz,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_ms(&self) -> f64 {
        if self.sample_rate_hz == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate_hz as f64 * 1000.0
    }
}

/// Frame-level spectral features derived from a `SignalBuffer` by the
/// deterministic log-mel transform. All frames share one dimension.
#[derive(Debug, Clone)]
pub struct FeatureSequence {
    pub frames: Vec<Vec<f32>>,
    pub hop_length: usize,
    pub sample_rate_hz: u32,
}

impl FeatureSequence {
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Feature dimension, or 0 for an empty sequence.
    pub fn dim(&self) -> usize {
        self.frames.first().map(Vec::len).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

/// Tagged alignment value: a sample-accurate shift or a DTW warp path.
#[derive(Debug, Clone, PartialEq)]
pub enum Alignment {
    SampleOffset { offset: usize },
    /// Monotonic non-decreasing (reference_frame, degraded_frame) pairs
    /// covering both sequences end to end.
    WarpPath { path: Vec<(usize, usize)> },
}

/// Feature rows gathered along a warp path; index i of both sequences
/// corresponds to the same path step.
#[derive(Debug, Clone)]
pub struct AlignedFeatures {
    pub reference: FeatureSequence,
    pub degraded: FeatureSequence,
}

#[derive(Debug, Clone)]
pub struct AlignmentResult {
    pub alignment: Alignment,
    /// Peak correlation magnitude for `SampleOffset`,
    /// `1 / (1 + accumulated DTW cost)` for `WarpPath`.
    pub confidence: f32,
    /// The captured signal brought into the reference's timeline. For a
    /// warp-path alignment the sample domain is untouched and the gathered
    /// features in `aligned_features` carry the alignment.
    pub aligned_degraded: SignalBuffer,
    pub aligned_features: Option<AlignedFeatures>,
}

/// Whether the spectral metrics were computed on warp-aligned frames or on
/// plain framewise features (the approximation used when only a
/// sample-level alignment exists).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SpectralBasis {
    Aligned,
    Raw,
}

#[derive(Debug, Clone, Serialize)]
pub struct QualityMetrics {
    /// Mean absolute sample difference.
    pub rms_diff: f32,
    /// May be `f32::INFINITY` on a bit-perfect match; callers aggregating
    /// SNR values must special-case infinity.
    pub snr_db: f32,
    pub zcr_diff: f32,
    pub energy_ratio: f32,
    pub spectral_mse: f32,
    pub spectral_correlation: f32,
    pub spectral_basis: SpectralBasis,
    /// `None` when the perceptual oracle failed or none is configured.
    pub perceptual_score: Option<f32>,
    /// Always present, always within [0, 100].
    pub composite_score: f32,
}

/// Full outcome of one evaluate call: the alignment used plus the metric
/// set computed from it, kept together for diagnostic reporting.
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub alignment: AlignmentResult,
    pub metrics: QualityMetrics,
}
