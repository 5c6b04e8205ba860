use crate::alignment::{cross_correlation, dtw};
use crate::config::FeatureConfig;
use crate::error::QaError;
use crate::features;
use crate::pipeline::traits::Aligner;
use crate::types::{Alignment, AlignmentResult, SignalBuffer};

/// Sample-accurate FFT cross-correlation alignment. Cheap; use when no
/// pitch or tempo distortion is expected.
pub struct CrossCorrelationAligner {
    allow_padding: bool,
}

impl CrossCorrelationAligner {
    pub fn new(allow_padding: bool) -> Self {
        Self { allow_padding }
    }
}

impl Aligner for CrossCorrelationAligner {
    fn align(
        &self,
        reference: &SignalBuffer,
        captured: &SignalBuffer,
    ) -> Result<AlignmentResult, QaError> {
        cross_correlation::align(reference, captured, self.allow_padding)
    }
}

/// Feature-domain alignment: log-mel frames warped by radius-bounded DTW.
/// Use when timing drift makes sample-level correlation unreliable.
pub struct DtwAligner {
    features: FeatureConfig,
    radius: usize,
}

impl DtwAligner {
    pub fn new(features: FeatureConfig, radius: usize) -> Self {
        Self { features, radius }
    }
}

impl Aligner for DtwAligner {
    fn align(
        &self,
        reference: &SignalBuffer,
        captured: &SignalBuffer,
    ) -> Result<AlignmentResult, QaError> {
        let ref_features = features::log_mel(reference, &self.features)?;
        let cap_features = features::log_mel(captured, &self.features)?;
        let aligned = dtw::align(&ref_features, &cap_features, self.radius)?;

        Ok(AlignmentResult {
            confidence: aligned.confidence(),
            alignment: Alignment::WarpPath { path: aligned.path },
            // A warp path does not move samples; the gathered features
            // carry the alignment and the sample domain passes through.
            aligned_degraded: captured.clone(),
            aligned_features: Some(aligned.gathered),
        })
    }
}
