use crate::error::QaError;
use crate::types::{AlignmentResult, SignalBuffer};

/// Alignment strategy seam: locate the reference content inside the
/// captured signal and bring the capture into the reference's timeline.
pub trait Aligner: Send + Sync {
    fn align(
        &self,
        reference: &SignalBuffer,
        captured: &SignalBuffer,
    ) -> Result<AlignmentResult, QaError>;
}

/// Bandwidth mode handed to the perceptual oracle, chosen from the sample
/// rate by the configured threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BandwidthMode {
    Narrowband,
    Wideband,
}

/// Narrow-band/wide-band perceptual quality estimator, consumed as a pure
/// function. The engine treats it as a black box: any conformant estimator
/// can be substituted without touching the alignment or metric logic, and
/// a failure here never aborts the pipeline.
pub trait PerceptualScoreOracle: Send + Sync {
    fn score(
        &self,
        sample_rate_hz: u32,
        mode: BandwidthMode,
        reference: &[f32],
        degraded: &[f32],
    ) -> Result<f32, QaError>;
}
