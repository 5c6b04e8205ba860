use crate::config::QaConfig;
use crate::error::QaError;
use crate::features;
use crate::metrics::engine::{QualityMetricsEngine, SpectralInput};
use crate::metrics::gain;
use crate::pipeline::traits::{Aligner, PerceptualScoreOracle};
use crate::types::{Evaluation, SignalBuffer};

/// The assembled scoring pipeline: align, gain-match, compute metrics.
///
/// Holds no state across calls; each `evaluate` is independent and
/// side-effect-free, so one scorer may be shared across worker threads for
/// batch scoring without locking.
pub struct QualityScorer {
    config: QaConfig,
    aligner: Box<dyn Aligner>,
    oracle: Option<Box<dyn PerceptualScoreOracle>>,
    engine: QualityMetricsEngine,
}

pub(crate) struct QualityScorerParts {
    pub config: QaConfig,
    pub aligner: Box<dyn Aligner>,
    pub oracle: Option<Box<dyn PerceptualScoreOracle>>,
}

impl QualityScorer {
    pub(crate) fn from_parts(parts: QualityScorerParts) -> Self {
        let engine = QualityMetricsEngine::new(
            parts.config.weights.clone(),
            parts.config.truncation,
            parts.config.wideband_min_rate_hz,
        );
        Self {
            config: parts.config,
            aligner: parts.aligner,
            oracle: parts.oracle,
            engine,
        }
    }

    pub fn config(&self) -> &QaConfig {
        &self.config
    }

    /// Run the full pipeline on one (reference, captured) pair.
    pub fn evaluate(
        &self,
        reference: &SignalBuffer,
        captured: &SignalBuffer,
    ) -> Result<Evaluation, QaError> {
        if reference.is_empty() {
            return Err(QaError::empty_signal("reference"));
        }
        if captured.is_empty() {
            return Err(QaError::empty_signal("captured signal"));
        }
        if reference.sample_rate_hz != captured.sample_rate_hz {
            tracing::warn!(
                reference_rate_hz = reference.sample_rate_hz,
                captured_rate_hz = captured.sample_rate_hz,
                "sample rates differ; metrics assume a shared rate and may degrade"
            );
        }

        let alignment = self.aligner.align(reference, captured)?;
        let normalized = gain::normalize(reference, &alignment.aligned_degraded, &self.config.gain);

        let oracle = self.oracle.as_deref();
        let metrics = match &alignment.aligned_features {
            Some(aligned) => self.engine.score(
                reference,
                &normalized,
                SpectralInput::Aligned {
                    reference: &aligned.reference,
                    degraded: &aligned.degraded,
                },
                oracle,
            ),
            None => {
                // Sample-level alignment only: fall back to plain framewise
                // features of the pair, flagged as a raw approximation.
                let ref_features = features::log_mel(reference, &self.config.features)?;
                let deg_features = features::log_mel(&normalized, &self.config.features)?;
                self.engine.score(
                    reference,
                    &normalized,
                    SpectralInput::Raw {
                        reference: &ref_features,
                        degraded: &deg_features,
                    },
                    oracle,
                )
            }
        };

        tracing::debug!(
            confidence = alignment.confidence,
            composite_score = metrics.composite_score,
            snr_db = metrics.snr_db,
            "pair evaluated"
        );

        Ok(Evaluation { alignment, metrics })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::builder::QualityScorerBuilder;
    use crate::types::Alignment;

    fn tone(amplitude: f32, len: usize) -> SignalBuffer {
        let samples = (0..len)
            .map(|i| amplitude * (std::f32::consts::TAU * 440.0 * i as f32 / 16_000.0).sin())
            .collect();
        SignalBuffer::new(samples, 16_000)
    }

    #[test]
    fn evaluate_rejects_empty_inputs() {
        let scorer = QualityScorerBuilder::new(QaConfig::default()).build().unwrap();
        let empty = SignalBuffer::new(Vec::new(), 16_000);
        let ok = tone(0.5, 4_000);
        assert!(matches!(
            scorer.evaluate(&empty, &ok),
            Err(QaError::EmptySignal { .. })
        ));
        assert!(matches!(
            scorer.evaluate(&ok, &empty),
            Err(QaError::EmptySignal { .. })
        ));
    }

    #[test]
    fn evaluate_clean_pair_reports_near_perfect_quality() {
        let scorer = QualityScorerBuilder::new(QaConfig::default()).build().unwrap();
        let reference = tone(0.8, 16_000);
        let mut captured_samples = vec![0.0f32; 1_000];
        captured_samples.extend_from_slice(&reference.samples);
        let captured = SignalBuffer::new(captured_samples, 16_000);

        let evaluation = scorer.evaluate(&reference, &captured).unwrap();
        assert_eq!(
            evaluation.alignment.alignment,
            Alignment::SampleOffset { offset: 1_000 }
        );
        assert!(evaluation.metrics.composite_score > 99.0);
        assert!(evaluation.metrics.snr_db > 40.0);
    }
}
