use crate::config::{AlignmentMethod, QaConfig};
use crate::error::QaError;
use crate::pipeline::defaults::{CrossCorrelationAligner, DtwAligner};
use crate::pipeline::runtime::{QualityScorer, QualityScorerParts};
use crate::pipeline::traits::{Aligner, PerceptualScoreOracle};

/// Assembles a [`QualityScorer`], defaulting the alignment strategy from
/// the configured method and leaving the perceptual oracle unset unless one
/// is supplied.
pub struct QualityScorerBuilder {
    config: QaConfig,
    aligner: Option<Box<dyn Aligner>>,
    oracle: Option<Box<dyn PerceptualScoreOracle>>,
}

impl QualityScorerBuilder {
    pub fn new(config: QaConfig) -> Self {
        Self {
            config,
            aligner: None,
            oracle: None,
        }
    }

    pub fn with_aligner(mut self, aligner: Box<dyn Aligner>) -> Self {
        self.aligner = Some(aligner);
        self
    }

    pub fn with_perceptual_oracle(mut self, oracle: Box<dyn PerceptualScoreOracle>) -> Self {
        self.oracle = Some(oracle);
        self
    }

    pub fn build(self) -> Result<QualityScorer, QaError> {
        self.config.validate()?;

        let aligner = match self.aligner {
            Some(aligner) => aligner,
            None => match self.config.method {
                AlignmentMethod::CrossCorrelation => {
                    Box::new(CrossCorrelationAligner::new(self.config.allow_padding))
                        as Box<dyn Aligner>
                }
                AlignmentMethod::Dtw => Box::new(DtwAligner::new(
                    self.config.features.clone(),
                    self.config.dtw_radius,
                )),
            },
        };

        Ok(QualityScorer::from_parts(QualityScorerParts {
            config: self.config,
            aligner,
            oracle: self.oracle,
        }))
    }
}
