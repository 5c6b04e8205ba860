pub mod alignment;
pub mod config;
pub mod error;
pub mod features;
pub mod metrics;
pub mod pipeline;
pub mod report;
pub mod types;

pub use config::{
    AlignmentMethod, CompositeWeights, FeatureConfig, GainConfig, QaConfig, TruncationSide,
};
pub use error::QaError;
pub use pipeline::builder::QualityScorerBuilder;
pub use pipeline::defaults::{CrossCorrelationAligner, DtwAligner};
pub use pipeline::runtime::QualityScorer;
pub use pipeline::traits::{Aligner, BandwidthMode, PerceptualScoreOracle};
pub use report::Report;
pub use types::{
    AlignedFeatures, Alignment, AlignmentResult, Evaluation, FeatureSequence, QualityMetrics,
    SignalBuffer, SpectralBasis,
};
