pub mod cross_correlation;
pub mod dtw;
pub mod silence;
