pub mod engine;
pub mod gain;
