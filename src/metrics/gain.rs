use crate::config::GainConfig;
use crate::types::SignalBuffer;

/// Root-mean-square level of a sample slice.
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let mean_sq =
        samples.iter().map(|&x| (x as f64) * (x as f64)).sum::<f64>() / samples.len() as f64;
    mean_sq.sqrt() as f32
}

/// Scale the degraded signal so its RMS matches the reference.
///
/// `gain = rms(reference) / (rms(degraded) + epsilon)`. A silent degraded
/// signal would otherwise produce an enormous gain, so the gain is clamped
/// to the configured ceiling before it can overflow into later metrics.
pub fn normalize(
    reference: &SignalBuffer,
    degraded: &SignalBuffer,
    config: &GainConfig,
) -> SignalBuffer {
    let reference_rms = rms(&reference.samples);
    let degraded_rms = rms(&degraded.samples);
    let mut gain = reference_rms / (degraded_rms + config.epsilon);
    if gain > config.max_gain {
        tracing::warn!(
            gain,
            max_gain = config.max_gain,
            degraded_rms,
            "gain normalization clamped; degraded signal is near-silent"
        );
        gain = config.max_gain;
    }

    let samples = degraded.samples.iter().map(|&s| s * gain).collect();
    SignalBuffer::new(samples, degraded.sample_rate_hz)
}
