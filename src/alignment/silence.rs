use crate::types::SignalBuffer;

const BASELINE_FRAMES: usize = 10;
const MIN_CONSEC_FRAMES: usize = 3;
const THRESHOLD_MULTIPLIER: f32 = 4.0;
const MIN_THRESHOLD: f32 = 0.01;
const FRAME_MS: f64 = 20.0;
const CLIPPING_THRESHOLD: f32 = 0.999;

/// Millisecond position of the first sustained activity, measured by frame
/// RMS against a noise floor estimated from the leading frames. `None` when
/// the signal never rises above the floor.
pub fn leading_activity_ms(signal: &SignalBuffer) -> Option<f64> {
    let frame_rms = compute_frame_rms(&signal.samples, signal.sample_rate_hz)?;

    let noise_floor = front_noise_floor(&frame_rms);
    let threshold = (noise_floor * THRESHOLD_MULTIPLIER).max(MIN_THRESHOLD);
    first_run_above_threshold(&frame_rms, threshold, MIN_CONSEC_FRAMES)
        .map(|frame| frame as f64 * FRAME_MS)
}

/// True when no frame of the signal exceeds the absolute silence threshold.
pub fn is_effectively_silent(signal: &SignalBuffer) -> bool {
    match compute_frame_rms(&signal.samples, signal.sample_rate_hz) {
        Some(frame_rms) => frame_rms.iter().all(|&rms| rms < MIN_THRESHOLD),
        None => true,
    }
}

/// Fraction of samples at or beyond full scale.
pub fn clipping_ratio(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let clipped = samples
        .iter()
        .filter(|&&s| s.abs() >= CLIPPING_THRESHOLD)
        .count();
    clipped as f32 / samples.len() as f32
}

fn front_noise_floor(frame_rms: &[f32]) -> f32 {
    let baseline_frames = frame_rms.len().min(BASELINE_FRAMES);
    frame_rms.iter().take(baseline_frames).copied().sum::<f32>() / baseline_frames as f32
}

fn first_run_above_threshold(
    frame_rms: &[f32],
    threshold: f32,
    min_consec_frames: usize,
) -> Option<usize> {
    let mut run_start = 0usize;
    let mut run_len = 0usize;
    for (frame_idx, rms) in frame_rms.iter().copied().enumerate() {
        if rms >= threshold {
            if run_len == 0 {
                run_start = frame_idx;
            }
            run_len += 1;
            if run_len >= min_consec_frames {
                return Some(run_start);
            }
            continue;
        }
        run_len = 0;
    }
    None
}

fn compute_frame_rms(samples: &[f32], sample_rate_hz: u32) -> Option<Vec<f32>> {
    if samples.is_empty() || sample_rate_hz == 0 {
        return None;
    }
    let frame_len = ((sample_rate_hz as f64 * FRAME_MS) / 1000.0).round() as usize;
    let frame_len = frame_len.max(1);

    let mut frame_rms = Vec::new();
    for chunk in samples.chunks(frame_len) {
        let mean_sq =
            chunk.iter().map(|&x| (x as f64) * (x as f64)).sum::<f64>() / chunk.len() as f64;
        frame_rms.push(mean_sq.sqrt() as f32);
    }
    Some(frame_rms)
}
