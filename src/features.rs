use rustfft::{num_complex::Complex, FftPlanner};

use crate::config::FeatureConfig;
use crate::error::QaError;
use crate::types::{FeatureSequence, SignalBuffer};

/// Floor under mel-band energies before log compression.
const LOG_FLOOR: f64 = 1e-10;

/// Compute the log-mel spectrogram of a signal.
///
/// Frames are Hann-windowed, hop-advanced slices of the input; a signal
/// shorter than one window yields an empty sequence. The transform is
/// deterministic: identical samples and config always produce identical
/// frames, which is what makes frame distances between two signals
/// meaningful.
pub fn log_mel(signal: &SignalBuffer, config: &FeatureConfig) -> Result<FeatureSequence, QaError> {
    if signal.sample_rate_hz == 0 {
        return Err(QaError::invalid_config("sample rate must be non-zero"));
    }
    let window_len = config.window;
    let hop = config.hop;
    if window_len == 0 || hop == 0 {
        return Err(QaError::invalid_config(
            "feature window and hop must be non-zero",
        ));
    }
    let n_bins = window_len / 2 + 1;

    let nyquist = signal.sample_rate_hz as f64 / 2.0;
    let max_freq = config
        .max_freq_hz
        .map(|f| (f as f64).min(nyquist))
        .unwrap_or(nyquist);
    let filterbank = build_mel_filterbank(
        config.mel_bands,
        window_len,
        signal.sample_rate_hz as f64,
        config.min_freq_hz as f64,
        max_freq,
    );

    let window = hann_window(window_len);
    let mut planner = FftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(window_len);

    let mut frames = Vec::new();
    let samples = &signal.samples;
    if samples.len() >= window_len {
        let frame_count = (samples.len() - window_len) / hop + 1;
        let mut buf = vec![Complex::new(0.0f64, 0.0); window_len];
        let mut power = vec![0.0f64; n_bins];
        for frame_idx in 0..frame_count {
            let start = frame_idx * hop;
            for i in 0..window_len {
                buf[i] = Complex::new(samples[start + i] as f64 * window[i], 0.0);
            }
            fft.process(&mut buf);
            for (bin, value) in power.iter_mut().enumerate() {
                *value = buf[bin].norm_sqr();
            }

            let frame: Vec<f32> = filterbank
                .iter()
                .map(|filt| {
                    let energy: f64 = filt
                        .iter()
                        .zip(power.iter())
                        .map(|(&w, &p)| w * p)
                        .sum();
                    (energy + LOG_FLOOR).ln() as f32
                })
                .collect();
            frames.push(frame);
        }
    }

    Ok(FeatureSequence {
        frames,
        hop_length: hop,
        sample_rate_hz: signal.sample_rate_hz,
    })
}

pub(crate) fn hz_to_mel(hz: f64) -> f64 {
    2595.0 * (1.0 + hz / 700.0).log10()
}

pub(crate) fn mel_to_hz(mel: f64) -> f64 {
    700.0 * (10.0f64.powf(mel / 2595.0) - 1.0)
}

/// Triangular mel filterbank: `num_filters` rows of `fft_size / 2 + 1`
/// weights whose centers are evenly spaced on the mel scale.
pub(crate) fn build_mel_filterbank(
    num_filters: usize,
    fft_size: usize,
    sample_rate: f64,
    low_freq: f64,
    high_freq: f64,
) -> Vec<Vec<f64>> {
    let n_bins = fft_size / 2 + 1;
    let mel_low = hz_to_mel(low_freq);
    let mel_high = hz_to_mel(high_freq);

    // num_filters + 2 evenly spaced mel points give left/center/right edges.
    let num_points = num_filters + 2;
    let bin_indices: Vec<usize> = (0..num_points)
        .map(|i| {
            let mel = mel_low + (mel_high - mel_low) * i as f64 / (num_points - 1) as f64;
            let hz = mel_to_hz(mel);
            let bin = (fft_size as f64 * hz / sample_rate).floor() as usize;
            bin.min(n_bins.saturating_sub(1))
        })
        .collect();

    let mut filterbank = Vec::with_capacity(num_filters);
    for m in 0..num_filters {
        let mut filt = vec![0.0f64; n_bins];
        let f_left = bin_indices[m];
        let f_center = bin_indices[m + 1];
        let f_right = bin_indices[m + 2];

        if f_center > f_left {
            for k in f_left..=f_center {
                filt[k] = (k - f_left) as f64 / (f_center - f_left) as f64;
            }
        }
        if f_right > f_center {
            for k in f_center..=f_right.min(n_bins - 1) {
                filt[k] = (f_right - k) as f64 / (f_right - f_center) as f64;
            }
        }
        filterbank.push(filt);
    }
    filterbank
}

fn hann_window(len: usize) -> Vec<f64> {
    if len <= 1 {
        return vec![1.0; len];
    }
    (0..len)
        .map(|i| {
            let phase = std::f64::consts::TAU * i as f64 / (len - 1) as f64;
            0.5 * (1.0 - phase.cos())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq_hz: f32, sample_rate_hz: u32, len: usize) -> SignalBuffer {
        let samples = (0..len)
            .map(|i| {
                (std::f32::consts::TAU * freq_hz * i as f32 / sample_rate_hz as f32).sin()
            })
            .collect();
        SignalBuffer::new(samples, sample_rate_hz)
    }

    #[test]
    fn mel_conversions_are_invertible() {
        for hz in [0.0, 125.0, 440.0, 4000.0, 8000.0] {
            let roundtrip = mel_to_hz(hz_to_mel(hz));
            assert!((roundtrip - hz).abs() < 1e-6, "hz={hz} roundtrip={roundtrip}");
        }
    }

    #[test]
    fn filterbank_rows_cover_expected_bins() {
        let fb = build_mel_filterbank(26, 512, 16_000.0, 0.0, 8_000.0);
        assert_eq!(fb.len(), 26);
        for row in &fb {
            assert_eq!(row.len(), 257);
            assert!(row.iter().all(|&w| (0.0..=1.0).contains(&w)));
        }
    }

    #[test]
    fn frame_count_matches_window_hop_formula() {
        let config = FeatureConfig {
            mel_bands: 20,
            window: 400,
            hop: 160,
            min_freq_hz: 0.0,
            max_freq_hz: None,
        };
        let signal = sine(440.0, 16_000, 16_000);
        let seq = log_mel(&signal, &config).unwrap();
        assert_eq!(seq.frame_count(), (16_000 - 400) / 160 + 1);
        assert_eq!(seq.dim(), 20);
        assert_eq!(seq.hop_length, 160);
    }

    #[test]
    fn signal_shorter_than_window_yields_no_frames() {
        let config = FeatureConfig::default();
        let signal = sine(440.0, 16_000, config.window - 1);
        let seq = log_mel(&signal, &config).unwrap();
        assert!(seq.is_empty());
        assert_eq!(seq.dim(), 0);
    }

    #[test]
    fn identical_signals_produce_identical_frames() {
        let config = FeatureConfig::default();
        let signal = sine(440.0, 16_000, 8_000);
        let a = log_mel(&signal, &config).unwrap();
        let b = log_mel(&signal, &config).unwrap();
        assert_eq!(a.frames, b.frames);
    }

    #[test]
    fn tone_concentrates_energy_in_matching_band() {
        let config = FeatureConfig::default();
        let low = sine(200.0, 16_000, 16_000);
        let high = sine(6_000.0, 16_000, 16_000);
        let low_seq = log_mel(&low, &config).unwrap();
        let high_seq = log_mel(&high, &config).unwrap();

        let argmax = |frame: &[f32]| {
            frame
                .iter()
                .enumerate()
                .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
                .map(|(i, _)| i)
                .unwrap()
        };
        assert!(argmax(&low_seq.frames[0]) < argmax(&high_seq.frames[0]));
    }
}
