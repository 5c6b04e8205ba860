use rustfft::{num_complex::Complex, FftPlanner};

use crate::error::QaError;
use crate::types::{Alignment, AlignmentResult, SignalBuffer};

/// Locate the reference inside the captured signal by FFT cross-correlation.
///
/// Valid-mode: the correlation is only evaluated at offsets where the whole
/// reference fits inside the captured signal, so the scanned range is
/// `0 ..= len(captured) - len(reference)`. A captured signal shorter than
/// the reference is right-padded with zeros up to the reference length when
/// `allow_padding` is set, and rejected with `QaError::LengthMismatch`
/// otherwise.
///
/// A low confidence (the raw correlation peak) signals a poor match; no
/// threshold is applied here, the caller decides acceptability.
pub fn align(
    reference: &SignalBuffer,
    captured: &SignalBuffer,
    allow_padding: bool,
) -> Result<AlignmentResult, QaError> {
    if reference.is_empty() {
        return Err(QaError::empty_signal("cross-correlation reference"));
    }
    if captured.is_empty() {
        return Err(QaError::empty_signal("cross-correlation captured signal"));
    }

    let ref_len = reference.len();
    let mut captured_samples = captured.samples.clone();
    if captured_samples.len() < ref_len {
        if !allow_padding {
            return Err(QaError::LengthMismatch {
                reference: ref_len,
                captured: captured_samples.len(),
            });
        }
        tracing::debug!(
            reference_len = ref_len,
            captured_len = captured_samples.len(),
            "captured shorter than reference, right-padding with zeros"
        );
        captured_samples.resize(ref_len, 0.0);
    }
    let cap_len = captured_samples.len();

    let correlation = correlate_valid(&reference.samples, &captured_samples);

    let (offset, peak) = peak_offset(&correlation);

    let mut aligned = captured_samples[offset..(offset + ref_len).min(cap_len)].to_vec();
    aligned.resize(ref_len, 0.0);

    Ok(AlignmentResult {
        alignment: Alignment::SampleOffset { offset },
        confidence: peak as f32,
        aligned_degraded: SignalBuffer::new(aligned, captured.sample_rate_hz),
        aligned_features: None,
    })
}

/// Global maximum of the correlation array; strict > keeps the earliest
/// offset on exact floating ties.
fn peak_offset(correlation: &[f64]) -> (usize, f64) {
    let mut offset = 0usize;
    let mut peak = f64::NEG_INFINITY;
    for (idx, &value) in correlation.iter().enumerate() {
        if value > peak {
            peak = value;
            offset = idx;
        }
    }
    (offset, peak)
}

/// Valid-mode linear cross-correlation of `captured` against `reference`,
/// computed in the frequency domain: zero-pad both to a power of two,
/// multiply `conj(REF) * CAP`, inverse-transform. Output length is
/// `len(captured) - len(reference) + 1`.
fn correlate_valid(reference: &[f32], captured: &[f32]) -> Vec<f64> {
    let corr_len = captured.len() + reference.len() - 1;
    let fft_size = corr_len.next_power_of_two();

    let mut planner = FftPlanner::<f64>::new();
    let fft_fwd = planner.plan_fft_forward(fft_size);
    let fft_inv = planner.plan_fft_inverse(fft_size);

    let zero = Complex::new(0.0f64, 0.0);
    let mut fa: Vec<Complex<f64>> = reference
        .iter()
        .map(|&x| Complex::new(x as f64, 0.0))
        .chain(std::iter::repeat(zero))
        .take(fft_size)
        .collect();
    let mut fb: Vec<Complex<f64>> = captured
        .iter()
        .map(|&x| Complex::new(x as f64, 0.0))
        .chain(std::iter::repeat(zero))
        .take(fft_size)
        .collect();

    fft_fwd.process(&mut fa);
    fft_fwd.process(&mut fb);

    let mut fc: Vec<Complex<f64>> = fa
        .iter()
        .zip(fb.iter())
        .map(|(&a, &b)| a.conj() * b)
        .collect();
    fft_inv.process(&mut fc);

    // rustfft's inverse is unnormalized.
    let inv_n = 1.0 / fft_size as f64;
    let valid_len = captured.len() - reference.len() + 1;
    fc.iter().take(valid_len).map(|c| c.re * inv_n).collect()
}
