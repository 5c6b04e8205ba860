use crate::error::QaError;
use crate::types::{AlignedFeatures, FeatureSequence};

/// Backpointer step codes, one byte per cell.
const STEP_DIAG: u8 = 0;
const STEP_UP: u8 = 1;
const STEP_LEFT: u8 = 2;

#[derive(Debug)]
pub struct DtwAlignment {
    /// Monotonic non-decreasing (reference_frame, degraded_frame) pairs,
    /// anchored at (0, 0) and (N-1, M-1).
    pub path: Vec<(usize, usize)>,
    pub total_cost: f64,
    pub gathered: AlignedFeatures,
}

impl DtwAlignment {
    pub fn confidence(&self) -> f32 {
        (1.0 / (1.0 + self.total_cost)) as f32
    }
}

/// Radius-bounded DTW between two feature sequences.
///
/// Only cells within `radius` frames of the diagonal projection are
/// evaluated, bounding the work to O((N+M)·radius). A small radius trades
/// path quality for speed; the result stays valid and monotonic either
/// way. The radius is floored internally at the sequence length ratio so
/// the band never disconnects on very unequal lengths.
pub fn align(
    reference: &FeatureSequence,
    captured: &FeatureSequence,
    radius: usize,
) -> Result<DtwAlignment, QaError> {
    if radius == 0 {
        return Err(QaError::invalid_config("dtw radius must be at least 1"));
    }
    if reference.is_empty() {
        return Err(QaError::empty_signal("dtw reference feature sequence"));
    }
    if captured.is_empty() {
        return Err(QaError::empty_signal("dtw captured feature sequence"));
    }
    if reference.dim() != captured.dim() {
        return Err(QaError::FeatureDimMismatch {
            expected: reference.dim(),
            actual: captured.dim(),
        });
    }

    let n = reference.frame_count();
    let m = captured.frame_count();
    let radius = radius.max(n.max(m).div_ceil(n.min(m)));

    let mut prev = vec![f64::INFINITY; m];
    let mut curr = vec![f64::INFINITY; m];
    let mut bp = vec![STEP_DIAG; n * m];

    let mut prev_start = 0usize;
    let mut prev_end = 0usize;
    for i in 0..n {
        let (band_start, band_end) = band_bounds(i, n, m, radius);
        curr[band_start..=band_end].fill(f64::INFINITY);

        let bp_offset = i * m;
        for j in band_start..=band_end {
            let local = euclidean(&reference.frames[i], &captured.frames[j]);
            let (best, step) = if i == 0 && j == 0 {
                (0.0, STEP_DIAG)
            } else {
                let mut best = f64::INFINITY;
                let mut step = STEP_DIAG;
                if i > 0 && j > 0 && in_band(j - 1, prev_start, prev_end) {
                    best = prev[j - 1];
                }
                if i > 0 && in_band(j, prev_start, prev_end) && prev[j] < best {
                    best = prev[j];
                    step = STEP_UP;
                }
                if j > band_start && curr[j - 1] < best {
                    best = curr[j - 1];
                    step = STEP_LEFT;
                }
                (best, step)
            };
            curr[j] = best + local;
            bp[bp_offset + j] = step;
        }

        std::mem::swap(&mut prev, &mut curr);
        prev_start = band_start;
        prev_end = band_end;
    }

    let total_cost = prev[m - 1];
    let path = backtrack(&bp, n, m);
    let gathered = gather(reference, captured, &path);

    Ok(DtwAlignment {
        path,
        total_cost,
        gathered,
    })
}

/// Band of degraded frames evaluated for reference frame `i`: the diagonal
/// projection `i·M/N` widened by the radius, clamped to `[0, M)`.
fn band_bounds(i: usize, n: usize, m: usize, radius: usize) -> (usize, usize) {
    let center = if n <= 1 {
        0
    } else {
        (i as f64 * (m - 1) as f64 / (n - 1) as f64).round() as usize
    };
    let start = center.saturating_sub(radius);
    let end = (center + radius).min(m - 1);
    (start, end)
}

fn in_band(j: usize, start: usize, end: usize) -> bool {
    j >= start && j <= end
}

fn euclidean(a: &[f32], b: &[f32]) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    a.iter()
        .zip(b.iter())
        .map(|(&x, &y)| {
            let d = x as f64 - y as f64;
            d * d
        })
        .sum::<f64>()
        .sqrt()
}

fn backtrack(bp: &[u8], n: usize, m: usize) -> Vec<(usize, usize)> {
    let mut path = Vec::with_capacity(n.max(m));
    let mut i = n - 1;
    let mut j = m - 1;
    path.push((i, j));
    while i > 0 || j > 0 {
        match bp[i * m + j] {
            STEP_DIAG => {
                debug_assert!(i >= 1 && j >= 1);
                i -= 1;
                j -= 1;
            }
            STEP_UP => {
                debug_assert!(i >= 1);
                i -= 1;
            }
            _ => {
                debug_assert!(j >= 1);
                j -= 1;
            }
        }
        path.push((i, j));
    }
    path.reverse();
    path
}

/// Gather the feature rows along the path. Many-to-one mappings are
/// expected; the two gathered sequences always have equal length.
fn gather(
    reference: &FeatureSequence,
    captured: &FeatureSequence,
    path: &[(usize, usize)],
) -> AlignedFeatures {
    let ref_frames = path
        .iter()
        .map(|&(i, _)| reference.frames[i].clone())
        .collect();
    let deg_frames = path
        .iter()
        .map(|&(_, j)| captured.frames[j].clone())
        .collect();
    AlignedFeatures {
        reference: FeatureSequence {
            frames: ref_frames,
            hop_length: reference.hop_length,
            sample_rate_hz: reference.sample_rate_hz,
        },
        degraded: FeatureSequence {
            frames: deg_frames,
            hop_length: captured.hop_length,
            sample_rate_hz: captured.sample_rate_hz,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sequence(frames: Vec<Vec<f32>>) -> FeatureSequence {
        FeatureSequence {
            frames,
            hop_length: 256,
            sample_rate_hz: 16_000,
        }
    }

    fn assert_valid_path(path: &[(usize, usize)], n: usize, m: usize) {
        assert_eq!(path.first(), Some(&(0, 0)));
        assert_eq!(path.last(), Some(&(n - 1, m - 1)));
        for pair in path.windows(2) {
            let (i0, j0) = pair[0];
            let (i1, j1) = pair[1];
            assert!(i1 >= i0 && j1 >= j0, "path must be monotonic");
            assert!(i1 - i0 <= 1 && j1 - j0 <= 1, "path must advance by single steps");
            assert!(i1 > i0 || j1 > j0, "path must advance");
        }
        let ref_covered: std::collections::HashSet<usize> =
            path.iter().map(|&(i, _)| i).collect();
        let deg_covered: std::collections::HashSet<usize> =
            path.iter().map(|&(_, j)| j).collect();
        assert_eq!(ref_covered.len(), n, "every reference index appears");
        assert_eq!(deg_covered.len(), m, "every degraded index appears");
    }

    #[test]
    fn identical_sequences_align_on_the_diagonal() {
        let frames: Vec<Vec<f32>> = (0..6).map(|i| vec![i as f32, -(i as f32)]).collect();
        let a = sequence(frames.clone());
        let b = sequence(frames);
        let result = align(&a, &b, 2).unwrap();

        let diagonal: Vec<(usize, usize)> = (0..6).map(|i| (i, i)).collect();
        assert_eq!(result.path, diagonal);
        assert!(result.total_cost.abs() < 1e-9);
        assert!((result.confidence() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn stretched_sequence_yields_valid_monotonic_path() {
        // The captured sequence repeats every reference frame twice,
        // emulating a 2x tempo stretch.
        let ref_frames: Vec<Vec<f32>> = (0..5).map(|i| vec![i as f32]).collect();
        let deg_frames: Vec<Vec<f32>> = (0..5)
            .flat_map(|i| [vec![i as f32], vec![i as f32]])
            .collect();
        let reference = sequence(ref_frames);
        let captured = sequence(deg_frames);
        let result = align(&reference, &captured, 3).unwrap();

        assert_valid_path(&result.path, 5, 10);
        assert!(result.total_cost.abs() < 1e-9);
        assert_eq!(
            result.gathered.reference.frame_count(),
            result.gathered.degraded.frame_count()
        );
    }

    #[test]
    fn tiny_radius_still_produces_valid_path() {
        let ref_frames: Vec<Vec<f32>> = (0..8).map(|i| vec![(i % 3) as f32]).collect();
        let deg_frames: Vec<Vec<f32>> = (0..13).map(|i| vec![(i % 4) as f32]).collect();
        let result = align(&sequence(ref_frames), &sequence(deg_frames), 1).unwrap();
        assert_valid_path(&result.path, 8, 13);
    }

    #[test]
    fn empty_sequence_is_a_hard_error() {
        let empty = sequence(Vec::new());
        let ok = sequence(vec![vec![0.0]]);
        assert!(matches!(
            align(&empty, &ok, 4),
            Err(QaError::EmptySignal { .. })
        ));
        assert!(matches!(
            align(&ok, &empty, 4),
            Err(QaError::EmptySignal { .. })
        ));
    }

    #[test]
    fn zero_radius_is_rejected() {
        let a = sequence(vec![vec![0.0]]);
        assert!(matches!(
            align(&a, &a, 0),
            Err(QaError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn mismatched_dimensions_are_rejected() {
        let a = sequence(vec![vec![0.0, 1.0]]);
        let b = sequence(vec![vec![0.0]]);
        assert!(matches!(
            align(&a, &b, 4),
            Err(QaError::FeatureDimMismatch {
                expected: 2,
                actual: 1
            })
        ));
    }

    #[test]
    fn single_frame_sequences_align_trivially() {
        let a = sequence(vec![vec![1.0]]);
        let b = sequence(vec![vec![4.0]]);
        let result = align(&a, &b, 1).unwrap();
        assert_eq!(result.path, vec![(0, 0)]);
        assert!((result.total_cost - 3.0).abs() < 1e-9);
    }
}
