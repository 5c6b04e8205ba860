use serde::Serialize;

use crate::alignment::silence;
use crate::error::QaError;
use crate::types::{Alignment, Evaluation, QualityMetrics, SignalBuffer};

const SCHEMA_VERSION: u32 = 1;
const CLIPPING_NOTE_THRESHOLD: f32 = 0.01;

/// Serializable per-pair diagnostic record. Pure data; rendering and export
/// live outside the engine.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub schema_version: u32,
    pub alignment: AlignmentSummary,
    pub metrics: QualityMetrics,
    pub signal: SignalDiagnostics,
    pub notes: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlignmentKind {
    SampleOffset,
    WarpPath,
}

#[derive(Debug, Clone, Serialize)]
pub struct AlignmentSummary {
    pub kind: AlignmentKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_offset: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warp_path_len: Option<usize>,
    pub confidence: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct SignalDiagnostics {
    pub reference_duration_ms: f64,
    pub captured_duration_ms: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub captured_leading_activity_ms: Option<f64>,
    pub reference_clipping_ratio: f32,
    pub captured_clipping_ratio: f32,
}

impl Report {
    pub fn from_evaluation(
        reference: &SignalBuffer,
        captured: &SignalBuffer,
        evaluation: &Evaluation,
    ) -> Self {
        let (kind, sample_offset, warp_path_len) = match &evaluation.alignment.alignment {
            Alignment::SampleOffset { offset } => {
                (AlignmentKind::SampleOffset, Some(*offset), None)
            }
            Alignment::WarpPath { path } => (AlignmentKind::WarpPath, None, Some(path.len())),
        };

        let reference_clipping_ratio = silence::clipping_ratio(&reference.samples);
        let captured_clipping_ratio = silence::clipping_ratio(&captured.samples);

        let mut notes = Vec::new();
        if silence::is_effectively_silent(captured) {
            notes.push("captured signal is effectively silent".to_string());
        }
        if captured_clipping_ratio >= CLIPPING_NOTE_THRESHOLD {
            notes.push(format!(
                "captured signal clips in {:.1}% of samples",
                captured_clipping_ratio * 100.0
            ));
        }
        if evaluation.metrics.snr_db.is_infinite() {
            notes.push("bit-perfect match: snr_db is infinite".to_string());
        }

        Self {
            schema_version: SCHEMA_VERSION,
            alignment: AlignmentSummary {
                kind,
                sample_offset,
                warp_path_len,
                confidence: evaluation.alignment.confidence,
            },
            metrics: evaluation.metrics.clone(),
            signal: SignalDiagnostics {
                reference_duration_ms: reference.duration_ms(),
                captured_duration_ms: captured.duration_ms(),
                captured_leading_activity_ms: silence::leading_activity_ms(captured),
                reference_clipping_ratio,
                captured_clipping_ratio,
            },
            notes,
        }
    }

    pub fn to_json(&self) -> Result<String, QaError> {
        serde_json::to_string_pretty(self).map_err(|e| QaError::runtime("serialize report", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::QaConfig;
    use crate::pipeline::builder::QualityScorerBuilder;

    fn tone(amplitude: f32, len: usize) -> SignalBuffer {
        let samples = (0..len)
            .map(|i| amplitude * (std::f32::consts::TAU * 440.0 * i as f32 / 16_000.0).sin())
            .collect();
        SignalBuffer::new(samples, 16_000)
    }

    #[test]
    fn report_serializes_offset_alignment() {
        let scorer = QualityScorerBuilder::new(QaConfig::default()).build().unwrap();
        let reference = tone(0.8, 8_000);
        let mut captured_samples = vec![0.0f32; 3_200];
        captured_samples.extend_from_slice(&reference.samples);
        let captured = SignalBuffer::new(captured_samples, 16_000);

        let evaluation = scorer.evaluate(&reference, &captured).unwrap();
        let report = Report::from_evaluation(&reference, &captured, &evaluation);
        assert_eq!(report.schema_version, 1);
        assert_eq!(report.alignment.sample_offset, Some(3_200));
        assert!(report.alignment.warp_path_len.is_none());
        assert!(report.signal.captured_leading_activity_ms.is_some());

        let json = report.to_json().unwrap();
        assert!(json.contains("\"sample_offset\""));
        assert!(json.contains("\"composite_score\""));
    }

    #[test]
    fn silent_capture_is_noted() {
        let scorer = QualityScorerBuilder::new(QaConfig::default()).build().unwrap();
        let reference = tone(0.8, 8_000);
        let captured = SignalBuffer::new(vec![0.0; 8_000], 16_000);

        let evaluation = scorer.evaluate(&reference, &captured).unwrap();
        let report = Report::from_evaluation(&reference, &captured, &evaluation);
        assert!(report
            .notes
            .iter()
            .any(|note| note.contains("effectively silent")));
    }
}
