use anyhow::{anyhow, Result};
use serde::Deserialize;

/// A single labelled detection from one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct Detection {
    /// Class name reported by the model (e.g. "no entry").
    pub label: String,
    /// Confidence in `[0, 1]`.
    pub confidence: f32,
}

impl Detection {
    pub fn new(label: impl Into<String>, confidence: f32) -> Self {
        Self {
            label: label.into(),
            confidence,
        }
    }
}

/// Per-frame payload published by the inference pipeline.
///
/// Wire shape: `{ "predictions": { "class_name": [..], "confidence": [..] } }`.
/// Every level is optional; anything missing means "no detections".
#[derive(Debug, Default, Deserialize)]
pub struct PredictionFrame {
    #[serde(default)]
    pub predictions: Option<Predictions>,
}

/// Column-oriented detections, as emitted by the model.
#[derive(Debug, Default, Deserialize)]
pub struct Predictions {
    #[serde(default)]
    pub class_name: Option<Vec<String>>,
    #[serde(default)]
    pub confidence: Option<Vec<f32>>,
}

impl PredictionFrame {
    pub fn parse(payload: &[u8]) -> Result<Self> {
        serde_json::from_slice(payload).map_err(|e| anyhow!("invalid prediction frame: {}", e))
    }

    /// Zips the class/confidence columns into detections, in model order.
    ///
    /// Columns of different length are truncated to the shorter one. A
    /// missing confidence column yields no detections.
    pub fn detections(&self) -> Vec<Detection> {
        let Some(predictions) = &self.predictions else {
            return Vec::new();
        };
        let (Some(labels), Some(confidences)) =
            (&predictions.class_name, &predictions.confidence)
        else {
            return Vec::new();
        };
        if labels.len() != confidences.len() {
            log::warn!(
                "prediction frame has {} class names but {} confidences; truncating",
                labels.len(),
                confidences.len()
            );
        }
        labels
            .iter()
            .zip(confidences)
            .map(|(label, confidence)| Detection::new(label.clone(), *confidence))
            .collect()
    }
}

/// Selects the highest-confidence detection.
///
/// Ties go to the earliest entry. Non-finite confidences never win.
pub fn dominant(detections: &[Detection]) -> Option<&Detection> {
    let mut best: Option<&Detection> = None;
    for det in detections.iter().filter(|d| d.confidence.is_finite()) {
        match best {
            Some(current) if det.confidence <= current.confidence => {}
            _ => best = Some(det),
        }
    }
    best
}
