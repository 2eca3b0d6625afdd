use std::time::Duration;

use crate::shared::constants::UNKNOWN_LABEL;
use crate::shared::detection::DetectionSet;

/// One classifier verdict: predicted label and its confidence in `[0, 1]`.
#[derive(Clone, Debug, PartialEq)]
pub struct Classification {
    pub label: String,
    pub confidence: f32,
}

/// Everything one pipeline invocation produced for a frame.
///
/// `classifications` is index-aligned to `detections.detections`; a `None`
/// marks a face whose crop or classification failed without aborting the
/// frame. The number of `Some` entries therefore never exceeds the number of
/// detections, and entry `i` always belongs to detection `i`.
#[derive(Clone, Debug)]
pub struct CombinedResult {
    pub detections: DetectionSet,
    pub classifications: Vec<Option<Classification>>,
    /// Total processing time for the frame. Informational, not a deadline.
    pub elapsed: Duration,
    pub image_width: u32,
    pub image_height: u32,
}

impl CombinedResult {
    /// Display label for detection `index`, falling back to "Unknown" when
    /// the face has no classification.
    pub fn label_at(&self, index: usize) -> &str {
        match self.classifications.get(index) {
            Some(Some(c)) => &c.label,
            _ => UNKNOWN_LABEL,
        }
    }

    pub fn classified_count(&self) -> usize {
        self.classifications.iter().flatten().count()
    }
}
