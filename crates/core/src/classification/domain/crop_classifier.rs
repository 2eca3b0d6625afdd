use ndarray::Array4;

use crate::classification::domain::label_table::LabelTable;
use crate::classification::domain::score_model::ScoreModel;
use crate::shared::constants::UNKNOWN_LABEL;
use crate::shared::frame::Frame;
use crate::shared::result::Classification;

/// Runs the label model on face crops, one invocation per crop.
///
/// Crops are resized to the model's input resolution and normalized to a
/// centered range before inference; the arg-max score index selects the
/// label. Holds no per-frame state, so consecutive invocations are
/// independent.
pub struct CropClassifier {
    model: Box<dyn ScoreModel>,
    labels: LabelTable,
}

impl CropClassifier {
    pub fn new(model: Box<dyn ScoreModel>, labels: LabelTable) -> Self {
        Self { model, labels }
    }

    pub fn classify(&mut self, crop: &Frame) -> Result<Classification, Box<dyn std::error::Error>> {
        let (height, width) = self.model.input_size();
        let input = preprocess(crop, width, height);
        let scores = self.model.run(input)?;
        Ok(best_classification(&scores, &self.labels))
    }
}

/// Resize to `(target_h, target_w)` and normalize each channel from
/// `[0, 255]` to a centered range via `(v - 127) / 128`.
///
/// Nearest-neighbor with pixel-center sampling keeps the output fully
/// deterministic for identical crops.
fn preprocess(crop: &Frame, target_w: u32, target_h: u32) -> Array4<f32> {
    let src = crop.as_ndarray();
    let src_h = crop.height() as usize;
    let src_w = crop.width() as usize;
    let (th, tw) = (target_h as usize, target_w as usize);

    let mut tensor = Array4::<f32>::zeros((1, th, tw, 3));
    for y in 0..th {
        let src_y = (((y as f64 + 0.5) * src_h as f64 / th as f64) as usize).min(src_h - 1);
        for x in 0..tw {
            let src_x = (((x as f64 + 0.5) * src_w as f64 / tw as f64) as usize).min(src_w - 1);
            for c in 0..3 {
                let value = src[[src_y, src_x, c]] as f32;
                tensor[[0, y, x, c]] = (value - 127.0) / 128.0;
            }
        }
    }
    tensor
}

/// Pick the arg-max score; the label falls back to "Unknown" when the
/// winning index is outside the label table (or the score vector is empty).
fn best_classification(scores: &[f32], labels: &LabelTable) -> Classification {
    let best = scores
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| a.total_cmp(b));

    match best {
        Some((index, &confidence)) => Classification {
            label: labels
                .get(index)
                .unwrap_or(UNKNOWN_LABEL)
                .to_string(),
            confidence,
        },
        None => Classification {
            label: UNKNOWN_LABEL.to_string(),
            confidence: 0.0,
        },
    }
}
