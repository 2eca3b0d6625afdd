use std::path::Path;

use ndarray::Array4;
use thiserror::Error;

use crate::classification::domain::score_model::ScoreModel;
use crate::shared::execution_provider::preferred_execution_providers;

#[derive(Error, Debug)]
pub enum ModelLoadError {
    #[error("failed to load classifier model: {0}")]
    Session(#[from] ort::Error),
    #[error("unsupported classifier model shape: {0}")]
    UnsupportedShape(String),
}

/// Label model backed by a long-lived ONNX Runtime session.
///
/// The session is created once and reused for every crop; input resolution
/// and class count are read from the model at load time. Expects an NHWC
/// `[1, height, width, 3]` float input and a `[1, num_classes]` output.
pub struct OrtScoreModel {
    session: ort::session::Session,
    input_height: u32,
    input_width: u32,
    num_classes: usize,
}

impl OrtScoreModel {
    pub fn load(model_path: &Path) -> Result<Self, ModelLoadError> {
        let session = ort::session::Session::builder()?
            .with_execution_providers(preferred_execution_providers())?
            .commit_from_file(model_path)?;

        let (input_height, input_width) = read_input_size(&session)?;
        let num_classes = read_num_classes(&session)?;

        log::info!(
            "classifier model loaded: {input_width}x{input_height} input, {num_classes} classes"
        );

        Ok(Self {
            session,
            input_height,
            input_width,
            num_classes,
        })
    }
}

impl ScoreModel for OrtScoreModel {
    fn input_size(&self) -> (u32, u32) {
        (self.input_height, self.input_width)
    }

    fn num_classes(&self) -> usize {
        self.num_classes
    }

    fn run(&mut self, input: Array4<f32>) -> Result<Vec<f32>, Box<dyn std::error::Error>> {
        let input_value = ort::value::Tensor::from_array(input)?;
        let outputs = self.session.run(ort::inputs![input_value])?;
        let scores = outputs[0].try_extract_array::<f32>()?;
        Ok(scores.iter().copied().collect())
    }
}

/// Input shape must be `[batch, height, width, 3]`.
fn read_input_size(session: &ort::session::Session) -> Result<(u32, u32), ModelLoadError> {
    let input = session
        .inputs()
        .first()
        .ok_or_else(|| ModelLoadError::UnsupportedShape("model has no inputs".into()))?;

    let dims: Vec<i64> = input
        .dtype()
        .tensor_shape()
        .ok_or_else(|| ModelLoadError::UnsupportedShape("input is not a tensor".into()))?
        .to_vec();

    if dims.len() != 4 || dims[3] != 3 {
        return Err(ModelLoadError::UnsupportedShape(format!(
            "expected [1, height, width, 3] input, got {dims:?}"
        )));
    }
    let (height, width) = (dims[1], dims[2]);
    if height <= 0 || width <= 0 {
        return Err(ModelLoadError::UnsupportedShape(format!(
            "input resolution must be static, got {dims:?}"
        )));
    }
    Ok((height as u32, width as u32))
}

/// Output shape must be `[batch, num_classes]`.
fn read_num_classes(session: &ort::session::Session) -> Result<usize, ModelLoadError> {
    let output = session
        .outputs()
        .first()
        .ok_or_else(|| ModelLoadError::UnsupportedShape("model has no outputs".into()))?;

    let dims: Vec<i64> = output
        .dtype()
        .tensor_shape()
        .ok_or_else(|| ModelLoadError::UnsupportedShape("output is not a tensor".into()))?
        .to_vec();

    if dims.len() != 2 || dims[1] <= 0 {
        return Err(ModelLoadError::UnsupportedShape(format!(
            "expected [1, num_classes] output, got {dims:?}"
        )));
    }
    Ok(dims[1] as usize)
}
