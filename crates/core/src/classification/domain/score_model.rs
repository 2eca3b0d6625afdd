use ndarray::Array4;

/// Domain interface for the opaque label-scoring model.
///
/// A fixed-shape image-in / score-vector-out service: input resolution and
/// class count are decided by the loaded model and immutable afterwards.
pub trait ScoreModel: Send {
    /// Expected input resolution as `(height, width)`.
    fn input_size(&self) -> (u32, u32);

    /// Length of the score vector.
    fn num_classes(&self) -> usize;

    /// Run one inference on a normalized NHWC `[1, height, width, 3]` tensor.
    fn run(&mut self, input: Array4<f32>) -> Result<Vec<f32>, Box<dyn std::error::Error>>;
}
