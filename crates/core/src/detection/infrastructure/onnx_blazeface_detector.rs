//! BlazeFace (short-range) face detector running on a worker thread.
//!
//! Inference uses ONNX Runtime via `ort`. The worker consumes one frame at a
//! time from a capacity-1 channel — the structural equivalent of the
//! service's single-in-flight contract — and streams every result back
//! through the [`DetectionSink`] it was spawned with.

use std::path::Path;
use std::thread::JoinHandle;

use crate::detection::domain::detector_bridge::DetectionSink;
use crate::detection::domain::face_detector::FaceDetector;
use crate::shared::detection::{Detection, DetectionSet};
use crate::shared::execution_provider::preferred_execution_providers;
use crate::shared::frame::Frame;

/// BlazeFace model input resolution.
const INPUT_SIZE: u32 = 128;

/// NMS IoU threshold.
const NMS_IOU_THRESH: f32 = 0.3;

/// Number of BlazeFace anchors (short-range model).
const NUM_ANCHORS: usize = 896;

struct Job {
    frame: Frame,
    timestamp_ms: u64,
}

/// Callback-driven face detector backed by a BlazeFace ONNX session.
///
/// The session lives on the worker thread for the detector's whole lifetime;
/// dropping the detector shuts the worker down.
pub struct OnnxBlazefaceDetector {
    frame_tx: Option<crossbeam_channel::Sender<Job>>,
    worker: Option<JoinHandle<()>>,
}

impl OnnxBlazefaceDetector {
    /// Load the model and start the inference worker.
    pub fn spawn(
        model_path: &Path,
        min_confidence: f32,
        sink: DetectionSink,
    ) -> Result<Self, ort::Error> {
        let session = ort::session::Session::builder()?
            .with_execution_providers(preferred_execution_providers())?
            .commit_from_file(model_path)?;

        let (frame_tx, frame_rx) = crossbeam_channel::bounded::<Job>(1);
        let worker = std::thread::spawn(move || {
            worker_loop(session, frame_rx, sink, min_confidence);
        });

        Ok(Self {
            frame_tx: Some(frame_tx),
            worker: Some(worker),
        })
    }
}

impl FaceDetector for OnnxBlazefaceDetector {
    fn submit(
        &mut self,
        frame: &Frame,
        timestamp_ms: u64,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let tx = self
            .frame_tx
            .as_ref()
            .ok_or("detector worker already shut down")?;
        tx.try_send(Job {
            frame: frame.clone(),
            timestamp_ms,
        })
        .map_err(|e| match e {
            crossbeam_channel::TrySendError::Full(_) => "detector already has a frame in flight",
            crossbeam_channel::TrySendError::Disconnected(_) => "detector worker stopped",
        })?;
        Ok(())
    }
}

impl Drop for OnnxBlazefaceDetector {
    fn drop(&mut self) {
        // Closing the channel ends the worker loop.
        self.frame_tx.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn worker_loop(
    mut session: ort::session::Session,
    frame_rx: crossbeam_channel::Receiver<Job>,
    sink: DetectionSink,
    min_confidence: f32,
) {
    let anchors = generate_anchors();
    for job in frame_rx {
        match run_detection(&mut session, &anchors, &job.frame, min_confidence) {
            Ok(detections) => sink.deliver(detections, job.timestamp_ms),
            Err(e) => sink.deliver_error(e.to_string()),
        }
    }
}

fn run_detection(
    session: &mut ort::session::Session,
    anchors: &[[f32; 2]],
    frame: &Frame,
    min_confidence: f32,
) -> Result<DetectionSet, Box<dyn std::error::Error>> {
    let input_tensor = preprocess(frame, INPUT_SIZE);
    let input_value = ort::value::Tensor::from_array(input_tensor)?;
    let outputs = session.run(ort::inputs![input_value])?;

    // BlazeFace outputs two tensors:
    // - regressors: [1, 896, 16] (box deltas + keypoints)
    // - classificators: [1, 896, 1] (confidence logits)
    if outputs.len() < 2 {
        return Err(format!("BlazeFace model expected 2 outputs, got {}", outputs.len()).into());
    }
    let regressors = outputs[0].try_extract_array::<f32>()?;
    let scores = outputs[1].try_extract_array::<f32>()?;
    let reg_data = regressors.as_slice().ok_or("cannot view regressor output")?;
    let score_data = scores.as_slice().ok_or("cannot view score output")?;

    let detections = decode(
        reg_data,
        score_data,
        anchors,
        min_confidence,
        frame.width() as f32,
        frame.height() as f32,
    );

    Ok(DetectionSet {
        detections: nms(detections, NMS_IOU_THRESH),
        image_width: frame.width(),
        image_height: frame.height(),
    })
}

/// Decode anchor-relative regressions into frame-space boxes, keeping only
/// those at or above `min_confidence`.
fn decode(
    reg_data: &[f32],
    score_data: &[f32],
    anchors: &[[f32; 2]],
    min_confidence: f32,
    frame_w: f32,
    frame_h: f32,
) -> Vec<Detection> {
    let mut detections = Vec::new();
    let count = anchors.len().min(score_data.len());

    for (i, anchor) in anchors.iter().enumerate().take(count) {
        let score = sigmoid(score_data[i]);
        if score < min_confidence {
            continue;
        }
        if (i + 1) * 16 > reg_data.len() {
            break;
        }

        let reg = &reg_data[i * 16..];
        let cx = anchor[0] + reg[0] / INPUT_SIZE as f32;
        let cy = anchor[1] + reg[1] / INPUT_SIZE as f32;
        let w = reg[2] / INPUT_SIZE as f32;
        let h = reg[3] / INPUT_SIZE as f32;

        detections.push(Detection {
            left: ((cx - w / 2.0) * frame_w).max(0.0),
            top: ((cy - h / 2.0) * frame_h).max(0.0),
            right: ((cx + w / 2.0) * frame_w).min(frame_w),
            bottom: ((cy + h / 2.0) * frame_h).min(frame_h),
            score,
        });
    }

    detections
}

/// Resize to `size x size` and normalize to [0, 1] NCHW float32.
///
/// Nearest-neighbor with pixel-center sampling, so identical frames always
/// produce identical tensors.
fn preprocess(frame: &Frame, size: u32) -> ndarray::Array4<f32> {
    let src = frame.as_ndarray();
    let src_h = frame.height() as usize;
    let src_w = frame.width() as usize;
    let s = size as usize;

    let mut tensor = ndarray::Array4::<f32>::zeros((1, 3, s, s));
    for y in 0..s {
        let src_y = (((y as f64 + 0.5) * src_h as f64 / s as f64) as usize).min(src_h - 1);
        for x in 0..s {
            let src_x = (((x as f64 + 0.5) * src_w as f64 / s as f64) as usize).min(src_w - 1);
            for c in 0..3 {
                tensor[[0, c, y, x]] = src[[src_y, src_x, c]] as f32 / 255.0;
            }
        }
    }
    tensor
}

/// BlazeFace short-range anchors: 16x16 and 8x8 grids with 2 and 6 anchors
/// per cell.
fn generate_anchors() -> Vec<[f32; 2]> {
    let strides = [(8, 2), (16, 6)]; // (stride, anchors_per_cell)
    let mut anchors = Vec::with_capacity(NUM_ANCHORS);

    for &(stride, per_cell) in &strides {
        let grid_size = INPUT_SIZE as usize / stride;
        for y in 0..grid_size {
            for x in 0..grid_size {
                let cx = (x as f32 + 0.5) / grid_size as f32;
                let cy = (y as f32 + 0.5) / grid_size as f32;
                for _ in 0..per_cell {
                    anchors.push([cx, cy]);
                }
            }
        }
    }
    anchors
}

fn nms(mut detections: Vec<Detection>, iou_thresh: f32) -> Vec<Detection> {
    detections.sort_by(|a, b| b.score.total_cmp(&a.score));

    let mut keep: Vec<Detection> = Vec::new();
    let mut suppressed = vec![false; detections.len()];
    for i in 0..detections.len() {
        if suppressed[i] {
            continue;
        }
        keep.push(detections[i]);
        for j in (i + 1)..detections.len() {
            if !suppressed[j] && iou(&detections[i], &detections[j]) > iou_thresh {
                suppressed[j] = true;
            }
        }
    }
    keep
}

fn iou(a: &Detection, b: &Detection) -> f32 {
    let x1 = a.left.max(b.left);
    let y1 = a.top.max(b.top);
    let x2 = a.right.min(b.right);
    let y2 = a.bottom.min(b.bottom);

    let inter = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    if inter == 0.0 {
        return 0.0;
    }
    let area_a = a.width() * a.height();
    let area_b = b.width() * b.height();
    inter / (area_a + area_b - inter)
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}
