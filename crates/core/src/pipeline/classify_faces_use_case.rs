use std::time::Instant;

use thiserror::Error;

use crate::classification::domain::crop_classifier::CropClassifier;
use crate::detection::domain::detector_bridge::{DetectorBridge, DetectorError};
use crate::detection::domain::face_cropper::crop_face;
use crate::ingest::frame_converter::{convert, ConvertError};
use crate::ingest::raw_frame::RawFrame;
use crate::pipeline::last_crops::LastCrops;
use crate::pipeline::pipeline_logger::PipelineLogger;
use crate::shared::frame::Frame;
use crate::shared::result::CombinedResult;

#[derive(Error, Debug)]
pub enum ProcessFrameError {
    #[error(transparent)]
    Convert(#[from] ConvertError),
    #[error(transparent)]
    Detector(#[from] DetectorError),
}

/// Per-frame orchestrator: convert → detect → crop → classify → assemble.
///
/// A convert or detect failure aborts the whole invocation; a crop or
/// classification failure for one face only leaves a gap at that face's
/// index. `process_frame` takes `&mut self`, so invocations are serialized
/// and at most one detection is ever in flight — the discipline the detector
/// bridge's latest-value buffer relies on. Callers under live load should
/// feed frames through a latest-wins mailbox so stale frames are dropped,
/// not queued.
pub struct ClassifyFacesUseCase {
    bridge: DetectorBridge,
    classifier: CropClassifier,
    last_crops: LastCrops,
    logger: Box<dyn PipelineLogger>,
}

impl ClassifyFacesUseCase {
    pub fn new(
        bridge: DetectorBridge,
        classifier: CropClassifier,
        logger: Box<dyn PipelineLogger>,
    ) -> Self {
        Self {
            bridge,
            classifier,
            last_crops: LastCrops::new(),
            logger,
        }
    }

    /// Handle to the crop snapshot updated by every processed frame.
    pub fn last_crops(&self) -> LastCrops {
        self.last_crops.clone()
    }

    pub fn summary(&self) {
        self.logger.summary();
    }

    /// Process one raw camera frame end to end.
    ///
    /// The raw frame is consumed — its buffer is released on every exit
    /// path. `scale_factor` maps detector-space box coordinates into frame
    /// pixels (1.0 when detection runs on the frame itself).
    pub fn process_frame(
        &mut self,
        raw: RawFrame,
        scale_factor: f32,
    ) -> Result<CombinedResult, ProcessFrameError> {
        let start = Instant::now();

        let frame = convert(raw)?;
        self.log_stage("convert", start);

        let detect_start = Instant::now();
        let detections = self.bridge.detect(&frame)?;
        self.log_stage("detect", detect_start);

        let crop_start = Instant::now();
        let crops: Vec<Option<Frame>> = detections
            .iter()
            .map(|detection| crop_face(&frame, detection, scale_factor))
            .collect();
        self.last_crops
            .publish(crops.iter().flatten().cloned().collect());
        self.log_stage("crop", crop_start);

        let classify_start = Instant::now();
        let classifications = crops
            .iter()
            .enumerate()
            .map(|(index, crop)| match crop {
                Some(crop) => match self.classifier.classify(crop) {
                    Ok(classification) => Some(classification),
                    Err(e) => {
                        log::warn!("classification failed for face {index}: {e}");
                        None
                    }
                },
                None => None,
            })
            .collect();
        self.log_stage("classify", classify_start);

        self.logger
            .metric("faces_per_frame", detections.len() as f64);
        self.logger.frame_done();

        Ok(CombinedResult {
            image_width: frame.width(),
            image_height: frame.height(),
            detections,
            classifications,
            elapsed: start.elapsed(),
        })
    }

    fn log_stage(&mut self, stage: &str, since: Instant) {
        self.logger
            .timing(stage, since.elapsed().as_secs_f64() * 1000.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classification::domain::label_table::LabelTable;
    use crate::classification::domain::score_model::ScoreModel;
    use crate::detection::domain::detector_bridge::DetectionSink;
    use crate::detection::domain::face_detector::FaceDetector;
    use crate::ingest::raw_frame::BYTES_PER_PIXEL;
    use crate::pipeline::pipeline_logger::NullPipelineLogger;
    use crate::shared::detection::{Detection, DetectionSet};
    use ndarray::Array4;
    use std::time::Duration;

    // --- Stubs ---

    /// Delivers a fixed sequence of detection sets, one per submission.
    struct ScriptedDetector {
        sink: DetectionSink,
        script: Vec<Vec<Detection>>,
        calls: usize,
        delay: Option<Duration>,
    }

    impl ScriptedDetector {
        fn new(sink: DetectionSink, script: Vec<Vec<Detection>>) -> Self {
            Self {
                sink,
                script,
                calls: 0,
                delay: None,
            }
        }

        fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }
    }

    impl FaceDetector for ScriptedDetector {
        fn submit(
            &mut self,
            frame: &Frame,
            timestamp_ms: u64,
        ) -> Result<(), Box<dyn std::error::Error>> {
            let detections = self.script[self.calls % self.script.len()].clone();
            self.calls += 1;
            let result = DetectionSet {
                detections,
                image_width: frame.width(),
                image_height: frame.height(),
            };
            match self.delay {
                None => self.sink.deliver(result, timestamp_ms),
                Some(delay) => {
                    let sink = self.sink.clone();
                    std::thread::spawn(move || {
                        std::thread::sleep(delay);
                        sink.deliver(result, timestamp_ms);
                    });
                }
            }
            Ok(())
        }
    }

    struct BrokenDetector {
        sink: DetectionSink,
    }

    impl FaceDetector for BrokenDetector {
        fn submit(
            &mut self,
            _frame: &Frame,
            _timestamp_ms: u64,
        ) -> Result<(), Box<dyn std::error::Error>> {
            self.sink.deliver_error("detector crashed");
            Ok(())
        }
    }

    struct StubModel {
        scores: Vec<f32>,
    }

    impl ScoreModel for StubModel {
        fn input_size(&self) -> (u32, u32) {
            (4, 4)
        }

        fn num_classes(&self) -> usize {
            self.scores.len()
        }

        fn run(&mut self, _input: Array4<f32>) -> Result<Vec<f32>, Box<dyn std::error::Error>> {
            Ok(self.scores.clone())
        }
    }

    /// Fails on selected invocations to exercise per-face degradation.
    struct FlakyModel {
        scores: Vec<f32>,
        fail_on_calls: Vec<usize>,
        calls: usize,
    }

    impl ScoreModel for FlakyModel {
        fn input_size(&self) -> (u32, u32) {
            (4, 4)
        }

        fn num_classes(&self) -> usize {
            self.scores.len()
        }

        fn run(&mut self, _input: Array4<f32>) -> Result<Vec<f32>, Box<dyn std::error::Error>> {
            let call = self.calls;
            self.calls += 1;
            if self.fail_on_calls.contains(&call) {
                Err("transient inference failure".into())
            } else {
                Ok(self.scores.clone())
            }
        }
    }

    // --- Helpers ---

    fn raw_frame(w: u32, h: u32) -> RawFrame {
        RawFrame::new(vec![0u8; (w as usize) * (h as usize) * BYTES_PER_PIXEL], w, h, 0)
    }

    fn detection(left: f32, top: f32, right: f32, bottom: f32) -> Detection {
        Detection {
            left,
            top,
            right,
            bottom,
            score: 0.9,
        }
    }

    fn use_case_with(
        detector: Box<dyn FaceDetector>,
        sink: DetectionSink,
        model: Box<dyn ScoreModel>,
        labels: LabelTable,
    ) -> ClassifyFacesUseCase {
        ClassifyFacesUseCase::new(
            DetectorBridge::new(detector, sink).with_timeout(Duration::from_millis(500)),
            CropClassifier::new(model, labels),
            Box::new(NullPipelineLogger),
        )
    }

    // --- Tests ---

    #[test]
    fn test_end_to_end_single_face() {
        let sink = DetectionSink::new();
        let detector = ScriptedDetector::new(
            sink.clone(),
            vec![vec![detection(100.0, 100.0, 200.0, 220.0)]],
        );
        let mut uc = use_case_with(
            Box::new(detector),
            sink,
            Box::new(StubModel {
                scores: vec![0.2, 0.8],
            }),
            LabelTable::from_lines(["A", "B"]),
        );

        let result = uc.process_frame(raw_frame(640, 480), 1.0).unwrap();

        assert_eq!(result.detections.len(), 1);
        assert_eq!(result.classifications.len(), 1);
        assert_eq!(result.label_at(0), "B");
        assert!((result.classifications[0].as_ref().unwrap().confidence - 0.8).abs() < 1e-6);
        assert_eq!(result.image_width, 640);
        assert_eq!(result.image_height, 480);

        // The published crop is the 120px square for the 100x120 box.
        let crops = uc.last_crops().snapshot();
        assert_eq!(crops.len(), 1);
        assert_eq!(crops[0].width(), 120);
        assert_eq!(crops[0].height(), 120);
    }

    #[test]
    fn test_no_faces_yields_empty_result() {
        let sink = DetectionSink::new();
        let detector = ScriptedDetector::new(sink.clone(), vec![vec![]]);
        let mut uc = use_case_with(
            Box::new(detector),
            sink,
            Box::new(StubModel { scores: vec![1.0] }),
            LabelTable::from_lines(["A"]),
        );

        let result = uc.process_frame(raw_frame(64, 64), 1.0).unwrap();
        assert!(result.detections.is_empty());
        assert!(result.classifications.is_empty());
        assert!(uc.last_crops().snapshot().is_empty());
    }

    #[test]
    fn test_classification_failure_leaves_gap_at_that_index_only() {
        let sink = DetectionSink::new();
        let detector = ScriptedDetector::new(
            sink.clone(),
            vec![vec![
                detection(10.0, 10.0, 40.0, 40.0),
                detection(100.0, 10.0, 130.0, 40.0),
                detection(10.0, 100.0, 40.0, 130.0),
            ]],
        );
        let mut uc = use_case_with(
            Box::new(detector),
            sink,
            Box::new(FlakyModel {
                scores: vec![1.0],
                fail_on_calls: vec![1],
                calls: 0,
            }),
            LabelTable::from_lines(["A"]),
        );

        let result = uc.process_frame(raw_frame(200, 200), 1.0).unwrap();

        assert_eq!(result.detections.len(), 3);
        assert_eq!(result.classifications.len(), 3);
        assert!(result.classifications[0].is_some());
        assert!(result.classifications[1].is_none());
        assert!(result.classifications[2].is_some());
        assert_eq!(result.label_at(1), "Unknown");
        assert!(result.classified_count() <= result.detections.len());
    }

    #[test]
    fn test_uncroppable_detection_leaves_gap_but_publishes_rest() {
        let sink = DetectionSink::new();
        // Second box is taller than the whole frame: its square cannot fit.
        let detector = ScriptedDetector::new(
            sink.clone(),
            vec![vec![
                detection(10.0, 10.0, 40.0, 40.0),
                detection(0.0, 0.0, 300.0, 100.0),
            ]],
        );
        let mut uc = use_case_with(
            Box::new(detector),
            sink,
            Box::new(StubModel { scores: vec![1.0] }),
            LabelTable::from_lines(["A"]),
        );

        let result = uc.process_frame(raw_frame(300, 100), 1.0).unwrap();

        assert_eq!(result.detections.len(), 2);
        assert!(result.classifications[0].is_some());
        assert!(result.classifications[1].is_none());
        // Only the croppable face reaches the display snapshot.
        assert_eq!(uc.last_crops().snapshot().len(), 1);
    }

    #[test]
    fn test_convert_failure_aborts_frame() {
        let sink = DetectionSink::new();
        let detector = ScriptedDetector::new(sink.clone(), vec![vec![]]);
        let mut uc = use_case_with(
            Box::new(detector),
            sink,
            Box::new(StubModel { scores: vec![1.0] }),
            LabelTable::from_lines(["A"]),
        );

        let short = RawFrame::new(vec![0u8; 10], 64, 64, 0);
        assert!(matches!(
            uc.process_frame(short, 1.0),
            Err(ProcessFrameError::Convert(_))
        ));
    }

    #[test]
    fn test_detector_failure_aborts_frame() {
        let sink = DetectionSink::new();
        let detector = BrokenDetector { sink: sink.clone() };
        let mut uc = use_case_with(
            Box::new(detector),
            sink,
            Box::new(StubModel { scores: vec![1.0] }),
            LabelTable::from_lines(["A"]),
        );

        assert!(matches!(
            uc.process_frame(raw_frame(64, 64), 1.0),
            Err(ProcessFrameError::Detector(DetectorError::Service(_)))
        ));
        // The next frame is unaffected.
    }

    #[test]
    fn test_serialized_frames_keep_pairing_with_slow_detector() {
        let sink = DetectionSink::new();
        let detector = ScriptedDetector::new(
            sink.clone(),
            vec![
                vec![detection(10.0, 10.0, 40.0, 40.0)],
                vec![
                    detection(10.0, 10.0, 40.0, 40.0),
                    detection(100.0, 100.0, 140.0, 140.0),
                ],
            ],
        )
        .with_delay(Duration::from_millis(30));
        let mut uc = use_case_with(
            Box::new(detector),
            sink,
            Box::new(StubModel {
                scores: vec![0.3, 0.7],
            }),
            LabelTable::from_lines(["A", "B"]),
        );

        let first = uc.process_frame(raw_frame(200, 200), 1.0).unwrap();
        let second = uc.process_frame(raw_frame(200, 200), 1.0).unwrap();

        // Each result pairs classifications 1:1 with its own detections.
        assert_eq!(first.detections.len(), first.classifications.len());
        assert_eq!(second.detections.len(), second.classifications.len());
        assert_eq!(first.detections.len(), 1);
        assert_eq!(second.detections.len(), 2);
    }

    #[test]
    fn test_crops_published_before_classification_outcome_matters() {
        let sink = DetectionSink::new();
        let detector =
            ScriptedDetector::new(sink.clone(), vec![vec![detection(10.0, 10.0, 40.0, 40.0)]]);
        // Classifier always fails; the crop must still be published.
        let mut uc = use_case_with(
            Box::new(detector),
            sink,
            Box::new(FlakyModel {
                scores: vec![1.0],
                fail_on_calls: vec![0, 1, 2, 3],
                calls: 0,
            }),
            LabelTable::from_lines(["A"]),
        );

        let result = uc.process_frame(raw_frame(100, 100), 1.0).unwrap();
        assert!(result.classifications[0].is_none());
        assert_eq!(uc.last_crops().snapshot().len(), 1);
    }

    #[test]
    fn test_elapsed_is_recorded() {
        let sink = DetectionSink::new();
        let detector = ScriptedDetector::new(sink.clone(), vec![vec![]])
            .with_delay(Duration::from_millis(15));
        let mut uc = use_case_with(
            Box::new(detector),
            sink,
            Box::new(StubModel { scores: vec![1.0] }),
            LabelTable::from_lines(["A"]),
        );

        let result = uc.process_frame(raw_frame(64, 64), 1.0).unwrap();
        assert!(result.elapsed >= Duration::from_millis(10));
    }

    #[test]
    fn test_rotated_frame_reports_swapped_dimensions() {
        let sink = DetectionSink::new();
        let detector = ScriptedDetector::new(sink.clone(), vec![vec![]]);
        let mut uc = use_case_with(
            Box::new(detector),
            sink,
            Box::new(StubModel { scores: vec![1.0] }),
            LabelTable::from_lines(["A"]),
        );

        let raw = RawFrame::new(vec![0u8; 64 * 32 * BYTES_PER_PIXEL], 64, 32, 90);
        let result = uc.process_frame(raw, 1.0).unwrap();
        assert_eq!(result.image_width, 32);
        assert_eq!(result.image_height, 64);
    }
}
