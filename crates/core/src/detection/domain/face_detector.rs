use crate::shared::frame::Frame;

/// Domain interface for the asynchronous face detector service.
///
/// The service accepts a single in-flight frame at a time. `submit` returns
/// as soon as the frame is handed over; the detections (or an error) arrive
/// later through the [`DetectionSink`](crate::detection::domain::detector_bridge::DetectionSink)
/// the service was constructed with, possibly from another thread.
pub trait FaceDetector: Send {
    fn submit(&mut self, frame: &Frame, timestamp_ms: u64) -> Result<(), Box<dyn std::error::Error>>;
}
