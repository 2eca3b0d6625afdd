use std::time::{Duration, Instant};

use thiserror::Error;

use crate::detection::domain::face_detector::FaceDetector;
use crate::shared::constants::DEFAULT_DETECT_TIMEOUT_MS;
use crate::shared::detection::DetectionSet;
use crate::shared::frame::Frame;
use crate::shared::latest_slot::LatestSlot;

#[derive(Error, Debug)]
pub enum DetectorError {
    #[error("face detector reported: {0}")]
    Service(String),
    #[error("no detection result within {0:?}")]
    Timeout(Duration),
}

type Delivery = Result<(DetectionSet, u64), String>;

/// Delivery handle given to a [`FaceDetector`] implementation.
///
/// Results overwrite each other (latest wins), so a slow consumer only ever
/// sees the most recent delivery and the detector never blocks on it.
#[derive(Clone, Default)]
pub struct DetectionSink {
    slot: LatestSlot<Delivery>,
}

impl DetectionSink {
    pub fn new() -> Self {
        Self {
            slot: LatestSlot::new(),
        }
    }

    pub fn deliver(&self, detections: DetectionSet, timestamp_ms: u64) {
        if self.slot.put(Ok((detections, timestamp_ms))) {
            log::debug!("detection result overwrote an unconsumed predecessor");
        }
    }

    pub fn deliver_error(&self, message: impl Into<String>) {
        self.slot.put(Err(message.into()));
    }
}

/// Adapts the callback-driven detector service into a submit-and-await call.
///
/// Each submission carries a strictly increasing timestamp token. The await
/// resolves with the most recent result the service has delivered, which is
/// not necessarily the one for the frame submitted by this call — callers
/// must keep at most one frame in flight (the orchestrator serializes
/// invocations) for the pairing to hold.
///
/// A service error completes the pending await with
/// [`DetectorError::Service`], and the await is bounded by a timeout so a
/// silent detector cannot hang the pipeline.
pub struct DetectorBridge {
    detector: Box<dyn FaceDetector>,
    sink: DetectionSink,
    started: Instant,
    last_timestamp_ms: u64,
    timeout: Duration,
}

impl DetectorBridge {
    pub fn new(detector: Box<dyn FaceDetector>, sink: DetectionSink) -> Self {
        Self {
            detector,
            sink,
            started: Instant::now(),
            last_timestamp_ms: 0,
            timeout: Duration::from_millis(DEFAULT_DETECT_TIMEOUT_MS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Submit `frame` and block until a detection result is available.
    pub fn detect(&mut self, frame: &Frame) -> Result<DetectionSet, DetectorError> {
        let timestamp_ms = self.next_timestamp_ms();
        self.detector
            .submit(frame, timestamp_ms)
            .map_err(|e| DetectorError::Service(e.to_string()))?;

        match self.sink.slot.wait_timeout(self.timeout) {
            Some(Ok((detections, delivered_ms))) => {
                if delivered_ms != timestamp_ms {
                    log::debug!(
                        "detection result for timestamp {delivered_ms} consumed while awaiting {timestamp_ms}"
                    );
                }
                Ok(detections)
            }
            Some(Err(message)) => {
                log::error!("face detection failed: {message}");
                Err(DetectorError::Service(message))
            }
            None => Err(DetectorError::Timeout(self.timeout)),
        }
    }

    /// Wall-clock milliseconds since the bridge was created, nudged forward
    /// when needed so consecutive submissions never share a token.
    fn next_timestamp_ms(&mut self) -> u64 {
        let now = self.started.elapsed().as_millis() as u64;
        let timestamp = now.max(self.last_timestamp_ms + 1);
        self.last_timestamp_ms = timestamp;
        timestamp
    }
}
