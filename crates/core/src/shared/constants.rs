pub const FACE_MODEL_NAME: &str = "blazeface_short_range.onnx";
pub const FACE_MODEL_URL: &str =
    "https://github.com/facelens/facelens/releases/download/v0.1.0/blazeface_short_range.onnx";

/// Default minimum face detection confidence.
pub const DEFAULT_MIN_CONFIDENCE: f32 = 0.5;

/// Default upper bound on one detector await, in milliseconds.
pub const DEFAULT_DETECT_TIMEOUT_MS: u64 = 2000;

/// Label shown for a face whose classification is missing or out of range.
pub const UNKNOWN_LABEL: &str = "Unknown";
