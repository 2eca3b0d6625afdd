pub mod detector_bridge;
pub mod face_cropper;
pub mod face_detector;
