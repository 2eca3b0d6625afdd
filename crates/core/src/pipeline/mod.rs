pub mod classify_faces_use_case;
pub mod last_crops;
pub mod pipeline_logger;
