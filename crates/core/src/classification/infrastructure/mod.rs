pub mod ort_score_model;
