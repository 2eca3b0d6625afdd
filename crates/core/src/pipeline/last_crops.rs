use std::sync::{Arc, Mutex};

use crate::shared::frame::Frame;

/// Shared snapshot of the face crops produced by the most recent frame.
///
/// Written by the pipeline via a single wholesale swap and read at any time
/// by a display collaborator, so readers always observe one complete,
/// consistent crop set. Handles are cheap clones over the same cell.
#[derive(Clone, Default)]
pub struct LastCrops {
    current: Arc<Mutex<Arc<Vec<Frame>>>>,
}

impl LastCrops {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole snapshot with the crops of a new frame.
    pub fn publish(&self, crops: Vec<Frame>) {
        *self.current.lock().unwrap() = Arc::new(crops);
    }

    /// The current snapshot. Holding it keeps that generation alive even
    /// after later publishes.
    pub fn snapshot(&self) -> Arc<Vec<Frame>> {
        self.current.lock().unwrap().clone()
    }
}
