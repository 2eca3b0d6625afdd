/// One face bounding box reported by the detector service.
///
/// Edges are in frame pixel coordinates of the image the detector ran on.
/// Downstream stages treat detections as read-only.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Detection {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub score: f32,
}

impl Detection {
    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }

    pub fn center(&self) -> (f32, f32) {
        (
            (self.left + self.right) / 2.0,
            (self.top + self.bottom) / 2.0,
        )
    }
}

/// The ordered detections for one frame plus the dimensions they were
/// computed against.
///
/// Index order is the pairing key between a detection and its later
/// classification and must be preserved end-to-end.
#[derive(Clone, Debug, PartialEq)]
pub struct DetectionSet {
    pub detections: Vec<Detection>,
    pub image_width: u32,
    pub image_height: u32,
}

impl DetectionSet {
    pub fn empty(image_width: u32, image_height: u32) -> Self {
        Self {
            detections: Vec::new(),
            image_width,
            image_height,
        }
    }

    pub fn len(&self) -> usize {
        self.detections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.detections.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Detection> {
        self.detections.iter()
    }
}
