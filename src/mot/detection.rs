use crate::utils::{euclidean_distance, Point, Rect};

/// Head pose angles reported by the detector, in degrees.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pose {
    pub yaw: f32,
    pub pitch: f32,
    pub roll: f32,
}

impl Pose {
    pub fn new(yaw: f32, pitch: f32, roll: f32) -> Self {
        Pose { yaw, pitch, roll }
    }
}

/// Grayscale pixel crop attached to a detection by the external image
/// pipeline. Row-major, one byte per pixel.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageCrop {
    width: usize,
    height: usize,
    data: Vec<u8>,
}

impl ImageCrop {
    /// `data` must hold exactly `width * height` bytes; anything else is
    /// stored as an empty crop (which later disqualifies sharpness checks).
    pub fn new(width: usize, height: usize, data: Vec<u8>) -> Self {
        if data.len() != width * height {
            return ImageCrop {
                width: 0,
                height: 0,
                data: Vec::new(),
            };
        }
        ImageCrop {
            width,
            height,
            data,
        }
    }
    pub fn width(&self) -> usize {
        self.width
    }
    pub fn height(&self) -> usize {
        self.height
    }
    pub fn pixel(&self, x: usize, y: usize) -> u8 {
        self.data[y * self.width + x]
    }
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// One per-frame observation from the external detector. Ephemeral: the
/// registry takes ownership of matched detections, everything else drops
/// at the end of the frame call.
#[derive(Debug, Clone, Default)]
pub struct Detection {
    pub bbox: Rect,
    pub score: f32,
    pub feature: Option<Vec<f32>>,
    pub pose: Option<Pose>,
    pub landmarks: Option<Vec<Point>>,
    pub crop: Option<ImageCrop>,
}

impl Detection {
    pub fn new(bbox: Rect, score: f32) -> Self {
        Detection {
            bbox,
            score,
            feature: None,
            pose: None,
            landmarks: None,
            crop: None,
        }
    }
    pub fn with_feature(mut self, feature: Vec<f32>) -> Self {
        self.feature = Some(feature);
        self
    }
    pub fn with_pose(mut self, pose: Pose) -> Self {
        self.pose = Some(pose);
        self
    }
    pub fn with_landmarks(mut self, landmarks: Vec<Point>) -> Self {
        self.landmarks = Some(landmarks);
        self
    }
    pub fn with_crop(mut self, crop: ImageCrop) -> Self {
        self.crop = Some(crop);
        self
    }

    /// Rejects non-finite coordinates/scores and empty boxes before they
    /// can poison the cost matrix.
    pub fn is_valid(&self) -> bool {
        self.bbox.is_finite()
            && self.bbox.width > 0.0
            && self.bbox.height > 0.0
            && self.score.is_finite()
    }

    /// Distance between the first two landmarks (the eye pair for the
    /// 5-point face layout). `None` without landmark data.
    pub fn eye_distance(&self) -> Option<f32> {
        let landmarks = self.landmarks.as_ref()?;
        if landmarks.len() < 2 {
            return None;
        }
        Some(euclidean_distance(&landmarks[0], &landmarks[1]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validity() {
        assert!(Detection::new(Rect::new(0.0, 0.0, 10.0, 10.0), 0.9).is_valid());
        assert!(!Detection::new(Rect::new(f32::NAN, 0.0, 10.0, 10.0), 0.9).is_valid());
        assert!(!Detection::new(Rect::new(0.0, 0.0, 0.0, 10.0), 0.9).is_valid());
        assert!(!Detection::new(Rect::new(0.0, 0.0, 10.0, 10.0), f32::INFINITY).is_valid());
    }

    #[test]
    fn test_eye_distance() {
        let det = Detection::new(Rect::new(0.0, 0.0, 10.0, 10.0), 0.9)
            .with_landmarks(vec![Point::new(0.0, 0.0), Point::new(3.0, 4.0)]);
        assert_eq!(det.eye_distance(), Some(5.0));
        assert_eq!(Detection::new(Rect::new(0.0, 0.0, 1.0, 1.0), 0.5).eye_distance(), None);
    }

    #[test]
    fn test_crop_size_mismatch_is_empty() {
        let crop = ImageCrop::new(4, 4, vec![0; 3]);
        assert!(crop.is_empty());
        let crop = ImageCrop::new(2, 2, vec![1, 2, 3, 4]);
        assert_eq!(crop.pixel(1, 1), 4);
    }
}
