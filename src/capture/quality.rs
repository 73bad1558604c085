use crate::capture::{CaptureConfig, QualityMethod};
use crate::mot::{Detection, ImageCrop};

/// Scores one observation, or disqualifies it. `None` means a hard gate
/// failed: the observation may still drive tracking, but it never becomes
/// a best-shot and never triggers a capture.
///
/// Gates, in order: box-to-frame area ratio inside the size window, pose
/// angles inside their limits (when pose data is present), then the
/// selected method's own minimum.
pub fn qualify(
    config: &CaptureConfig,
    detection: &Detection,
    frame_width: f32,
    frame_height: f32,
) -> Option<f32> {
    let frame_area = frame_width * frame_height;
    if frame_area <= 0.0 {
        return None;
    }
    let ratio = detection.bbox.area() / frame_area;
    if ratio < config.thr_size_min || ratio > config.thr_size_max {
        return None;
    }
    if let Some(pose) = &detection.pose {
        if pose.yaw.abs() > config.thr_yaw
            || pose.pitch.abs() > config.thr_pitch
            || pose.roll.abs() > config.thr_roll
        {
            return None;
        }
    }
    match config.method {
        QualityMethod::AreaRatio => {
            let span = config.thr_size_max - config.thr_size_min;
            if span <= 0.0 {
                return Some(1.0);
            }
            Some(((ratio - config.thr_size_min) / span).clamp(0.0, 1.0))
        }
        QualityMethod::EyesDistance => {
            let eye_distance = detection.eye_distance()?;
            if eye_distance < config.thr_eye_distance {
                return None;
            }
            // 64px between the eyes is plenty for recognition; saturate there
            Some((eye_distance / 64.0).clamp(0.0, 1.0))
        }
        QualityMethod::Laplacian => {
            let crop = detection.crop.as_ref()?;
            let variance = laplacian_variance(crop)?;
            if variance < config.thr_laplacian {
                return None;
            }
            Some(variance / (variance + 500.0))
        }
    }
}

/// Variance of the 4-neighbor Laplacian over the crop interior. `None`
/// when the crop is too small for a 3x3 neighborhood.
fn laplacian_variance(crop: &ImageCrop) -> Option<f32> {
    let (w, h) = (crop.width(), crop.height());
    if w < 3 || h < 3 {
        return None;
    }
    let count = ((w - 2) * (h - 2)) as f32;
    let mut sum = 0.0f32;
    let mut sum_sq = 0.0f32;
    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let center = 4.0 * crop.pixel(x, y) as f32;
            let neighbors = crop.pixel(x - 1, y) as f32
                + crop.pixel(x + 1, y) as f32
                + crop.pixel(x, y - 1) as f32
                + crop.pixel(x, y + 1) as f32;
            let response = center - neighbors;
            sum += response;
            sum_sq += response * response;
        }
    }
    let mean = sum / count;
    Some(sum_sq / count - mean * mean)
}
