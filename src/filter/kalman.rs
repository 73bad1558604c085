use nalgebra::{SMatrix, SVector};

use crate::utils::Rect;

type Vec8 = SVector<f32, 8>;
type Mat8 = SMatrix<f32, 8, 8>;
type Vec4 = SVector<f32, 4>;
type Mat4 = SMatrix<f32, 4, 4>;
type Mat4x8 = SMatrix<f32, 4, 8>;

// Noise weights relative to box height, so uncertainty adapts to the
// object's scale on screen.
const STD_WEIGHT_POSITION: f32 = 1.0 / 20.0;
const STD_WEIGHT_VELOCITY: f32 = 1.0 / 160.0;

/// Constant-velocity Kalman filter over a bounding box.
///
/// State vector is (cx, cy, a, h, vcx, vcy, va, vh): box center, aspect
/// ratio w/h, height and their velocities. One `predict()` per frame
/// advances the state by dt = 1; `update()` folds in an observed box.
#[derive(Debug, Clone)]
pub struct BoxKalman {
    mean: Vec8,
    covariance: Mat8,
}

impl BoxKalman {
    /// Seeds the filter from the first observed box with zero velocity.
    pub fn new(bbox: &Rect) -> Self {
        let measurement = measurement_of(bbox);
        let mut mean = Vec8::zeros();
        for i in 0..4 {
            mean[i] = measurement[i];
        }

        let h = measurement[3];
        let std = [
            2.0 * STD_WEIGHT_POSITION * h,
            2.0 * STD_WEIGHT_POSITION * h,
            1e-2,
            2.0 * STD_WEIGHT_POSITION * h,
            10.0 * STD_WEIGHT_VELOCITY * h,
            10.0 * STD_WEIGHT_VELOCITY * h,
            1e-5,
            10.0 * STD_WEIGHT_VELOCITY * h,
        ];
        let mut covariance = Mat8::zeros();
        for i in 0..8 {
            covariance[(i, i)] = std[i] * std[i];
        }

        BoxKalman { mean, covariance }
    }

    /// Advances the state one frame and inflates covariance by process
    /// noise. Returns the predicted box.
    pub fn predict(&mut self) -> Rect {
        let motion = motion_matrix();

        let h = self.mean[3];
        let std = [
            STD_WEIGHT_POSITION * h,
            STD_WEIGHT_POSITION * h,
            1e-2,
            STD_WEIGHT_POSITION * h,
            STD_WEIGHT_VELOCITY * h,
            STD_WEIGHT_VELOCITY * h,
            1e-5,
            STD_WEIGHT_VELOCITY * h,
        ];
        let mut process_noise = Mat8::zeros();
        for i in 0..8 {
            process_noise[(i, i)] = std[i] * std[i];
        }

        self.mean = motion * self.mean;
        self.covariance = motion * self.covariance * motion.transpose() + process_noise;

        self.bbox()
    }

    /// Kalman correction step for an observed box. A degenerate innovation
    /// covariance leaves the state unchanged.
    pub fn update(&mut self, bbox: &Rect) {
        let observation = observation_matrix();
        let measurement = measurement_of(bbox);

        let h = self.mean[3];
        let std = [
            STD_WEIGHT_POSITION * h,
            STD_WEIGHT_POSITION * h,
            1e-1,
            STD_WEIGHT_POSITION * h,
        ];
        let mut measurement_noise = Mat4::zeros();
        for i in 0..4 {
            measurement_noise[(i, i)] = std[i] * std[i];
        }

        let projected_mean: Vec4 = observation * self.mean;
        let projected_cov: Mat4 =
            observation * self.covariance * observation.transpose() + measurement_noise;

        let chol = match projected_cov.cholesky() {
            Some(chol) => chol,
            None => return,
        };
        // K = P Hᵀ S⁻¹, computed as (S⁻¹ (H Pᵀ))ᵀ
        let gain = chol
            .solve(&(observation * self.covariance.transpose()))
            .transpose();

        let innovation = measurement - projected_mean;
        self.mean += gain * innovation;
        self.covariance -= gain * projected_cov * gain.transpose();
    }

    /// Current state as a bounding box.
    pub fn bbox(&self) -> Rect {
        let cx = self.mean[0];
        let cy = self.mean[1];
        let aspect = self.mean[2];
        let height = self.mean[3];
        let width = aspect * height;
        Rect::new(cx - 0.5 * width, cy - 0.5 * height, width, height)
    }

    /// Mean position uncertainty, usable for gating diagnostics.
    pub fn position_uncertainty(&self) -> f32 {
        (self.covariance[(0, 0)] + self.covariance[(1, 1)]).sqrt()
    }
}

fn measurement_of(bbox: &Rect) -> Vec4 {
    let center = bbox.center();
    let aspect = if bbox.height > 0.0 {
        bbox.width / bbox.height
    } else {
        1.0
    };
    Vec4::new(center.x, center.y, aspect, bbox.height)
}

fn motion_matrix() -> Mat8 {
    let mut motion = Mat8::identity();
    for i in 0..4 {
        motion[(i, i + 4)] = 1.0;
    }
    motion
}

fn observation_matrix() -> Mat4x8 {
    let mut observation = Mat4x8::zeros();
    for i in 0..4 {
        observation[(i, i)] = 1.0;
    }
    observation
}

#[cfg(test)]
mod tests {
    use super::*;
    use itertools::izip;

    fn close(a: f32, b: f32, tol: f32) -> bool {
        (a - b).abs() < tol
    }

    #[test]
    fn test_seeded_state_matches_first_box() {
        let bbox = Rect::new(100.0, 50.0, 40.0, 80.0);
        let filter = BoxKalman::new(&bbox);
        let out = filter.bbox();
        assert!(close(out.x, bbox.x, 1e-3));
        assert!(close(out.y, bbox.y, 1e-3));
        assert!(close(out.width, bbox.width, 1e-3));
        assert!(close(out.height, bbox.height, 1e-3));
    }

    #[test]
    fn test_zero_velocity_prediction_is_stationary() {
        let bbox = Rect::new(100.0, 50.0, 40.0, 80.0);
        let mut filter = BoxKalman::new(&bbox);
        let predicted = filter.predict();
        assert!(close(predicted.x, bbox.x, 1e-3));
        assert!(close(predicted.y, bbox.y, 1e-3));
    }

    #[test]
    fn test_follows_constant_velocity_motion() {
        // box moving 5 px/frame to the right
        let mut filter = BoxKalman::new(&Rect::new(0.0, 0.0, 40.0, 80.0));
        for frame in 1..=20 {
            filter.predict();
            filter.update(&Rect::new(5.0 * frame as f32, 0.0, 40.0, 80.0));
        }
        let predicted = filter.predict();
        // after the 20th update the next prediction should land near x = 105
        assert!(
            close(predicted.x, 105.0, 3.0),
            "predicted x = {}",
            predicted.x
        );
    }

    #[test]
    fn test_settles_onto_diagonal_path() {
        // 3 px/frame right, 2 px/frame down
        let mut filter = BoxKalman::new(&Rect::new(0.0, 0.0, 40.0, 80.0));
        let mut xs = Vec::new();
        let mut ys = Vec::new();
        for frame in 1..=15 {
            filter.predict();
            filter.update(&Rect::new(3.0 * frame as f32, 2.0 * frame as f32, 40.0, 80.0));
            let out = filter.bbox();
            xs.push(out.x);
            ys.push(out.y);
        }
        let expected_xs: Vec<f32> = (11..=15).map(|f| 3.0 * f as f32).collect();
        let expected_ys: Vec<f32> = (11..=15).map(|f| 2.0 * f as f32).collect();
        for (x, ex, y, ey) in izip!(&xs[10..], &expected_xs, &ys[10..], &expected_ys) {
            assert!(close(*x, *ex, 2.0), "x = {}, expected {}", x, ex);
            assert!(close(*y, *ey, 2.0), "y = {}, expected {}", y, ey);
        }
    }

    #[test]
    fn test_covariance_grows_while_coasting() {
        let mut filter = BoxKalman::new(&Rect::new(0.0, 0.0, 40.0, 80.0));
        filter.predict();
        let before = filter.position_uncertainty();
        for _ in 0..10 {
            filter.predict();
        }
        let after = filter.position_uncertainty();
        assert!(after > before);
    }

    #[test]
    fn test_update_shrinks_uncertainty() {
        let bbox = Rect::new(0.0, 0.0, 40.0, 80.0);
        let mut filter = BoxKalman::new(&bbox);
        filter.predict();
        let before = filter.position_uncertainty();
        filter.update(&bbox);
        let after = filter.position_uncertainty();
        assert!(after < before);
    }
}
