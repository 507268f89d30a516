//! Geometric face normalization — two swappable strategies.
//!
//! Strategy A ([`KeypointRatioAligner`]) corrects in-plane rotation early
//! using the detector's 6 sparse keypoints: cheap and coarse. Strategy B
//! ([`LandmarkBoundingBoxCropper`]) tightens the crop using all 478 dense
//! landmarks but performs no rotation correction — it assumes the upstream
//! region is already roughly frontal. They can be chained (A then B) or used
//! alone; either way the embedding input ends up 112×112.
//!
//! The geometric constants (2.5 face ratio, 25% box inset) mirror the
//! reference preprocessing and are configuration defaults, to be validated
//! against the concrete embedding model's training pipeline.

use crate::embedder::EMBEDDER_INPUT_SIZE;
use crate::frame::Frame;
use crate::geometry::{crop, resize_bilinear, rotate_about_center, GeometryError};
use crate::landmarks::{LandmarkSet, LANDMARK_INPUT_SIZE};
use crate::types::{keypoint, Detection, Point, Rect};

/// Default multiplier from eye/mouth distances to face crop size.
pub const DEFAULT_FACE_RATIO: f32 = 2.5;
/// Default per-side inset fraction applied to the detection box.
pub const DEFAULT_BBOX_INSET: f32 = 0.25;

/// Minimum keypoints Strategy A needs: both eyes and both mouth corners.
const MIN_KEYPOINTS: usize = 5;

/// Signed angle of the eye line in degrees: `atan2(dy, dx)` where dx/dy are
/// right eye minus left eye. Horizontal eyes give 0; a right eye directly
/// BELOW the left (y grows downward) gives +90, directly above gives -90.
pub fn eye_angle_degrees(left_eye: Point, right_eye: Point) -> f32 {
    let dx = right_eye.x - left_eye.x;
    let dy = right_eye.y - left_eye.y;
    dy.atan2(dx).to_degrees()
}

/// Keypoint-driven crop rectangle: centered between the eye and mouth
/// midpoints, sized by `face_ratio` times the eye span / eye-to-mouth drop,
/// clamped to the frame.
pub fn ratio_crop_rect(
    detection: &Detection,
    frame_width: u32,
    frame_height: u32,
    face_ratio: f32,
) -> Result<Rect, GeometryError> {
    let kp = &detection.keypoints;
    if kp.len() < MIN_KEYPOINTS {
        return Err(GeometryError::InsufficientKeypoints {
            expected: MIN_KEYPOINTS,
            actual: kp.len(),
        });
    }

    let left_eye = kp[keypoint::LEFT_EYE];
    let right_eye = kp[keypoint::RIGHT_EYE];
    let eye_center = Point::midpoint(left_eye, right_eye);
    let mouth_center = Point::midpoint(kp[keypoint::MOUTH_LEFT], kp[keypoint::MOUTH_RIGHT]);
    let center = Point::midpoint(eye_center, mouth_center);

    let face_width = (right_eye.x - left_eye.x) * face_ratio;
    let face_height = (mouth_center.y - eye_center.y) * face_ratio;

    let rect = Rect::new(
        center.x - face_width / 2.0,
        center.y - face_height / 2.0,
        center.x + face_width / 2.0,
        center.y + face_height / 2.0,
    )
    .clamped(frame_width, frame_height);

    if rect.width() as i64 <= 0 || rect.height() as i64 <= 0 {
        return Err(GeometryError::InvalidCropRegion {
            width: rect.width() as i64,
            height: rect.height() as i64,
        });
    }

    Ok(rect)
}

/// Strategy A: keypoint-ratio crop plus eye-angle rotation alignment.
#[derive(Debug, Clone)]
pub struct KeypointRatioAligner {
    pub face_ratio: f32,
    pub bbox_inset: f32,
}

impl Default for KeypointRatioAligner {
    fn default() -> Self {
        Self {
            face_ratio: DEFAULT_FACE_RATIO,
            bbox_inset: DEFAULT_BBOX_INSET,
        }
    }
}

impl KeypointRatioAligner {
    /// Produce an upright 256×256 face region from the original frame.
    ///
    /// Degenerate keypoint geometry is rejected via the ratio crop rectangle
    /// before any rotation work runs. The output crop itself comes from the
    /// detection box inset by `bbox_inset` per side, taken on the frame
    /// rotated by the negative eye-line angle about its center.
    pub fn align(&self, frame: &Frame, detection: &Detection) -> Result<Frame, GeometryError> {
        ratio_crop_rect(detection, frame.width(), frame.height(), self.face_ratio)?;

        let angle = eye_angle_degrees(
            detection.keypoints[keypoint::LEFT_EYE],
            detection.keypoints[keypoint::RIGHT_EYE],
        );
        tracing::debug!(angle, "aligning face by eye-line rotation");

        let upright = rotate_about_center(frame, -angle);
        let region = crop(&upright, detection.bounds.inset(self.bbox_inset))?;
        Ok(resize_bilinear(&region, LANDMARK_INPUT_SIZE, LANDMARK_INPUT_SIZE))
    }
}

/// Strategy B: tight crop around the dense landmark bounding box.
#[derive(Debug, Clone, Default)]
pub struct LandmarkBoundingBoxCropper;

impl LandmarkBoundingBoxCropper {
    /// Crop the landmark bounding box out of the region the landmarks were
    /// computed on (coordinates share that region's pixel space) and resize
    /// to 112×112. The box is widened to at least 1×1, so this never fails
    /// on size alone.
    pub fn crop(&self, region: &Frame, landmarks: &LandmarkSet) -> Result<Frame, GeometryError> {
        let mut rect = landmarks.bounding_rect(region.width(), region.height());

        if rect.width() < 1.0 {
            rect.right = (rect.left + 1.0).min(region.width() as f32);
            rect.left = rect.right - 1.0;
        }
        if rect.height() < 1.0 {
            rect.bottom = (rect.top + 1.0).min(region.height() as f32);
            rect.top = rect.bottom - 1.0;
        }

        let face = crop(region, rect)?;
        Ok(resize_bilinear(&face, EMBEDDER_INPUT_SIZE, EMBEDDER_INPUT_SIZE))
    }
}
