//! Geometric features computed from one face's landmarks
//!
//! All functions are pure in `(landmarks, image_size)`. Mouth and eye points
//! are snapped to whole pixels before measuring; brow/eye heights are means
//! over normalized y and scaled afterwards.

use serde::{Deserialize, Serialize};

use crate::error::DetectionError;
use crate::facs::landmarks::{brow, ear, mouth, FaceLandmarks, ImageSize, Point2D};

/// Per-face, per-frame feature set
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    /// Lip-centre height above the corners, over mouth width. Positive = smile.
    pub mouth_curvature: f32,
    pub mouth_width: f32,
    pub mouth_height: f32,
    /// Mean eye-to-brow vertical gap in pixels. Small or negative = furrowed.
    pub eyebrow_distance: f32,
    pub eye_aspect_ratio: f32,
}

impl FeatureVector {
    /// Compute every feature for one face
    pub fn extract(face: &FaceLandmarks, size: ImageSize) -> Result<Self, DetectionError> {
        let (mouth_curvature, mouth_width, mouth_height) = mouth_curvature(face, size)?;
        Ok(FeatureVector {
            mouth_curvature,
            mouth_width,
            mouth_height,
            eyebrow_distance: eyebrow_position(face, size)?,
            eye_aspect_ratio: eye_aspect_ratio(face, size)?,
        })
    }
}

/// Euclidean distance in pixel space
pub fn distance(p1: Point2D, p2: Point2D) -> f32 {
    let dx = p1.x - p2.x;
    let dy = p1.y - p2.y;
    (dx * dx + dy * dy).sqrt()
}

/// Returns `(curvature, width, height)` of the mouth
pub fn mouth_curvature(
    face: &FaceLandmarks,
    size: ImageSize,
) -> Result<(f32, f32, f32), DetectionError> {
    let left = face.get(mouth::LEFT_CORNER)?.to_pixel_truncated(size);
    let right = face.get(mouth::RIGHT_CORNER)?.to_pixel_truncated(size);
    let top = face.get(mouth::UPPER_LIP)?.to_pixel_truncated(size);
    let bottom = face.get(mouth::LOWER_LIP)?.to_pixel_truncated(size);

    let width = distance(left, right);
    let height = distance(top, bottom);

    // Image y grows downward: corners above the lip centre give a positive value.
    let center_y = (top.y + bottom.y) / 2.0;
    let corner_y = (left.y + right.y) / 2.0;
    let curvature = if width > 0.0 {
        (center_y - corner_y) / width
    } else {
        0.0
    };

    Ok((curvature, width, height))
}

/// Mean `(eye_y - eyebrow_y)` over both sides, in pixels
pub fn eyebrow_position(face: &FaceLandmarks, size: ImageSize) -> Result<f32, DetectionError> {
    let eye_used = brow::EYE_POINTS_USED;
    let left_brow = mean_y(face, &brow::LEFT_EYEBROW)? * size.height as f32;
    let right_brow = mean_y(face, &brow::RIGHT_EYEBROW)? * size.height as f32;
    let left_eye = mean_y(face, &brow::LEFT_EYE[..eye_used])? * size.height as f32;
    let right_eye = mean_y(face, &brow::RIGHT_EYE[..eye_used])? * size.height as f32;

    Ok(((left_eye - left_brow) + (right_eye - right_brow)) / 2.0)
}

/// Mean eye aspect ratio of both eyes
pub fn eye_aspect_ratio(face: &FaceLandmarks, size: ImageSize) -> Result<f32, DetectionError> {
    let left = single_eye_ratio(face, &ear::LEFT_EYE, size)?;
    let right = single_eye_ratio(face, &ear::RIGHT_EYE, size)?;
    Ok((left + right) / 2.0)
}

fn single_eye_ratio(
    face: &FaceLandmarks,
    indices: &[usize; 6],
    size: ImageSize,
) -> Result<f32, DetectionError> {
    let mut p = [Point2D::default(); 6];
    for (slot, &i) in p.iter_mut().zip(indices.iter()) {
        *slot = face.get(i)?.to_pixel_truncated(size);
    }

    let v1 = distance(p[1], p[5]);
    let v2 = distance(p[2], p[4]);
    let h = distance(p[0], p[3]);

    if h > 0.0 {
        Ok((v1 + v2) / (2.0 * h))
    } else {
        Ok(0.0)
    }
}

fn mean_y(face: &FaceLandmarks, indices: &[usize]) -> Result<f32, DetectionError> {
    let mut sum = 0.0;
    for &i in indices {
        sum += face.get(i)?.y;
    }
    Ok(sum / indices.len() as f32)
}
