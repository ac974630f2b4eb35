//! Landmark geometry and the fixed face-mesh index contract
//!
//! Indices follow the 468-point face mesh. Order and semantics are fixed per
//! tracker version, so features address points by constant index.

use serde::{Deserialize, Serialize};

use crate::error::DetectionError;

/// Number of points in one face mesh
pub const FACE_MESH_POINTS: usize = 468;

/// Mouth corners and lip centres
pub mod mouth {
    pub const LEFT_CORNER: usize = 61;
    pub const RIGHT_CORNER: usize = 291;
    pub const UPPER_LIP: usize = 13;
    pub const LOWER_LIP: usize = 14;
}

/// Eyebrow and eye index sets
pub mod brow {
    pub const LEFT_EYEBROW: [usize; 5] = [70, 63, 105, 66, 107];
    pub const RIGHT_EYEBROW: [usize; 5] = [296, 334, 293, 300, 276];

    // Full eye contours; the first six points are the ones compared
    // against the brow.
    pub const LEFT_EYE: [usize; 16] = [
        33, 7, 163, 144, 145, 153, 154, 155, 133, 173, 157, 158, 159, 160, 161, 246,
    ];
    pub const RIGHT_EYE: [usize; 16] = [
        362, 382, 381, 380, 374, 373, 390, 249, 263, 466, 388, 387, 386, 385, 384, 398,
    ];

    pub const EYE_POINTS_USED: usize = 6;
}

/// Six-point eye sets for the eye aspect ratio: corner, top, top, corner, bottom, bottom
pub mod ear {
    pub const LEFT_EYE: [usize; 6] = [33, 160, 158, 133, 153, 144];
    pub const RIGHT_EYE: [usize; 6] = [362, 385, 387, 263, 373, 380];
}

/// A point in pixel space
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Point2D {
    pub x: f32,
    pub y: f32,
}

impl Point2D {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// One normalized landmark, `x`/`y` in `[0, 1]` relative to the image
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawLandmark", into = "[f32; 3]")]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Scale to pixel space, keeping fractional pixels
    pub fn to_pixel(&self, size: ImageSize) -> Point2D {
        Point2D::new(self.x * size.width as f32, self.y * size.height as f32)
    }

    /// Scale to pixel space, truncated to whole pixels
    pub fn to_pixel_truncated(&self, size: ImageSize) -> Point2D {
        let p = self.to_pixel(size);
        Point2D::new(p.x.trunc(), p.y.trunc())
    }
}

// The provider may omit depth.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawLandmark {
    Xyz([f32; 3]),
    Xy([f32; 2]),
    Named {
        x: f32,
        y: f32,
        #[serde(default)]
        z: f32,
    },
}

impl From<RawLandmark> for Landmark {
    fn from(raw: RawLandmark) -> Self {
        match raw {
            RawLandmark::Xyz([x, y, z]) => Landmark::new(x, y, z),
            RawLandmark::Xy([x, y]) => Landmark::new(x, y, 0.0),
            RawLandmark::Named { x, y, z } => Landmark::new(x, y, z),
        }
    }
}

impl From<Landmark> for [f32; 3] {
    fn from(l: Landmark) -> Self {
        [l.x, l.y, l.z]
    }
}

/// Image dimensions in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

impl ImageSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl Default for ImageSize {
    fn default() -> Self {
        Self::new(640, 480)
    }
}

/// All landmarks of one detected face
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FaceLandmarks {
    pub points: Vec<Landmark>,
}

impl FaceLandmarks {
    pub fn new(points: Vec<Landmark>) -> Self {
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Landmark at a fixed mesh index
    pub fn get(&self, index: usize) -> Result<&Landmark, DetectionError> {
        self.points.get(index).ok_or(DetectionError::MalformedLandmarks {
            got: self.points.len(),
            index,
        })
    }

    /// Pixel-space bounding box `(min, max)` of every point
    pub fn bounding_box(&self, size: ImageSize) -> Option<(Point2D, Point2D)> {
        let mut iter = self.points.iter().map(|l| l.to_pixel(size));
        let first = iter.next()?;
        Some(iter.fold((first, first), |(lo, hi), p| {
            (
                Point2D::new(lo.x.min(p.x), lo.y.min(p.y)),
                Point2D::new(hi.x.max(p.x), hi.y.max(p.y)),
            )
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_landmark_accepts_two_or_three_components() {
        let faces: Vec<Landmark> =
            serde_json::from_str(r#"[[0.1, 0.2, 0.3], [0.4, 0.5], {"x": 0.6, "y": 0.7}]"#).unwrap();
        assert_eq!(faces[0], Landmark::new(0.1, 0.2, 0.3));
        assert_eq!(faces[1], Landmark::new(0.4, 0.5, 0.0));
        assert_eq!(faces[2], Landmark::new(0.6, 0.7, 0.0));
    }

    #[test]
    fn test_pixel_conversion() {
        let size = ImageSize::new(640, 480);
        let l = Landmark::new(0.5, 0.25, 0.0);
        assert_eq!(l.to_pixel(size), Point2D::new(320.0, 120.0));

        let l = Landmark::new(0.1001, 0.1001, 0.0);
        assert_eq!(l.to_pixel_truncated(size), Point2D::new(64.0, 48.0));
    }

    #[test]
    fn test_missing_index_is_an_error() {
        let face = FaceLandmarks::new(vec![Landmark::default(); 10]);
        assert!(face.get(9).is_ok());
        match face.get(61) {
            Err(DetectionError::MalformedLandmarks { got, index }) => {
                assert_eq!(got, 10);
                assert_eq!(index, 61);
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_bounding_box() {
        let face = FaceLandmarks::new(vec![
            Landmark::new(0.25, 0.5, 0.0),
            Landmark::new(0.75, 0.25, 0.0),
        ]);
        let (lo, hi) = face.bounding_box(ImageSize::new(100, 100)).unwrap();
        assert_eq!(lo, Point2D::new(25.0, 25.0));
        assert_eq!(hi, Point2D::new(75.0, 50.0));
        assert!(FaceLandmarks::default()
            .bounding_box(ImageSize::default())
            .is_none());
    }
}
