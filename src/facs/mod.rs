//! Facial analysis: landmarks to emotion label
//!
//! # Components
//! - `landmarks.rs`: Point types and the fixed face-mesh index sets
//! - `features.rs`: Mouth curvature, brow distance, eye aspect ratio
//! - `classifier.rs`: Fixed-weight threshold rules
//! - `tracker.rs`: Per-frame multi-face selection, `LandmarkProvider` seam
//! - `helper.rs`: Landmark model as a JSON-lines subprocess

pub mod classifier;
pub mod features;
pub mod helper;
pub mod landmarks;
pub mod tracker;

pub use classifier::{DetectionResult, EmotionClassifier, EmotionLabel};
pub use features::FeatureVector;
pub use landmarks::{FaceLandmarks, ImageSize, Landmark, Point2D};
pub use tracker::{FaceTracker, FrameDetection, LandmarkProvider};
