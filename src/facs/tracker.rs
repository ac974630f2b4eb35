//! Multi-face tracking: classify every face in a frame, keep the most confident

use image::DynamicImage;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::DetectionError;
use crate::facs::classifier::{DetectionResult, EmotionClassifier, EmotionLabel};
use crate::facs::features::FeatureVector;
use crate::facs::landmarks::{FaceLandmarks, ImageSize, Point2D};

/// External landmark model: image in, zero or more faces out
///
/// An empty result means no face was found and is not an error.
pub trait LandmarkProvider {
    fn name(&self) -> String;
    fn detect(&mut self, image: &DynamicImage) -> Result<Vec<FaceLandmarks>, DetectionError>;
}

/// One classified face
#[derive(Debug, Clone, Serialize)]
pub struct FaceDetection {
    pub landmarks: FaceLandmarks,
    pub result: DetectionResult,
    /// Pixel-space box around every landmark
    pub bounds: Option<(Point2D, Point2D)>,
}

/// Frame-level result: the most confident face plus every face seen
#[derive(Debug, Clone, Default, Serialize)]
pub struct FrameDetection {
    pub best_emotion: Option<EmotionLabel>,
    pub best_confidence: f32,
    pub faces: Vec<FaceDetection>,
}

impl FrameDetection {
    pub fn empty() -> Self {
        Self::default()
    }

    /// A frame carrying a single externally supplied result with no landmarks
    pub fn injected(emotion: EmotionLabel, confidence: f32) -> Self {
        let result = DetectionResult::new(emotion, confidence);
        Self {
            best_emotion: result.emotion,
            best_confidence: result.confidence,
            faces: Vec::new(),
        }
    }

    pub fn best(&self) -> DetectionResult {
        DetectionResult {
            emotion: self.best_emotion,
            confidence: self.best_confidence,
        }
    }

    /// Bounding boxes of every face, in detection order
    pub fn face_boxes(&self) -> impl Iterator<Item = (Point2D, Point2D)> + '_ {
        self.faces.iter().filter_map(|f| f.bounds)
    }
}

/// Runs feature extraction and classification per face
#[derive(Debug, Clone, Default)]
pub struct FaceTracker {
    classifier: EmotionClassifier,
}

impl FaceTracker {
    pub fn new() -> Self {
        Self {
            classifier: EmotionClassifier::new(),
        }
    }

    /// Classify a single face; malformed landmark sets count as no detection
    pub fn classify_face(&self, face: &FaceLandmarks, size: ImageSize) -> DetectionResult {
        match FeatureVector::extract(face, size) {
            Ok(features) => self.classifier.classify(&features),
            Err(e) => {
                warn!("skipping face: {}", e);
                DetectionResult::none()
            }
        }
    }

    /// Classify every face and pick the most confident (first wins ties)
    pub fn process(&self, faces: Vec<FaceLandmarks>, size: ImageSize) -> FrameDetection {
        let mut frame = FrameDetection::empty();

        for landmarks in faces {
            let result = self.classify_face(&landmarks, size);
            if result.confidence > frame.best_confidence {
                frame.best_emotion = result.emotion;
                frame.best_confidence = result.confidence;
            }
            let bounds = landmarks.bounding_box(size);
            frame.faces.push(FaceDetection {
                landmarks,
                result,
                bounds,
            });
        }

        debug!(
            faces = frame.faces.len(),
            best = ?frame.best_emotion,
            confidence = frame.best_confidence,
            "frame classified"
        );
        frame
    }

    /// Run a provider on an optional image; an absent image is no detection
    pub fn analyze_image(
        &self,
        provider: &mut dyn LandmarkProvider,
        image: Option<&DynamicImage>,
    ) -> Result<FrameDetection, DetectionError> {
        let Some(image) = image else {
            return Ok(FrameDetection::empty());
        };
        let size = ImageSize::new(image.width(), image.height());
        let faces = provider.detect(image)?;
        Ok(self.process(faces, size))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::facs::features::tests::face_with;
    use crate::facs::landmarks::Landmark;

    pub(crate) fn smiling() -> FaceLandmarks {
        // curvature 0.05, brow 30, ear 0.24
        face_with(10.0, 26.0, 24.0)
    }

    pub(crate) fn scowling() -> FaceLandmarks {
        // curvature -0.02, brow ~10.7, ear 0.16
        face_with(-4.0, 8.0, 16.0)
    }

    pub(crate) fn relaxed() -> FaceLandmarks {
        // curvature 0, brow 20, ear 0.24
        face_with(0.0, 16.0, 24.0)
    }

    pub(crate) struct StubProvider {
        pub faces: Vec<FaceLandmarks>,
        pub fail: bool,
    }

    impl LandmarkProvider for StubProvider {
        fn name(&self) -> String {
            "stub".to_string()
        }

        fn detect(&mut self, _image: &DynamicImage) -> Result<Vec<FaceLandmarks>, DetectionError> {
            if self.fail {
                return Err(DetectionError::SourceUnavailable("stub offline".into()));
            }
            Ok(self.faces.clone())
        }
    }

    #[test]
    fn test_single_faces() {
        let tracker = FaceTracker::new();
        let size = ImageSize::new(1000, 1000);

        let r = tracker.classify_face(&smiling(), size);
        assert_eq!(r.emotion, Some(EmotionLabel::Happy));

        let r = tracker.classify_face(&scowling(), size);
        assert_eq!(r.emotion, Some(EmotionLabel::Angry));

        let r = tracker.classify_face(&relaxed(), size);
        assert_eq!(r.emotion, Some(EmotionLabel::Neutral));
    }

    #[test]
    fn test_no_faces() {
        let frame = FaceTracker::new().process(Vec::new(), ImageSize::default());
        assert_eq!(frame.best_emotion, None);
        assert_eq!(frame.best_confidence, 0.0);
        assert!(frame.faces.is_empty());
    }

    #[test]
    fn test_most_confident_face_wins() {
        let tracker = FaceTracker::new();
        let size = ImageSize::new(1000, 1000);
        // A weak smile: 0.6 + brow 0.1 = 0.7; the scowl scores 1.0.
        let weak_smile = face_with(6.0, 30.0, 24.0);
        let frame = tracker.process(vec![weak_smile, scowling()], size);
        assert_eq!(frame.faces.len(), 2);
        assert_eq!(frame.best_emotion, Some(EmotionLabel::Angry));
        assert!((frame.best_confidence - 1.0).abs() < 1e-6);
        let boxes: Vec<_> = frame.face_boxes().collect();
        assert_eq!(boxes.len(), 2);
        for (lo, hi) in boxes {
            assert!(lo.x <= hi.x && lo.y <= hi.y);
            assert!(hi.x <= 1000.0 && hi.y <= 1000.0);
        }
    }

    #[test]
    fn test_first_face_wins_ties() {
        let tracker = FaceTracker::new();
        let size = ImageSize::new(1000, 1000);
        let frame = tracker.process(vec![relaxed(), smiling()], size);
        assert_eq!(frame.best_emotion, Some(EmotionLabel::Neutral));
    }

    #[test]
    fn test_malformed_face_is_skipped() {
        let tracker = FaceTracker::new();
        let short = FaceLandmarks::new(vec![Landmark::default(); 12]);
        let frame = tracker.process(vec![short, smiling()], ImageSize::new(1000, 1000));
        assert_eq!(frame.faces[0].result, DetectionResult::none());
        assert_eq!(frame.best_emotion, Some(EmotionLabel::Happy));
    }

    #[test]
    fn test_analyze_image() {
        let tracker = FaceTracker::new();
        let image = DynamicImage::new_rgb8(1000, 1000);

        let mut provider = StubProvider {
            faces: vec![smiling()],
            fail: false,
        };
        let frame = tracker.analyze_image(&mut provider, Some(&image)).unwrap();
        assert_eq!(frame.best_emotion, Some(EmotionLabel::Happy));

        let frame = tracker.analyze_image(&mut provider, None).unwrap();
        assert_eq!(frame.best_emotion, None);

        provider.fail = true;
        assert!(tracker.analyze_image(&mut provider, Some(&image)).is_err());
    }
}
