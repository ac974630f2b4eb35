//! Rule-based emotion classifier
//!
//! Each label accumulates fixed weights from threshold rules over the
//! feature vector. The best label wins if it clears the confidence floor.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::facs::features::FeatureVector;

/// Emotions the game can ask for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmotionLabel {
    Happy,
    Angry,
    Neutral,
}

impl EmotionLabel {
    /// All labels in tie-break order
    pub const ALL: [EmotionLabel; 3] = [EmotionLabel::Happy, EmotionLabel::Angry, EmotionLabel::Neutral];

    pub fn index(self) -> usize {
        match self {
            EmotionLabel::Happy => 0,
            EmotionLabel::Angry => 1,
            EmotionLabel::Neutral => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EmotionLabel::Happy => "happy",
            EmotionLabel::Angry => "angry",
            EmotionLabel::Neutral => "neutral",
        }
    }
}

impl fmt::Display for EmotionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EmotionLabel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "happy" => Ok(EmotionLabel::Happy),
            "angry" => Ok(EmotionLabel::Angry),
            "neutral" => Ok(EmotionLabel::Neutral),
            other => Err(format!("unknown emotion: {}", other)),
        }
    }
}

/// Result for one face
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    /// `None` when no label cleared the floor
    pub emotion: Option<EmotionLabel>,
    /// Always within `[0, 1]`
    pub confidence: f32,
}

impl DetectionResult {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn new(emotion: EmotionLabel, confidence: f32) -> Self {
        Self {
            emotion: Some(emotion),
            confidence: confidence.clamp(0.0, 1.0),
        }
    }
}

/// Scores below this are rejected
pub const CONFIDENCE_FLOOR: f32 = 0.3;

// Happy: upturned mouth, relaxed brows.
const SMILE_CURVATURE: f32 = 0.02;
const STRONG_SMILE_CURVATURE: f32 = 0.04;
const RELAXED_BROW: f32 = 25.0;

// Angry: downturned mouth, lowered brows, narrowed eyes.
const FROWN_CURVATURE: f32 = -0.015;
const FURROWED_BROW: f32 = 15.0;
const SQUINT_EAR: f32 = 0.2;

// Neutral: flat mouth, brows and eyes in their normal band.
const FLAT_MOUTH: f32 = 0.02;
const NORMAL_EAR_MAX: f32 = 0.35;

/// Fixed-weight emotion classifier
#[derive(Debug, Clone, Copy, Default)]
pub struct EmotionClassifier;

impl EmotionClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Raw accumulated score per label, indexed by `EmotionLabel::index`
    pub fn scores(&self, f: &FeatureVector) -> [f32; 3] {
        let mut scores = [0.0f32; 3];
        let curvature = f.mouth_curvature;
        let brow = f.eyebrow_distance;
        let ear = f.eye_aspect_ratio;

        let happy = &mut scores[EmotionLabel::Happy.index()];
        if curvature > SMILE_CURVATURE {
            *happy += 0.6;
        }
        if curvature > STRONG_SMILE_CURVATURE {
            *happy += 0.3;
        }
        if brow > RELAXED_BROW {
            *happy += 0.1;
        }

        let angry = &mut scores[EmotionLabel::Angry.index()];
        if curvature < FROWN_CURVATURE {
            *angry += 0.4;
        }
        if brow < FURROWED_BROW {
            *angry += 0.5;
        }
        if ear < SQUINT_EAR {
            *angry += 0.1;
        }

        let neutral = &mut scores[EmotionLabel::Neutral.index()];
        if curvature.abs() < FLAT_MOUTH {
            *neutral += 0.4;
        }
        if (FURROWED_BROW..=RELAXED_BROW).contains(&brow) {
            *neutral += 0.3;
        }
        if (SQUINT_EAR..=NORMAL_EAR_MAX).contains(&ear) {
            *neutral += 0.3;
        }

        scores
    }

    /// Pick the best label, or `none` below the floor
    pub fn classify(&self, features: &FeatureVector) -> DetectionResult {
        let scores = self.scores(features);

        let mut best = EmotionLabel::ALL[0];
        for label in EmotionLabel::ALL.iter().skip(1) {
            if scores[label.index()] > scores[best.index()] {
                best = *label;
            }
        }

        let score = scores[best.index()];
        if score < CONFIDENCE_FLOOR {
            return DetectionResult::none();
        }
        DetectionResult::new(best, score.min(1.0))
    }
}
