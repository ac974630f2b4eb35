//! Per-tick detection sources for the interactive host
//!
//! A host asks its source for one `FrameDetection` per tick. Real sources
//! replay landmark recordings through the `FaceTracker`; when none is
//! available the host runs a `ManualSource` fed by keyboard injection.

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::DetectionError;
use crate::facs::{EmotionLabel, FaceLandmarks, FaceTracker, FrameDetection, ImageSize};

/// Something that yields one detection per tick
pub trait DetectionSource {
    fn name(&self) -> String;

    /// Next frame's result. Errors are absorbed by the host for that tick.
    fn next_detection(&mut self) -> Result<FrameDetection, DetectionError>;

    /// Whether keyboard injection drives this source
    fn accepts_injection(&self) -> bool {
        false
    }

    /// Manual override; ignored by sources backed by real detection
    fn inject(&mut self, _emotion: EmotionLabel) {}

    /// No further detections will ever come from this source
    fn is_exhausted(&self) -> bool {
        false
    }
}

/// Keyboard-driven stand-in for a detector
///
/// The last injected emotion is reported every tick until replaced.
#[derive(Debug, Clone)]
pub struct ManualSource {
    current: Option<EmotionLabel>,
    confidence: f32,
}

impl ManualSource {
    pub fn new(confidence: f32) -> Self {
        ManualSource {
            current: None,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    pub fn current(&self) -> Option<EmotionLabel> {
        self.current
    }
}

impl DetectionSource for ManualSource {
    fn name(&self) -> String {
        "manual".to_string()
    }

    fn next_detection(&mut self) -> Result<FrameDetection, DetectionError> {
        Ok(match self.current {
            Some(emotion) => FrameDetection::injected(emotion, self.confidence),
            None => FrameDetection::empty(),
        })
    }

    fn accepts_injection(&self) -> bool {
        true
    }

    fn inject(&mut self, emotion: EmotionLabel) {
        debug!(%emotion, "manual emotion injected");
        self.current = Some(emotion);
    }
}

/// One recorded frame of landmark output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordedFrame {
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub faces: Vec<FaceLandmarks>,
}

/// Replays a JSON-lines landmark recording, one frame per tick
pub struct ReplaySource {
    path: PathBuf,
    reader: BufReader<File>,
    looping: bool,
    finished: bool,
    tracker: FaceTracker,
    frames_read: u64,
}

impl ReplaySource {
    /// Open a recording; failure here is a startup error
    pub fn open(path: &Path, looping: bool) -> Result<Self, DetectionError> {
        let file = File::open(path).map_err(|e| {
            DetectionError::SourceUnavailable(format!("cannot open {}: {}", path.display(), e))
        })?;
        info!(path = %path.display(), looping, "replaying landmark recording");
        Ok(ReplaySource {
            path: path.to_path_buf(),
            reader: BufReader::new(file),
            looping,
            finished: false,
            tracker: FaceTracker::new(),
            frames_read: 0,
        })
    }

    pub fn frames_read(&self) -> u64 {
        self.frames_read
    }

    fn read_line(&mut self) -> Result<Option<String>, DetectionError> {
        let mut line = String::new();
        let n = self
            .reader
            .read_line(&mut line)
            .map_err(|e| DetectionError::SourceUnavailable(e.to_string()))?;
        Ok(if n == 0 { None } else { Some(line) })
    }

    fn rewind(&mut self) -> Result<(), DetectionError> {
        self.reader
            .seek(SeekFrom::Start(0))
            .map_err(|e| DetectionError::SourceUnavailable(e.to_string()))?;
        Ok(())
    }
}

impl DetectionSource for ReplaySource {
    fn name(&self) -> String {
        format!("replay ({})", self.path.display())
    }

    fn is_exhausted(&self) -> bool {
        self.finished
    }

    fn next_detection(&mut self) -> Result<FrameDetection, DetectionError> {
        let line = match self.read_line()? {
            Some(line) => line,
            None if self.looping && self.frames_read > 0 => {
                self.rewind()?;
                self.read_line()?.ok_or_else(|| {
                    DetectionError::SourceUnavailable("recording is empty".to_string())
                })?
            }
            None => {
                self.finished = true;
                return Err(DetectionError::SourceUnavailable(
                    "recording finished".to_string(),
                ));
            }
        };
        self.frames_read += 1;

        if line.trim().is_empty() {
            return Ok(FrameDetection::empty());
        }
        let frame: RecordedFrame = serde_json::from_str(&line).map_err(|e| {
            DetectionError::InvalidInput(format!("frame {}: {}", self.frames_read, e))
        })?;
        let size = ImageSize::new(frame.width, frame.height);
        Ok(self.tracker.process(frame.faces, size))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facs::tracker::tests::{scowling, smiling};
    use std::io::Write;

    fn recording(name: &str, lines: &[String]) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "mood-blaster-{}-{}.jsonl",
            name,
            std::process::id()
        ));
        let mut file = File::create(&path).unwrap();
        for line in lines {
            writeln!(file, "{}", line).unwrap();
        }
        path
    }

    fn frame_line(faces: Vec<FaceLandmarks>) -> String {
        serde_json::to_string(&RecordedFrame {
            width: 1000,
            height: 1000,
            faces,
        })
        .unwrap()
    }

    #[test]
    fn test_manual_source_is_sticky() {
        let mut source = ManualSource::new(0.9);
        assert!(source.accepts_injection());
        assert_eq!(source.next_detection().unwrap().best_emotion, None);

        source.inject(EmotionLabel::Angry);
        for _ in 0..3 {
            let frame = source.next_detection().unwrap();
            assert_eq!(frame.best_emotion, Some(EmotionLabel::Angry));
            assert!((frame.best_confidence - 0.9).abs() < 1e-6);
        }
        source.inject(EmotionLabel::Happy);
        assert_eq!(source.current(), Some(EmotionLabel::Happy));
        assert!(!source.is_exhausted());
    }

    #[test]
    fn test_replay_frames_in_order() {
        let path = recording(
            "order",
            &[
                frame_line(vec![smiling()]),
                frame_line(vec![]),
                "{ broken".to_string(),
                frame_line(vec![scowling()]),
            ],
        );
        let mut source = ReplaySource::open(&path, false).unwrap();
        assert!(!source.accepts_injection());

        assert_eq!(
            source.next_detection().unwrap().best_emotion,
            Some(EmotionLabel::Happy)
        );
        assert_eq!(source.next_detection().unwrap().best_emotion, None);
        assert!(matches!(
            source.next_detection(),
            Err(DetectionError::InvalidInput(_))
        ));
        assert_eq!(
            source.next_detection().unwrap().best_emotion,
            Some(EmotionLabel::Angry)
        );
        assert!(!source.is_exhausted());
        assert!(matches!(
            source.next_detection(),
            Err(DetectionError::SourceUnavailable(_))
        ));
        assert!(source.is_exhausted());
        assert_eq!(source.frames_read(), 4);
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_replay_loops() {
        let path = recording("loop", &[frame_line(vec![smiling()])]);
        let mut source = ReplaySource::open(&path, true).unwrap();
        for _ in 0..3 {
            assert_eq!(
                source.next_detection().unwrap().best_emotion,
                Some(EmotionLabel::Happy)
            );
        }
        assert!(!source.is_exhausted());
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_missing_recording() {
        let result = ReplaySource::open(Path::new("/nonexistent/frames.jsonl"), false);
        assert!(matches!(result, Err(DetectionError::SourceUnavailable(_))));
    }
}
