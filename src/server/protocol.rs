//! Request/response shapes for the network game and their framing
//!
//! Frames are a big-endian `u32` length followed by a JSON body.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::io::{self, Read, Write};

use crate::facs::{DetectionResult, EmotionLabel};
use crate::session::Snapshot;

/// Client actions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Request {
    /// Apply due timeouts and report the game
    Snapshot,
    Start,
    /// A label detected client-side; confidence defaults to the manual value
    SubmitEmotion {
        emotion: EmotionLabel,
        #[serde(default)]
        confidence: Option<f32>,
    },
    /// Back to the menu
    Reset,
    /// One-shot detection on an encoded image (PNG or JPEG bytes)
    Analyze { image: Vec<u8> },
}

/// Server replies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    Snapshot(Snapshot),
    Started(Snapshot),
    Submitted { matched: bool, game_state: Snapshot },
    Reset(Snapshot),
    Analysis(Analysis),
    Error { kind: String, message: String },
}

/// Result of a one-shot analysis
///
/// `breakdown` is a display aid spread around the winning confidence, not a
/// probability distribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub emotion: Option<EmotionLabel>,
    pub confidence: f32,
    pub faces: usize,
    pub breakdown: FxHashMap<EmotionLabel, f32>,
}

impl Analysis {
    pub fn new(result: DetectionResult, faces: usize) -> Self {
        Analysis {
            emotion: result.emotion,
            confidence: result.confidence,
            faces,
            breakdown: breakdown(result),
        }
    }
}

/// Percentages: the winner gets `confidence * 100`, every other label
/// `(1 - confidence) * 50`. All zero when nothing was detected.
pub fn breakdown(result: DetectionResult) -> FxHashMap<EmotionLabel, f32> {
    let mut map = FxHashMap::default();
    for label in EmotionLabel::ALL {
        let pct = match result.emotion {
            Some(winner) if winner == label => result.confidence * 100.0,
            Some(_) => (1.0 - result.confidence) * 50.0,
            None => 0.0,
        };
        map.insert(label, pct);
    }
    map
}

/// Read one frame; `Ok(None)` on a clean end of stream
pub fn read_frame<R: Read>(reader: &mut R, max_bytes: usize) -> io::Result<Option<Vec<u8>>> {
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e),
    }
    let len = u32::from_be_bytes(len_buf) as usize;
    if len > max_bytes {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("frame of {} bytes exceeds limit of {}", len, max_bytes),
        ));
    }

    // Grow with the bytes that actually arrive rather than the claimed length
    let mut buf = Vec::new();
    reader.by_ref().take(len as u64).read_to_end(&mut buf)?;
    if buf.len() < len {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("frame truncated at {} of {} bytes", buf.len(), len),
        ));
    }
    Ok(Some(buf))
}

/// Serialize `value` as one frame
pub fn write_frame<W: Write, T: Serialize>(writer: &mut W, value: &T) -> io::Result<()> {
    let body = serde_json::to_vec(value).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    let len = u32::try_from(body.len())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "frame too large"))?;
    writer.write_all(&len.to_be_bytes())?;
    writer.write_all(&body)?;
    writer.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_request_shapes() {
        let r: Request = serde_json::from_str(r#"{"action": "start"}"#).unwrap();
        assert_eq!(r, Request::Start);

        let r: Request =
            serde_json::from_str(r#"{"action": "submit_emotion", "emotion": "happy"}"#).unwrap();
        assert_eq!(
            r,
            Request::SubmitEmotion {
                emotion: EmotionLabel::Happy,
                confidence: None
            }
        );

        assert!(serde_json::from_str::<Request>(r#"{"action": "submit_emotion", "emotion": "sad"}"#).is_err());
    }

    #[test]
    fn test_breakdown_spread() {
        let b = breakdown(DetectionResult::new(EmotionLabel::Angry, 0.8));
        assert!((b[&EmotionLabel::Angry] - 80.0).abs() < 1e-3);
        assert!((b[&EmotionLabel::Happy] - 10.0).abs() < 1e-3);
        assert!((b[&EmotionLabel::Neutral] - 10.0).abs() < 1e-3);

        let b = breakdown(DetectionResult::none());
        assert!(b.values().all(|&v| v == 0.0));
        assert_eq!(b.len(), 3);
    }

    #[test]
    fn test_framing() {
        let mut buf = Vec::new();
        write_frame(&mut buf, &Request::Reset).unwrap();
        write_frame(&mut buf, &Request::Snapshot).unwrap();

        let mut cursor = Cursor::new(buf);
        let first = read_frame(&mut cursor, 1024).unwrap().unwrap();
        assert_eq!(serde_json::from_slice::<Request>(&first).unwrap(), Request::Reset);
        let second = read_frame(&mut cursor, 1024).unwrap().unwrap();
        assert_eq!(serde_json::from_slice::<Request>(&second).unwrap(), Request::Snapshot);
        assert!(read_frame(&mut cursor, 1024).unwrap().is_none());
    }

    #[test]
    fn test_oversized_frame_rejected() {
        let mut data = 2048u32.to_be_bytes().to_vec();
        data.extend(vec![0u8; 16]);
        let err = read_frame(&mut Cursor::new(data), 1024).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_truncated_frame_rejected() {
        // Claims the full limit but sends only a few bytes
        let mut data = (1024u32 * 1024).to_be_bytes().to_vec();
        data.extend(b"{\"action\"");
        let err = read_frame(&mut Cursor::new(data), 1024 * 1024).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }
}
