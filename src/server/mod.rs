//! Network host for the game
//!
//! # Components
//! - `protocol.rs`: Request/Response shapes, analysis breakdown, framing
//!
//! One `SharedSession` serves every connection. Each connection runs on its
//! own thread and handles frames in order.

pub mod protocol;

use parking_lot::Mutex;
use std::io::{self, BufReader, BufWriter};
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::Instant;
use tracing::{debug, error, info, warn};

use crate::error::DetectionError;
use crate::facs::{FaceTracker, LandmarkProvider};
use crate::session::SharedSession;
use protocol::{read_frame, write_frame, Analysis, Request, Response};

pub type SharedProvider = Arc<Mutex<Box<dyn LandmarkProvider + Send>>>;

/// Request handler shared by all connections
pub struct GameServer {
    session: SharedSession,
    provider: Option<SharedProvider>,
    tracker: FaceTracker,
    manual_confidence: f32,
    max_frame_bytes: usize,
}

impl GameServer {
    pub fn new(
        session: SharedSession,
        provider: Option<Box<dyn LandmarkProvider + Send>>,
        manual_confidence: f32,
        max_frame_bytes: usize,
    ) -> Self {
        GameServer {
            session,
            provider: provider.map(|p| Arc::new(Mutex::new(p))),
            tracker: FaceTracker::new(),
            manual_confidence,
            max_frame_bytes,
        }
    }

    /// Whether image analysis is possible
    pub fn can_analyze(&self) -> bool {
        self.provider.is_some()
    }

    pub fn handle(&self, request: Request, now: Instant) -> Response {
        match request {
            Request::Snapshot => Response::Snapshot(self.session.poll(now)),
            Request::Start => {
                self.session.start(now);
                Response::Started(self.session.snapshot(now))
            }
            Request::SubmitEmotion {
                emotion,
                confidence,
            } => {
                let confidence = confidence.unwrap_or(self.manual_confidence);
                let (matched, game_state) =
                    self.session
                        .submit_and_snapshot(Some(emotion), confidence, now);
                Response::Submitted {
                    matched,
                    game_state,
                }
            }
            Request::Reset => {
                self.session.reset_to_menu();
                Response::Reset(self.session.snapshot(now))
            }
            Request::Analyze { image } => match self.analyze(&image) {
                Ok(analysis) => Response::Analysis(analysis),
                Err(e) => error_response(&e),
            },
        }
    }

    /// Decode an image and classify it. Never touches the session.
    pub fn analyze(&self, bytes: &[u8]) -> Result<Analysis, DetectionError> {
        let provider = self.provider.as_ref().ok_or_else(|| {
            DetectionError::SourceUnavailable("no landmark provider configured".to_string())
        })?;
        let image = image::load_from_memory(bytes)
            .map_err(|e| DetectionError::InvalidInput(format!("undecodable image: {}", e)))?;

        let mut provider = provider.lock();
        let frame = self.tracker.analyze_image(&mut **provider, Some(&image))?;
        Ok(Analysis::new(frame.best(), frame.faces.len()))
    }

    /// Accept connections until the listener fails
    pub fn serve(self: Arc<Self>, listener: TcpListener) -> io::Result<()> {
        info!(addr = %listener.local_addr()?, "listening");
        for stream in listener.incoming() {
            match stream {
                Ok(stream) => {
                    let server = Arc::clone(&self);
                    thread::spawn(move || {
                        let peer = stream
                            .peer_addr()
                            .map(|a| a.to_string())
                            .unwrap_or_else(|_| "unknown".to_string());
                        debug!(%peer, "connection opened");
                        if let Err(e) = server.handle_connection(stream) {
                            warn!(%peer, "connection error: {}", e);
                        }
                        debug!(%peer, "connection closed");
                    });
                }
                Err(e) => error!("accept failed: {}", e),
            }
        }
        Ok(())
    }

    fn handle_connection(&self, stream: TcpStream) -> io::Result<()> {
        let mut reader = BufReader::new(stream.try_clone()?);
        let mut writer = BufWriter::new(stream);

        while let Some(body) = read_frame(&mut reader, self.max_frame_bytes)? {
            let response = match serde_json::from_slice::<Request>(&body) {
                Ok(request) => self.handle(request, Instant::now()),
                Err(e) => error_response(&DetectionError::InvalidInput(e.to_string())),
            };
            write_frame(&mut writer, &response)?;
        }
        Ok(())
    }
}

fn error_response(e: &DetectionError) -> Response {
    warn!("request failed: {}", e);
    Response::Error {
        kind: e.kind().to_string(),
        message: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facs::tracker::tests::{smiling, StubProvider};
    use crate::facs::EmotionLabel;
    use crate::session::{GameRules, GameSession, GameState, PromptScheduler, PromptTiming};
    use image::{DynamicImage, ImageFormat};
    use std::io::{Cursor, Write};
    use std::net::TcpStream;

    fn server(provider: Option<Box<dyn LandmarkProvider + Send>>) -> GameServer {
        let session = GameSession::new(
            GameRules::default(),
            PromptScheduler::seeded(PromptTiming::web(), 5),
        );
        GameServer::new(SharedSession::new(session), provider, 0.9, 1 << 20)
    }

    fn png(width: u32, height: u32) -> Vec<u8> {
        let mut buf = Vec::new();
        DynamicImage::new_rgb8(width, height)
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    fn snapshot_of(response: Response) -> crate::session::Snapshot {
        match response {
            Response::Snapshot(s) | Response::Started(s) | Response::Reset(s) => s,
            Response::Submitted { game_state, .. } => game_state,
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_game_actions() {
        let server = server(None);
        let t0 = Instant::now();

        let s = snapshot_of(server.handle(Request::Snapshot, t0));
        assert_eq!(s.state, GameState::Menu);

        let s = snapshot_of(server.handle(Request::Start, t0));
        assert_eq!(s.state, GameState::Playing);
        let target = s.target_emotion.unwrap();

        match server.handle(
            Request::SubmitEmotion {
                emotion: target,
                confidence: None,
            },
            t0,
        ) {
            Response::Submitted {
                matched,
                game_state,
            } => {
                assert!(matched);
                // 100 + 500 speed + 90 accuracy
                assert_eq!(game_state.score, 690);
            }
            other => panic!("unexpected: {:?}", other),
        }

        let s = snapshot_of(server.handle(Request::Reset, t0));
        assert_eq!(s.state, GameState::Menu);
    }

    #[test]
    fn test_analyze_without_provider() {
        let server = server(None);
        assert!(!server.can_analyze());
        match server.handle(Request::Analyze { image: png(8, 8) }, Instant::now()) {
            Response::Error { kind, .. } => assert_eq!(kind, "source_unavailable"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_analyze_rejects_garbage() {
        let server = server(Some(Box::new(StubProvider {
            faces: vec![],
            fail: false,
        })));
        match server.handle(
            Request::Analyze {
                image: vec![1, 2, 3],
            },
            Instant::now(),
        ) {
            Response::Error { kind, .. } => assert_eq!(kind, "invalid_input"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_analyze_image() {
        let server = server(Some(Box::new(StubProvider {
            faces: vec![smiling()],
            fail: false,
        })));
        let analysis = server.analyze(&png(1000, 1000)).unwrap();
        assert_eq!(analysis.emotion, Some(EmotionLabel::Happy));
        assert_eq!(analysis.faces, 1);
        assert!((analysis.breakdown[&EmotionLabel::Happy] - 100.0).abs() < 1e-3);
    }

    #[test]
    fn test_failed_analysis_leaves_session_alone() {
        let server = server(Some(Box::new(StubProvider {
            faces: vec![],
            fail: true,
        })));
        let t0 = Instant::now();
        let before = snapshot_of(server.handle(Request::Start, t0));
        let response = server.handle(Request::Analyze { image: png(4, 4) }, t0);
        assert!(matches!(response, Response::Error { .. }));
        assert_eq!(snapshot_of(server.handle(Request::Snapshot, t0)), before);
    }

    #[test]
    fn test_tcp_round_trip() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let server = Arc::new(server(None));
        thread::spawn(move || server.serve(listener));

        let mut stream = TcpStream::connect(addr).unwrap();
        write_frame(&mut stream, &Request::Start).unwrap();
        let body = read_frame(&mut stream, 1 << 20).unwrap().unwrap();
        let response: Response = serde_json::from_slice(&body).unwrap();
        assert_eq!(snapshot_of(response).state, GameState::Playing);

        // Malformed body gets an error reply, and the connection stays usable.
        let garbage = b"{nope";
        stream.write_all(&(garbage.len() as u32).to_be_bytes()).unwrap();
        stream.write_all(garbage).unwrap();
        let body = read_frame(&mut stream, 1 << 20).unwrap().unwrap();
        let response: Response = serde_json::from_slice(&body).unwrap();
        assert!(matches!(response, Response::Error { .. }));

        write_frame(&mut stream, &Request::Snapshot).unwrap();
        let body = read_frame(&mut stream, 1 << 20).unwrap().unwrap();
        let response: Response = serde_json::from_slice(&body).unwrap();
        assert_eq!(snapshot_of(response).state, GameState::Playing);
    }
}
