//! Session shared between concurrent request handlers
//!
//! Every mutation runs inside one lock scope, so at most one state
//! transition is in flight. Detection work happens before the lock is
//! taken; a failed detection never reaches the session.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Instant;

use crate::facs::EmotionLabel;
use crate::session::state::{GameSession, Snapshot};

/// Cloneable handle to one `GameSession`
#[derive(Clone)]
pub struct SharedSession {
    inner: Arc<Mutex<GameSession>>,
}

impl SharedSession {
    pub fn new(session: GameSession) -> Self {
        SharedSession {
            inner: Arc::new(Mutex::new(session)),
        }
    }

    pub fn start(&self, now: Instant) {
        self.inner.lock().start(now);
    }

    pub fn tick(&self, now: Instant) -> bool {
        self.inner.lock().tick(now)
    }

    pub fn submit_detection(
        &self,
        emotion: Option<EmotionLabel>,
        confidence: f32,
        now: Instant,
    ) -> bool {
        self.inner.lock().submit_detection(emotion, confidence, now)
    }

    /// Submit and report the resulting state under the same lock
    pub fn submit_and_snapshot(
        &self,
        emotion: Option<EmotionLabel>,
        confidence: f32,
        now: Instant,
    ) -> (bool, Snapshot) {
        let mut session = self.inner.lock();
        let matched = session.submit_detection(emotion, confidence, now);
        (matched, session.snapshot(now))
    }

    pub fn reset_to_menu(&self) {
        self.inner.lock().reset_to_menu();
    }

    pub fn snapshot(&self, now: Instant) -> Snapshot {
        self.inner.lock().snapshot(now)
    }

    /// Apply any due timeout, then report
    pub fn poll(&self, now: Instant) -> Snapshot {
        let mut session = self.inner.lock();
        session.tick(now);
        session.snapshot(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::prompt::{PromptScheduler, PromptTiming};
    use crate::session::state::{GameRules, GameState};
    use std::thread;
    use std::time::Duration;

    fn shared() -> SharedSession {
        SharedSession::new(GameSession::new(
            GameRules::default(),
            PromptScheduler::seeded(PromptTiming::web(), 9),
        ))
    }

    #[test]
    fn test_concurrent_submissions_are_serialized() {
        let session = shared();
        let t0 = Instant::now();
        session.start(t0);

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let session = session.clone();
                thread::spawn(move || {
                    let mut matched = 0u32;
                    for j in 0..50u64 {
                        let emotion = EmotionLabel::ALL[(i + j as usize) % 3];
                        let now = t0 + Duration::from_millis(j);
                        if session.submit_detection(Some(emotion), 0.9, now) {
                            matched += 1;
                        }
                    }
                    matched
                })
            })
            .collect();

        let matched: u32 = handles.into_iter().map(|h| h.join().unwrap()).sum();
        let snap = session.snapshot(t0);
        assert_eq!(snap.matches as u32, matched);
        assert_eq!(snap.streak, matched);
        assert_eq!(snap.state, GameState::Playing);
    }

    #[test]
    fn test_poll_applies_timeouts() {
        let session = shared();
        let t0 = Instant::now();
        session.start(t0);
        let snap = session.poll(t0 + Duration::from_millis(5100));
        assert_eq!(snap.lives, 2);
        assert!((snap.time_left - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_submit_and_snapshot() {
        let session = shared();
        let t0 = Instant::now();
        let (matched, snap) = session.submit_and_snapshot(Some(EmotionLabel::Happy), 1.0, t0);
        assert!(!matched);
        assert_eq!(snap.state, GameState::Menu);
    }
}
