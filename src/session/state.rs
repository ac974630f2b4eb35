//! Game session state machine
//!
//! Maintains:
//! - Menu / Playing / GameOver state
//! - Score, level, lives, streaks and reaction times
//! - The active prompt, issued by `PromptScheduler`
//!
//! All mutation goes through `start`, `tick`, `submit_detection` and
//! `reset_to_menu`. Time is passed in so the machine stays deterministic.

use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info};

use crate::facs::EmotionLabel;
use crate::session::prompt::{Prompt, PromptScheduler};

/// Session phase
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameState {
    /// Waiting for the player to start
    Menu,
    /// A prompt is active
    Playing,
    /// Out of lives; only `start` leaves this state
    GameOver,
}

/// Tunable scoring rules
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameRules {
    pub starting_lives: u32,
    /// A detection must be strictly above this to count
    pub match_confidence: f32,
    /// Level goes up every this many matches
    pub matches_per_level: usize,
    pub base_points: u64,
}

impl Default for GameRules {
    fn default() -> Self {
        GameRules {
            starting_lives: 3,
            match_confidence: 0.6,
            matches_per_level: 5,
            base_points: 100,
        }
    }
}

/// Read-only projection for rendering and serialization
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub state: GameState,
    pub score: u64,
    pub level: u32,
    pub lives: u32,
    pub streak: u32,
    pub max_streak: u32,
    /// Successful matches this game
    pub matches: usize,
    pub target_emotion: Option<EmotionLabel>,
    /// Seconds left on the active prompt, 0 outside `Playing`
    pub time_left: f32,
    pub avg_reaction_time: f32,
    /// Targets still queued in sequence mode
    pub sequence_remaining: usize,
}

/// Complete game state
#[derive(Clone, Debug)]
pub struct GameSession {
    state: GameState,
    score: u64,
    level: u32,
    lives: u32,
    streak: u32,
    max_streak: u32,
    reaction_times: Vec<f32>,
    prompt: Option<Prompt>,
    scheduler: PromptScheduler,
    rules: GameRules,
}

impl GameSession {
    /// New session in the menu
    pub fn new(rules: GameRules, scheduler: PromptScheduler) -> Self {
        GameSession {
            state: GameState::Menu,
            score: 0,
            level: 1,
            lives: rules.starting_lives,
            streak: 0,
            max_streak: 0,
            reaction_times: Vec::new(),
            prompt: None,
            scheduler,
            rules,
        }
    }

    /// Reset counters and begin playing with a fresh prompt
    pub fn start(&mut self, now: Instant) {
        self.score = 0;
        self.level = 1;
        self.lives = self.rules.starting_lives;
        self.streak = 0;
        self.reaction_times.clear();
        self.scheduler.clear_sequence();
        self.state = GameState::Playing;
        self.issue_prompt(now);
        info!("game started");
    }

    /// Leave any state for the menu
    pub fn reset_to_menu(&mut self) {
        self.state = GameState::Menu;
        self.prompt = None;
        self.scheduler.clear_sequence();
        info!("returned to menu");
    }

    /// Apply the prompt deadline. Returns `true` if a life was lost.
    pub fn tick(&mut self, now: Instant) -> bool {
        if self.state != GameState::Playing {
            return false;
        }
        let expired = match &self.prompt {
            Some(prompt) => prompt.is_expired(now),
            None => false,
        };
        if !expired {
            return false;
        }

        self.lives = self.lives.saturating_sub(1);
        self.streak = 0;
        info!(lives = self.lives, "prompt timed out");

        if self.lives == 0 {
            self.state = GameState::GameOver;
            self.prompt = None;
            info!(score = self.score, level = self.level, "game over");
        } else {
            self.issue_prompt(now);
        }
        true
    }

    /// Check a detection against the active prompt. Returns `true` on a match.
    ///
    /// A miss changes nothing; the player keeps trying until the deadline.
    pub fn submit_detection(
        &mut self,
        emotion: Option<EmotionLabel>,
        confidence: f32,
        now: Instant,
    ) -> bool {
        if self.state != GameState::Playing {
            return false;
        }
        let Some(prompt) = self.prompt else {
            return false;
        };
        if emotion != Some(prompt.target) || confidence <= self.rules.match_confidence {
            return false;
        }

        let reaction_time = prompt.elapsed(now);
        let points = self.points_for(&prompt, reaction_time, confidence);

        self.score += points;
        self.streak += 1;
        self.max_streak = self.max_streak.max(self.streak);
        self.reaction_times.push(reaction_time);

        if self.reaction_times.len() % self.rules.matches_per_level.max(1) == 0 {
            self.level += 1;
            info!(level = self.level, "level up");
        }
        debug!(
            emotion = %prompt.target,
            points,
            reaction_time,
            streak = self.streak,
            "prompt matched"
        );

        self.issue_prompt(now);
        true
    }

    /// `base + speed bonus + accuracy bonus`, bonuses truncated to whole points
    fn points_for(&self, prompt: &Prompt, reaction_time: f32, confidence: f32) -> u64 {
        let speed_bonus = ((prompt.duration - reaction_time) * 100.0).trunc().max(0.0) as u64;
        let accuracy_bonus = (confidence.clamp(0.0, 1.0) * 100.0).trunc() as u64;
        self.rules.base_points + speed_bonus + accuracy_bonus
    }

    fn issue_prompt(&mut self, now: Instant) {
        let prompt = self.scheduler.next_prompt(self.level, now);
        debug!(
            emotion = %prompt.target,
            duration = prompt.duration,
            "new prompt"
        );
        self.prompt = Some(prompt);
    }

    pub fn snapshot(&self, now: Instant) -> Snapshot {
        let playing = self.state == GameState::Playing;
        Snapshot {
            state: self.state,
            score: self.score,
            level: self.level,
            lives: self.lives,
            streak: self.streak,
            max_streak: self.max_streak,
            matches: self.reaction_times.len(),
            target_emotion: self.prompt.filter(|_| playing).map(|p| p.target),
            time_left: match (&self.prompt, playing) {
                (Some(p), true) => p.time_left(now),
                _ => 0.0,
            },
            avg_reaction_time: self.avg_reaction_time(),
            sequence_remaining: self.scheduler.sequence().remaining().len(),
        }
    }

    pub fn avg_reaction_time(&self) -> f32 {
        if self.reaction_times.is_empty() {
            0.0
        } else {
            self.reaction_times.iter().sum::<f32>() / self.reaction_times.len() as f32
        }
    }

    pub fn state(&self) -> GameState {
        self.state
    }

    pub fn score(&self) -> u64 {
        self.score
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn lives(&self) -> u32 {
        self.lives
    }

    pub fn streak(&self) -> u32 {
        self.streak
    }

    pub fn max_streak(&self) -> u32 {
        self.max_streak
    }

    pub fn reaction_times(&self) -> &[f32] {
        &self.reaction_times
    }

    pub fn prompt(&self) -> Option<&Prompt> {
        self.prompt.as_ref()
    }
}
