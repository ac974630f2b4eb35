//! Prompt scheduling: which emotion to ask for next and how long to allow
//!
//! Above level 3 the scheduler queues "Simon Says" sequences. Once a
//! sequence is used up it falls back to independent random prompts until
//! the next one is generated.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

use crate::facs::EmotionLabel;

/// Sequences start above this level
pub const SEQUENCE_MIN_LEVEL: u32 = 3;
/// Sequence length at the first sequence level, before growth
pub const SEQUENCE_BASE_LEN: usize = 3;
/// Longest sequence ever generated
pub const SEQUENCE_MAX_LEN: usize = 6;

/// Prompt duration schedule
///
/// `duration = max(min_duration, base_duration * max(min_modifier, 1 - (level - 1) * level_step))`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptTiming {
    /// Seconds allowed at level 1
    pub base_duration: f32,
    /// Fraction of the base removed per level
    pub level_step: f32,
    /// Lowest level modifier
    pub min_modifier: f32,
    /// Floor in seconds
    pub min_duration: f32,
}

impl PromptTiming {
    /// Terminal game schedule: 3s shrinking to a 1s floor
    pub fn standalone() -> Self {
        PromptTiming {
            base_duration: 3.0,
            level_step: 0.15,
            min_modifier: 0.1,
            min_duration: 1.0,
        }
    }

    /// Browser schedule: 5s shrinking to a 3s floor
    pub fn web() -> Self {
        PromptTiming {
            base_duration: 5.0,
            level_step: 0.05,
            min_modifier: 0.4,
            min_duration: 3.0,
        }
    }

    /// Seconds allowed for a prompt issued at `level`
    pub fn duration_for(&self, level: u32) -> f32 {
        let steps = level.saturating_sub(1) as f32;
        let modifier = (1.0 - steps * self.level_step).max(self.min_modifier);
        (self.base_duration * modifier).max(self.min_duration)
    }
}

impl Default for PromptTiming {
    fn default() -> Self {
        Self::standalone()
    }
}

/// The active target
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prompt {
    pub target: EmotionLabel,
    pub start_time: Instant,
    /// Seconds
    pub duration: f32,
}

impl Prompt {
    /// Seconds since the prompt was issued (0 if `now` is earlier)
    pub fn elapsed(&self, now: Instant) -> f32 {
        now.saturating_duration_since(self.start_time).as_secs_f32()
    }

    pub fn time_left(&self, now: Instant) -> f32 {
        (self.duration - self.elapsed(now)).max(0.0)
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        self.elapsed(now) > self.duration
    }
}

/// Queue of targets for sequence mode
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmotionSequence {
    items: Vec<EmotionLabel>,
    index: usize,
}

impl EmotionSequence {
    pub fn new(items: Vec<EmotionLabel>) -> Self {
        Self { items, index: 0 }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Position of the next element to hand out
    pub fn index(&self) -> usize {
        self.index
    }

    /// Targets not yet handed out
    pub fn remaining(&self) -> &[EmotionLabel] {
        &self.items[self.index..]
    }

    /// Take the next target; the sequence empties itself when exhausted
    pub fn advance(&mut self) -> Option<EmotionLabel> {
        let next = self.items.get(self.index).copied()?;
        self.index += 1;
        if self.index >= self.items.len() {
            self.clear();
        }
        Some(next)
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.index = 0;
    }
}

/// Picks targets and durations for the game session
#[derive(Debug, Clone)]
pub struct PromptScheduler {
    timing: PromptTiming,
    rng: StdRng,
    sequence: EmotionSequence,
}

impl PromptScheduler {
    pub fn new(timing: PromptTiming, rng: StdRng) -> Self {
        PromptScheduler {
            timing,
            rng,
            sequence: EmotionSequence::default(),
        }
    }

    /// Deterministic scheduler for replays and tests
    pub fn seeded(timing: PromptTiming, seed: u64) -> Self {
        Self::new(timing, StdRng::seed_from_u64(seed))
    }

    pub fn from_entropy(timing: PromptTiming) -> Self {
        Self::new(timing, StdRng::from_entropy())
    }

    pub fn sequence(&self) -> &EmotionSequence {
        &self.sequence
    }

    /// Drop any pending sequence
    pub fn clear_sequence(&mut self) {
        self.sequence.clear();
    }

    /// Length of a sequence generated at `level`
    pub fn sequence_length(level: u32) -> usize {
        (SEQUENCE_BASE_LEN + (level / 4) as usize).min(SEQUENCE_MAX_LEN)
    }

    /// Issue the next prompt for `level`, stamped at `now`
    pub fn next_prompt(&mut self, level: u32, now: Instant) -> Prompt {
        if level > SEQUENCE_MIN_LEVEL && self.sequence.is_empty() {
            let len = Self::sequence_length(level);
            let items = (0..len).map(|_| self.random_emotion()).collect();
            self.sequence = EmotionSequence::new(items);
            debug!(level, len, "generated emotion sequence");
        }

        let target = match self.sequence.advance() {
            Some(target) => target,
            None => self.random_emotion(),
        };

        Prompt {
            target,
            start_time: now,
            duration: self.timing.duration_for(level),
        }
    }

    fn random_emotion(&mut self) -> EmotionLabel {
        EmotionLabel::ALL
            .choose(&mut self.rng)
            .copied()
            .unwrap_or(EmotionLabel::Neutral)
    }
}
