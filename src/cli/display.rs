//! Terminal display and UI rendering
//!
//! Features:
//! - Menu, in-game HUD and game-over screens
//! - Target emotion with per-emotion colour
//! - Live detection readout (label, confidence, face count)

use crossterm::terminal::{EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{
    cursor, execute,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{self, ClearType},
};
use std::io::{stdout, Write};

use crate::facs::{EmotionLabel, FrameDetection};
use crate::session::{GameState, Snapshot};

type DisplayResult = Result<(), Box<dyn std::error::Error>>;

fn emotion_color(emotion: EmotionLabel) -> Color {
    match emotion {
        EmotionLabel::Happy => Color::Green,
        EmotionLabel::Angry => Color::Red,
        EmotionLabel::Neutral => Color::Blue,
    }
}

/// One `[x0,y0 x1,y1]` entry per detected face, in pixels
fn face_boxes(detection: &FrameDetection) -> String {
    detection
        .face_boxes()
        .map(|(lo, hi)| format!("[{:.0},{:.0} {:.0},{:.0}]", lo.x, lo.y, hi.x, hi.y))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Terminal display manager
pub struct Display {
    /// Screen drawn last; a change triggers a full clear
    last_state: Option<GameState>,
}

impl Display {
    /// Take over the terminal: alternate screen plus raw mode
    pub fn alternate() -> Result<Self, Box<dyn std::error::Error>> {
        Self::enter(terminal::enable_raw_mode)
    }

    /// Enter the alternate screen, then run `raw_mode`; undo the screen if it fails
    fn enter(
        raw_mode: impl FnOnce() -> std::io::Result<()>,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        execute!(stdout(), EnterAlternateScreen, cursor::Hide)?;
        if let Err(e) = raw_mode() {
            let _ = execute!(stdout(), LeaveAlternateScreen, cursor::Show);
            return Err(e.into());
        }
        Ok(Display { last_state: None })
    }

    /// Clear screen
    pub fn clear(&self) -> DisplayResult {
        execute!(stdout(), terminal::Clear(ClearType::All), cursor::MoveTo(0, 0))?;
        Ok(())
    }

    /// Draw whichever screen matches the snapshot
    pub fn render(
        &mut self,
        snapshot: &Snapshot,
        detection: &FrameDetection,
        source: &str,
        manual: bool,
    ) -> DisplayResult {
        if self.last_state != Some(snapshot.state) {
            self.clear()?;
            self.last_state = Some(snapshot.state);
        }
        match snapshot.state {
            GameState::Menu => self.show_menu(source, manual),
            GameState::Playing => self.show_game(snapshot, detection, manual),
            GameState::GameOver => self.show_game_over(snapshot),
        }
    }

    /// Title screen with controls
    pub fn show_menu(&self, source: &str, manual: bool) -> DisplayResult {
        let mut stdout = stdout();
        execute!(
            stdout,
            cursor::MoveTo(0, 1),
            SetForegroundColor(Color::Magenta),
            Print("MOOD BLASTER"),
            ResetColor,
            cursor::MoveTo(0, 3),
            Print("Match the emotion on screen before time runs out."),
            cursor::MoveTo(0, 4),
            Print(format!("Detection: {}", source)),
            terminal::Clear(ClearType::UntilNewLine),
        )?;
        self.show_help(6, manual)?;
        stdout.flush()?;
        Ok(())
    }

    /// In-game HUD
    pub fn show_game(
        &self,
        snapshot: &Snapshot,
        detection: &FrameDetection,
        manual: bool,
    ) -> DisplayResult {
        let mut stdout = stdout();

        execute!(
            stdout,
            cursor::MoveTo(0, 1),
            SetForegroundColor(Color::Magenta),
            Print(format!(
                "Score: {}  |  Level: {}  |  Streak: {}  |  Lives: ",
                snapshot.score, snapshot.level, snapshot.streak
            )),
            SetForegroundColor(Color::Red),
            Print("♥ ".repeat(snapshot.lives as usize)),
            ResetColor,
            terminal::Clear(ClearType::UntilNewLine),
        )?;

        execute!(stdout, cursor::MoveTo(0, 3), Print("Show me: "))?;
        if let Some(target) = snapshot.target_emotion {
            execute!(
                stdout,
                SetForegroundColor(emotion_color(target)),
                Print(target.as_str().to_uppercase()),
                ResetColor,
            )?;
        }
        if snapshot.sequence_remaining > 0 {
            execute!(
                stdout,
                SetForegroundColor(Color::Yellow),
                Print(format!("   (Simon says: {} more)", snapshot.sequence_remaining)),
                ResetColor,
            )?;
        }
        execute!(stdout, terminal::Clear(ClearType::UntilNewLine))?;

        let time_color = if snapshot.time_left > 1.0 {
            Color::Green
        } else {
            Color::Red
        };
        execute!(
            stdout,
            cursor::MoveTo(0, 4),
            Print("Time: "),
            SetForegroundColor(time_color),
            Print(format!("{:.1}s", snapshot.time_left)),
            ResetColor,
            terminal::Clear(ClearType::UntilNewLine),
        )?;

        execute!(stdout, cursor::MoveTo(0, 6), Print("Detected: "))?;
        match detection.best_emotion {
            Some(emotion) => execute!(
                stdout,
                SetForegroundColor(emotion_color(emotion)),
                Print(emotion.as_str()),
                ResetColor,
                Print(format!(" ({:.0}%)", detection.best_confidence * 100.0)),
            )?,
            None => execute!(stdout, SetForegroundColor(Color::DarkGrey), Print("-"), ResetColor)?,
        }
        if !detection.faces.is_empty() {
            execute!(stdout, Print(format!("  |  Faces: {}", detection.faces.len())))?;
        }
        execute!(
            stdout,
            terminal::Clear(ClearType::UntilNewLine),
            cursor::MoveTo(0, 7),
            SetForegroundColor(Color::DarkGrey),
            Print(face_boxes(detection)),
            ResetColor,
            terminal::Clear(ClearType::UntilNewLine),
        )?;

        self.show_help(8, manual)?;
        stdout.flush()?;
        Ok(())
    }

    /// Final stats
    pub fn show_game_over(&self, snapshot: &Snapshot) -> DisplayResult {
        let mut stdout = stdout();
        execute!(
            stdout,
            cursor::MoveTo(0, 1),
            SetForegroundColor(Color::Red),
            Print("GAME OVER"),
            ResetColor,
            cursor::MoveTo(0, 3),
            Print(format!("Final score: {}", snapshot.score)),
            cursor::MoveTo(0, 4),
            Print(format!("Level reached: {}", snapshot.level)),
            cursor::MoveTo(0, 5),
            Print(format!("Emotions matched: {}", snapshot.matches)),
            cursor::MoveTo(0, 6),
            Print(format!(
                "Average reaction: {:.2}s",
                snapshot.avg_reaction_time
            )),
            cursor::MoveTo(0, 7),
            Print(format!("Best streak: {}", snapshot.max_streak)),
            cursor::MoveTo(0, 9),
            SetForegroundColor(Color::DarkGrey),
            Print("SPACE to play again  |  ESC to quit"),
            ResetColor,
        )?;
        stdout.flush()?;
        Ok(())
    }

    /// Show help text
    fn show_help(&self, row: u16, manual: bool) -> DisplayResult {
        let mut stdout = stdout();
        execute!(
            stdout,
            cursor::MoveTo(0, row),
            SetForegroundColor(Color::DarkGrey),
            Print("SPACE to start  |  ESC to quit"),
        )?;
        if manual {
            execute!(
                stdout,
                cursor::MoveTo(0, row + 1),
                Print("H = happy, A = angry, N = neutral"),
            )?;
        }
        execute!(stdout, ResetColor)?;
        Ok(())
    }

    /// Reset terminal state and cleanup
    pub fn shutdown(&self) -> DisplayResult {
        execute!(stdout(), LeaveAlternateScreen, cursor::Show)?;
        terminal::disable_raw_mode()?;
        Ok(())
    }
}

impl Drop for Display {
    fn drop(&mut self) {
        // Best effort cleanup
        let _ = self.shutdown();
    }
}
