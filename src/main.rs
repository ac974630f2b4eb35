//! Mood Blaster - terminal host
//!
//! Single-player game loop at a fixed tick rate. Detection comes from a
//! landmark recording when one is given, otherwise from H/A/N keys.

use clap::Parser;
use mood_blaster::cli::{Display, HostAction, InputHandler};
use mood_blaster::config::{AppConfig, Profile};
use mood_blaster::facs::FrameDetection;
use mood_blaster::session::{GameSession, GameState, PromptScheduler};
use mood_blaster::source::{DetectionSource, ManualSource, ReplaySource};
use std::error::Error;
use std::fs::File;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "Mood Blaster")]
#[command(about = "Match the prompted emotion with your face before time runs out")]
struct Args {
    /// Path to a JSON config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Prompt duration schedule
    #[arg(short, long, value_enum, default_value = "standalone")]
    profile: Profile,

    /// Landmark recording (JSON lines) to use as the detector
    #[arg(short, long)]
    replay: Option<PathBuf>,

    /// Restart the recording when it ends
    #[arg(long = "loop")]
    looping: bool,

    /// Seed for prompt generation
    #[arg(short, long)]
    seed: Option<u64>,

    /// Write logs to this file (the terminal is busy with the game)
    #[arg(long)]
    log: Option<PathBuf>,
}

fn init_logging(log: Option<&PathBuf>) -> Result<(), Box<dyn Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match log {
        Some(path) => {
            let file = File::create(path)?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::sink)
                .init();
        }
    }
    Ok(())
}

/// Recording if it opens, keyboard otherwise
fn open_source(args: &Args, config: &AppConfig) -> Box<dyn DetectionSource> {
    if let Some(path) = &args.replay {
        match ReplaySource::open(path, args.looping) {
            Ok(source) => return Box::new(source),
            Err(e) => {
                warn!(error = %e, "detection unavailable, falling back to manual input");
                eprintln!("⚠ {} (using manual input)", e);
            }
        }
    }
    Box::new(ManualSource::new(config.host.manual_confidence))
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    init_logging(args.log.as_ref())?;

    let config = match AppConfig::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            warn!(error = %e, "using default configuration");
            eprintln!("⚠ {} (using defaults)", e);
            AppConfig::default()
        }
    };

    let timing = config.timing_for(args.profile);
    let scheduler = match args.seed.or(config.host.seed) {
        Some(seed) => PromptScheduler::seeded(timing, seed),
        None => PromptScheduler::from_entropy(timing),
    };
    let mut session = GameSession::new(config.game, scheduler);
    let mut source = open_source(&args, &config);
    let mut manual = source.accepts_injection();
    let mut source_name = source.name();
    info!(source = %source_name, profile = ?args.profile, "starting terminal host");

    let tick = Duration::from_secs_f64(1.0 / f64::from(config.host.tick_rate_hz.max(1)));

    let mut display = Display::alternate()?;
    let input = InputHandler::new(tick);

    let mut detection = FrameDetection::empty();

    // Event loop
    'game: loop {
        let tick_start = Instant::now();

        if session.state() == GameState::Playing {
            detection = match source.next_detection() {
                Ok(detection) => detection,
                Err(e) if source.is_exhausted() => {
                    info!(reason = %e, "detection source exhausted, switching to manual input");
                    source = Box::new(ManualSource::new(config.host.manual_confidence));
                    manual = true;
                    source_name = source.name();
                    FrameDetection::empty()
                }
                Err(e) => {
                    warn!(error = %e, kind = e.kind(), "detection failed this tick");
                    FrameDetection::empty()
                }
            };
            session.tick(tick_start);
            if session.state() == GameState::Playing {
                session.submit_detection(
                    detection.best_emotion,
                    detection.best_confidence,
                    tick_start,
                );
            }
        }

        display.render(
            &session.snapshot(tick_start),
            &detection,
            &source_name,
            manual,
        )?;

        // Spend the rest of the tick on input
        loop {
            let remaining = tick.saturating_sub(tick_start.elapsed());
            if remaining.is_zero() {
                break;
            }
            let Some(key) = input.read_key(remaining)? else {
                continue;
            };
            match InputHandler::action_for(&key) {
                Some(HostAction::Quit) => break 'game,
                Some(HostAction::Confirm) => {
                    if session.state() != GameState::Playing {
                        session.start(Instant::now());
                        detection = FrameDetection::empty();
                    }
                }
                Some(HostAction::Inject(emotion)) => {
                    if source.accepts_injection() {
                        source.inject(emotion);
                    }
                }
                None => {}
            }
        }
    }

    // Cleanup
    display.shutdown()?;

    let summary = session.snapshot(Instant::now());
    info!(
        score = summary.score,
        level = summary.level,
        max_streak = summary.max_streak,
        "host exiting"
    );

    // Summary
    println!("\n😃 Thanks for playing Mood Blaster!");
    println!(
        "📊 Score: {} | Level: {} | Matches: {} | Best streak: {} | Avg reaction: {:.2}s",
        summary.score,
        summary.level,
        summary.matches,
        summary.max_streak,
        summary.avg_reaction_time
    );

    Ok(())
}
