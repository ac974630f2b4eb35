//! Mood Blaster - network host
//!
//! Serves one shared game session over length-prefixed JSON frames.
//! Image analysis is enabled when a landmark helper is configured.

use clap::Parser;
use mood_blaster::config::{AppConfig, HelperCommand, Profile};
use mood_blaster::facs::helper::LandmarkHelper;
use mood_blaster::facs::LandmarkProvider;
use mood_blaster::server::GameServer;
use mood_blaster::session::{GameSession, PromptScheduler, SharedSession};
use std::error::Error;
use std::net::TcpListener;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "Mood Blaster Server")]
#[command(about = "Host a Mood Blaster session over TCP")]
struct Args {
    /// Path to a JSON config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to listen on (overrides config)
    #[arg(short, long)]
    bind: Option<String>,

    /// Prompt duration schedule
    #[arg(short, long, value_enum, default_value = "web")]
    profile: Profile,

    /// Landmark helper program (overrides config)
    #[arg(long)]
    helper: Option<String>,

    /// Argument passed to the helper; repeatable
    #[arg(long = "helper-arg")]
    helper_args: Vec<String>,

    /// Milliseconds to wait for one helper answer (overrides config)
    #[arg(long)]
    helper_timeout_ms: Option<u64>,

    /// Seed for prompt generation
    #[arg(short, long)]
    seed: Option<u64>,
}

fn spawn_helper(
    command: &HelperCommand,
    timeout: Duration,
) -> Option<Box<dyn LandmarkProvider + Send>> {
    match LandmarkHelper::spawn(&command.program, &command.args, timeout) {
        Ok(helper) => Some(Box::new(helper)),
        Err(e) => {
            warn!(error = %e, "image analysis disabled");
            None
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = match AppConfig::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            warn!(error = %e, "using default configuration");
            AppConfig::default()
        }
    };

    let helper = match args.helper {
        Some(program) => Some(HelperCommand {
            program,
            args: args.helper_args,
        }),
        None => config.server.helper.clone(),
    };
    let timeout = args
        .helper_timeout_ms
        .map(Duration::from_millis)
        .unwrap_or_else(|| config.server.helper_timeout());
    let provider = helper.as_ref().and_then(|c| spawn_helper(c, timeout));

    let timing = config.timing_for(args.profile);
    let scheduler = match args.seed.or(config.host.seed) {
        Some(seed) => PromptScheduler::seeded(timing, seed),
        None => PromptScheduler::from_entropy(timing),
    };
    let session = SharedSession::new(GameSession::new(config.game, scheduler));

    let server = GameServer::new(
        session,
        provider,
        config.host.manual_confidence,
        config.server.max_frame_bytes,
    );
    info!(
        analysis = server.can_analyze(),
        profile = ?args.profile,
        "game server ready"
    );

    let bind = args.bind.unwrap_or_else(|| config.server.bind.clone());
    let listener = TcpListener::bind(&bind)?;
    Arc::new(server).serve(listener)?;
    Ok(())
}
