use anyhow::{Context, Result};
use clap::Parser;
use factions_core::{step_world, AllowAll, Checkpoint, ClaimHook, EventLog, TickContext};
use factions_sim::loader;
use factions_sim::script::Script;
use factions_sim::session::{SessionTracker, SimClock};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to a JSON config file (defaults are used when omitted)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Checkpoint to resume from
    #[arg(long)]
    checkpoint: Option<PathBuf>,

    /// JSONL script of timed logins, logouts and commands
    #[arg(long)]
    script: Option<PathBuf>,

    /// Number of ticks to run (defaults to the last scripted tick)
    #[arg(short, long)]
    ticks: Option<u64>,

    /// Wall-clock seconds that pass per tick
    #[arg(long, default_value_t = 1)]
    tick_seconds: u64,

    /// Epoch seconds at tick zero
    #[arg(long, default_value_t = 0)]
    start_time: u64,

    /// Write the final world to this checkpoint file
    #[arg(long)]
    save: Option<PathBuf>,

    /// Write committed territory and war events as JSONL
    #[arg(long)]
    events: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = std::str::FromStr::from_str(&args.log_level).unwrap_or(log::LevelFilter::Info);
    env_logger::Builder::new()
        .filter_level(level)
        .format_timestamp(None)
        .init();

    log::info!("Starting factions-sim...");

    let config = loader::load_config(args.config.as_deref())?;
    let mut state = loader::load_initial_state(args.checkpoint.as_deref(), &config)?;
    let mut script = match &args.script {
        Some(path) => loader::load_script(path)?,
        None => Script::default(),
    };

    let ticks = args.ticks.unwrap_or_else(|| {
        script
            .last_tick()
            .map_or(0, |last| last.saturating_sub(state.tick))
    });
    log::info!("Running {} ticks from tick {}", ticks, state.tick);

    let clock = SimClock {
        start_time: args.start_time,
        tick_seconds: args.tick_seconds,
    };

    let mut sessions = SessionTracker::new();
    // Restored players nobody saw log out start their inactivity clock now
    state.power.stamp_offline(sessions.online(), clock.at(state.tick));
    let mut event_log = EventLog::new();
    let mut allow_all = AllowAll;
    let hook: &mut dyn ClaimHook = if args.events.is_some() {
        &mut event_log
    } else {
        &mut allow_all
    };

    // Game Loop
    for _ in 0..ticks {
        let tick = state.tick.saturating_add(1);
        let now = clock.at(tick);

        let batch = script.take_through(tick);
        for player in batch.logins {
            sessions.login(&mut state, player, now);
        }
        for player in batch.logouts {
            sessions.logout(&mut state, player, now);
        }

        let mut ctx = TickContext {
            config: &config,
            hook: &mut *hook,
            oracle: sessions.online(),
            now,
        };
        let report = step_world(&mut state, &batch.inputs, &mut ctx);

        if !report.outcomes.is_empty() || !report.auto_claims.is_empty() || report.sweep.is_some()
        {
            println!("{}", serde_json::to_string(&report)?);
        }
    }

    log::info!(
        "Simulation finished at tick {} with {} factions, {} claimed chunks (checksum {:016x})",
        state.tick,
        state.factions.len(),
        state.ledger.len(),
        state.checksum()
    );
    for (faction, power) in state.ranked_factions() {
        log::debug!("{} power {} held {}", faction, power, state.held_chunks(faction));
    }

    if let Some(path) = &args.save {
        Checkpoint::capture(&state)
            .save(path)
            .with_context(|| format!("Failed to save checkpoint {}", path.display()))?;
        log::info!("Saved checkpoint to {:?}", path);
    }
    if let Some(path) = &args.events {
        event_log
            .save(path)
            .with_context(|| format!("Failed to write events {}", path.display()))?;
        log::info!("Wrote {} events to {:?}", event_log.events().len(), path);
    }

    Ok(())
}
