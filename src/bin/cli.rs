//! Levitate CLI - write tuning files and run the scripted sandbox

use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use levitate::config::TuningConfig;
use levitate::game::constants::physics as consts;
use levitate::game::demo::{self, DemoScript};
use levitate::game::{GameEvent, GameSession};
use levitate::logging;

#[derive(Parser)]
#[command(name = "levitate")]
#[command(about = "Head-gesture levitation sandbox", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the default tuning file
    Init {
        /// Where to write it
        #[arg(default_value = "tuning.toml")]
        path: PathBuf,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Run the scripted demo arena and print tick events
    Simulate {
        /// Tuning file (defaults are used when omitted)
        #[arg(short, long, env = "LEVITATE_CONFIG")]
        config: Option<PathBuf>,
        /// Number of fixed ticks to simulate
        #[arg(short, long, default_value = "400")]
        ticks: u64,
        /// Seed for the session RNG
        #[arg(short, long, default_value = "7")]
        seed: u64,
        /// Print one JSON object per event
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = logging::init_logging(cli.verbose) {
        eprintln!("Warning: logging unavailable: {}", e);
    }

    let result = match cli.command {
        Commands::Init { path, force } => init_tuning(&path, force),
        Commands::Simulate {
            config,
            ticks,
            seed,
            json,
        } => simulate(config.as_deref(), ticks, seed, json),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

// =============================================================================
// Init Command
// =============================================================================

fn init_tuning(path: &Path, force: bool) -> Result<(), String> {
    if path.exists() && !force {
        return Err(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        ));
    }
    let content = TuningConfig::default()
        .to_toml_string()
        .map_err(|e| e.to_string())?;
    std::fs::write(path, content)
        .map_err(|e| format!("Failed to write {}: {}", path.display(), e))?;
    println!("Wrote default tuning to {}", path.display());
    Ok(())
}

// =============================================================================
// Simulate Command
// =============================================================================

#[derive(Serialize)]
struct EventLine<'a> {
    tick: u64,
    time: f32,
    #[serde(flatten)]
    event: &'a GameEvent,
}

fn simulate(config_path: Option<&Path>, ticks: u64, seed: u64, json: bool) -> Result<(), String> {
    let config = match config_path {
        Some(path) => TuningConfig::from_file(path).map_err(|e| e.to_string())?,
        None => TuningConfig::default(),
    };

    let mut session = GameSession::new(config, seed);
    let arena = demo::build_arena(&mut session);
    let mut script = DemoScript::new();

    if !json {
        println!(
            "Arena: {} walls, {} crates in view, {} to the side, clusters {:?}",
            arena.walls.len(),
            arena.crates_in_view.len(),
            arena.side_crates.len(),
            arena.clusters
        );
        println!(
            "Script: nod at tick {}, jerk at tick {}",
            demo::NOD_START_TICK,
            demo::JERK_START_TICK
        );
    }

    let dt = consts::TIMESTEP;
    for _ in 0..ticks {
        session.set_player_rig(script.next_rig(dt));
        let tick = session.tick_count();
        for event in session.tick(dt) {
            if json {
                let line = EventLine {
                    tick,
                    time: session.elapsed(),
                    event: &event,
                };
                let text = serde_json::to_string(&line).map_err(|e| e.to_string())?;
                println!("{}", text);
            } else {
                println!("[{:>5}] {:>7.2}s  {}", tick, session.elapsed(), describe(&event));
            }
        }
    }

    if !json {
        println!(
            "Done after {:.2}s: {} agents alive in {} clusters, {} dead bodies, {} pending removals",
            session.elapsed(),
            session.agent_count(),
            session.clusters().len(),
            session.dead_body_count(),
            session.pending_removals()
        );
    }
    Ok(())
}

fn describe(event: &GameEvent) -> String {
    match event {
        GameEvent::Grabbed { entities } => format!("grabbed {:?}", entities),
        GameEvent::Thrown {
            entities,
            target,
            cluster,
        } => match cluster {
            Some(c) => format!("threw {:?} at cluster {} {:?}", entities, c, target),
            None => format!("threw {:?} toward {:?}", entities, target),
        },
        GameEvent::AgentKilled {
            agent,
            cluster,
            killer,
            dead_body,
        } => format!(
            "agent {} of cluster {} killed by {} (body {})",
            agent, cluster, killer, dead_body
        ),
        GameEvent::Hit { recent_hits } => format!("hit ({} recent)", recent_hits),
        GameEvent::Combo { recent_hits } => format!("COMBO x{}", recent_hits),
        GameEvent::Despawned { entity } => format!("despawned {}", entity),
        GameEvent::ClusterEmptied { cluster } => format!("cluster {} wiped out", cluster),
    }
}
