//! Stage CLI - run block programs headlessly
//!
//! Loads a scene (or the default two sprites), runs it for a while and
//! prints collisions, speech and final poses.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use blockstage::runtime::scene::SceneSpec;
use blockstage::runtime::{Stage, StageConfig, StageEvent};
use clap::{Parser, Subcommand};
use tokio::sync::broadcast::error::RecvError;

#[derive(Parser)]
#[command(name = "stage-cli")]
#[command(about = "Run block programs against a 2D stage", long_about = None)]
struct Cli {
    /// Optional JSON config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scene with real tick timers
    Run {
        /// Scene file (JSON); defaults to the two built-in sprites
        #[arg(long)]
        scene: Option<PathBuf>,

        /// How long to run, in milliseconds
        #[arg(long, default_value = "2000")]
        duration_ms: u64,

        /// Reset actors to their baseline afterwards
        #[arg(long)]
        reset: bool,
    },

    /// Step a scene a fixed number of ticks without timers
    Step {
        /// Scene file (JSON)
        #[arg(long)]
        scene: PathBuf,

        /// Number of ticks
        #[arg(short, long, default_value = "10")]
        ticks: usize,
    },

    /// Print the default configuration as JSON
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => StageConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => StageConfig::default(),
    };

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(config.log_level().into()),
        )
        .init();

    match cli.command {
        Commands::Run {
            scene,
            duration_ms,
            reset,
        } => {
            let scene = load_scene(scene.as_ref())?;
            let world = scene.build(&config)?;
            let mut stage = Stage::from_world(config, world);
            let mut events = stage.subscribe();

            stage.run()?;
            let deadline = tokio::time::sleep(Duration::from_millis(duration_ms));
            tokio::pin!(deadline);

            loop {
                tokio::select! {
                    _ = &mut deadline => break,
                    event = events.recv() => match event {
                        Ok(event) => print_event(&event),
                        Err(RecvError::Lagged(skipped)) => {
                            tracing::warn!(skipped, "event receiver lagged");
                        }
                        Err(RecvError::Closed) => break,
                    },
                }
            }

            stage.shutdown().await;
            if reset {
                stage.reset();
            }
            print_poses(&stage);
        }

        Commands::Step { scene, ticks } => {
            let scene = load_scene(Some(&scene))?;
            let mut world = scene.build(&config)?;

            world.begin_run();
            for tick in 1..=ticks {
                for event in world.tick_all() {
                    print!("tick {tick}: ");
                    print_event(&event);
                }
            }
            world.end_run();

            let stage = Stage::from_world(config, world);
            print_poses(&stage);
        }

        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }

    Ok(())
}

fn load_scene(path: Option<&PathBuf>) -> anyhow::Result<SceneSpec> {
    match path {
        Some(path) => {
            SceneSpec::load(path).with_context(|| format!("loading scene {}", path.display()))
        }
        None => Ok(SceneSpec::default()),
    }
}

fn print_event(event: &StageEvent) {
    match event {
        StageEvent::Collision(collision) => println!(
            "collision: {} <-> {} at ({:.1}, {:.1}), programs swapped",
            collision.first, collision.second, collision.midpoint.0, collision.midpoint.1
        ),
        StageEvent::Said {
            actor,
            message,
            seconds: Some(seconds),
        } => println!("{actor} says \"{message}\" for {seconds}s"),
        StageEvent::Said { actor, message, .. } => println!("{actor} says \"{message}\""),
        StageEvent::RunStarted { actors } => println!("run started ({actors} actors)"),
        StageEvent::RunStopped => println!("run stopped"),
        StageEvent::Reset => println!("reset"),
    }
}

fn print_poses(stage: &Stage) {
    let snapshot = stage.snapshot();
    println!("{} blocks placed", snapshot.total_blocks);
    for actor in snapshot.actors {
        println!(
            "  {:<12} x={:>8.2} y={:>8.2} heading={:>6.1}",
            actor.name, actor.pose.x, actor.pose.y, actor.pose.heading
        );
    }
}
