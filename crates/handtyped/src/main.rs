use std::{
    fs::File,
    io::{self, BufRead, BufReader},
    path::{Path, PathBuf},
};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use handtyped::{
    config::{Config, SinkKind},
    key::{KeySink, LogSink, WorkerSink, XdotoolSink},
    matcher::MatchPolicy,
    session::{Capture, Session},
    source::{JsonLinesSource, LandmarkSource},
    store::JsonFileStore,
};

/// Types keys when it recognizes recorded hand gestures.
///
/// Hand landmarks are read as JSON lines, one frame per line, from a file or from stdin.
#[derive(Parser, Debug)]
#[command(name = "handtyped", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// TOML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Bindings file (overrides config and $HANDTYPED_BINDINGS)
    #[arg(short, long, global = true)]
    bindings: Option<PathBuf>,

    /// Match threshold (overrides config and $HANDTYPED_THRESHOLD)
    #[arg(short, long, global = true)]
    threshold: Option<f32>,

    /// Which binding wins when several match
    #[arg(long, global = true, value_enum)]
    policy: Option<MatchPolicy>,

    /// Landmarks per hand the extractor emits (0 accepts any count)
    #[arg(long, global = true)]
    expected_landmarks: Option<usize>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Press the bound keys for recognized gestures
    Run {
        /// Landmark stream (default: stdin)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// How keys are pressed
        #[arg(short, long, value_enum)]
        sink: Option<SinkKind>,

        /// Label of the gesture that stops detection
        #[arg(short, long)]
        quit: Option<String>,
    },

    /// Record a gesture and bind it to a key
    Record {
        /// Name of the gesture
        #[arg(short, long)]
        label: String,

        /// Key to press, eg. `a`, `space` or `f5`
        #[arg(short, long)]
        key: String,

        /// Landmark stream (default: stdin)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Number of frames to try before giving up
        #[arg(short, long, default_value = "1")]
        attempts: u32,
    },

    /// List the recorded gestures
    List,

    /// Delete a recorded gesture
    Remove {
        /// Name of the gesture
        label: String,
    },
}

fn main() -> anyhow::Result<()> {
    handtyped::init_logger!();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    config.apply_env()?;
    if let Some(path) = cli.bindings {
        config.bindings_path = path;
    }
    if let Some(threshold) = cli.threshold {
        config.threshold = threshold;
    }
    if let Some(policy) = cli.policy {
        config.policy = policy;
    }
    if let Some(count) = cli.expected_landmarks {
        config.expected_landmarks = count;
    }
    log::debug!("{config:?}");

    match cli.command {
        Command::Run { input, sink, quit } => {
            if let Some(sink) = sink {
                config.key_sink = sink;
            }
            if quit.is_some() {
                config.quit_gesture = quit;
            }
            run(&config, input.as_deref())
        }
        Command::Record {
            label,
            key,
            input,
            attempts,
        } => record(&config, input.as_deref(), &label, &key, attempts),
        Command::List => list(&config),
        Command::Remove { label } => {
            let mut session = open_session(&config)?;
            if !session.remove(&label)? {
                bail!("no gesture named '{label}'");
            }
            println!("removed '{label}'");
            Ok(())
        }
    }
}

fn open_session(config: &Config) -> anyhow::Result<Session<JsonFileStore>> {
    Session::open(config, JsonFileStore::new(&config.bindings_path))
}

fn open_source(input: Option<&Path>) -> anyhow::Result<JsonLinesSource<Box<dyn BufRead>>> {
    let reader: Box<dyn BufRead> = match input {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("failed to open {}", path.display()))?;
            Box::new(BufReader::new(file))
        }
        None => Box::new(io::stdin().lock()),
    };
    Ok(JsonLinesSource::new(reader))
}

fn run(config: &Config, input: Option<&Path>) -> anyhow::Result<()> {
    let mut session = open_session(config)?;
    if session.bindings().is_empty() {
        log::warn!("no gestures recorded yet, nothing will be pressed");
    }

    let mut source = open_source(input)?;
    let mut sink: Box<dyn KeySink> = match config.key_sink {
        SinkKind::Log => Box::new(LogSink),
        SinkKind::Xdotool => Box::new(WorkerSink::spawn(XdotoolSink::default())?),
    };

    let summary = session.run(&mut source, sink.as_mut())?;
    log::info!(
        "processed {} frames, pressed {} keys",
        summary.stats.frames,
        summary.presses
    );
    Ok(())
}

fn record(
    config: &Config,
    input: Option<&Path>,
    label: &str,
    key: &str,
    attempts: u32,
) -> anyhow::Result<()> {
    let mut session = open_session(config)?;
    let mut source = open_source(input)?;

    for _ in 0..attempts.max(1) {
        let Some(frame) = source.next_frame()? else {
            break;
        };
        match session.capture(&frame, label, key)? {
            Capture::Saved { label, replaced } => {
                let verb = if replaced { "replaced" } else { "saved" };
                println!("{verb} '{label}' -> {key}");
                return Ok(());
            }
            Capture::NoHandDetected => println!("No hand detected. Try again."),
        }
    }

    bail!("no hand detected, '{label}' was not recorded")
}

fn list(config: &Config) -> anyhow::Result<()> {
    let session = open_session(config)?;
    if session.bindings().is_empty() {
        println!("no gestures recorded in {}", config.bindings_path.display());
        return Ok(());
    }
    for binding in session.bindings() {
        println!(
            "{}: {} ({} landmarks)",
            binding.label(),
            binding.key(),
            binding.pose().len()
        );
    }
    Ok(())
}
