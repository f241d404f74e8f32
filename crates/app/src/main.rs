use std::fmt;
use std::path::PathBuf;

use lab_core::model::Stage;
use lab_core::titration::TitrantStep;
use services::{Clock, LabLoop, LabService, LabSnapshot};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod command;
mod config;
mod render;

use command::{LabCommand, print_help};
use render::OutputFormat;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    EmptyConfigPath,
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::EmptyConfigPath => write!(f, "--config path must not be empty"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- [--config <file.toml>] [--json]");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  LAB_CONFIG, LAB_CELEBRATION_MS, LAB_SHAKE_MS, LAB_QUIZ_ADVANCE_MS, RUST_LOG");
}

struct Args {
    config: Option<PathBuf>,
    format: OutputFormat,
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut config = std::env::var_os(config::CONFIG_ENV).map(PathBuf::from);
        let mut format = OutputFormat::Text;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--config" => {
                    let value = require_value(args, "--config")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::EmptyConfigPath);
                    }
                    config = Some(PathBuf::from(value));
                }
                "--json" => format = OutputFormat::Json,
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self { config, format })
    }
}

/// Print snapshots published by deferred effects.
///
/// Text output only reports stage and question changes; JSON output emits every snapshot.
async fn follow(mut updates: watch::Receiver<LabSnapshot>, format: OutputFormat) {
    let mut last = progress(&updates.borrow_and_update());
    while updates.changed().await.is_ok() {
        let snap = updates.borrow_and_update().clone();
        let now = progress(&snap);
        if format == OutputFormat::Text && now == last {
            continue;
        }
        last = now;
        match format.snapshot(&snap) {
            Ok(rendered) => println!("{rendered}"),
            Err(err) => tracing::warn!(%err, "failed to render snapshot"),
        }
    }
}

fn progress(snap: &LabSnapshot) -> (Stage, Option<usize>) {
    (snap.stage, snap.quiz.as_ref().map(|quiz| quiz.number))
}

/// Apply one command. Returns a status line for the learner, if any.
fn execute(lab: &LabLoop, command: LabCommand, format: OutputFormat) -> Option<String> {
    let ignored = |rejection: lab_core::model::Rejection| format!("ignored: {rejection}");
    match command {
        LabCommand::Predict(raw) => Some(
            lab.submit_prediction(&raw)
                .map_or_else(ignored, |_| format!("prediction recorded: {} mL", raw.trim())),
        ),
        LabCommand::Acid => Some(
            lab.add_acid()
                .map_or_else(ignored, |_| "acid poured into the beaker".to_owned()),
        ),
        LabCommand::Indicator => Some(
            lab.add_indicator()
                .map_or_else(ignored, |_| "indicator added".to_owned()),
        ),
        LabCommand::Fast => Some(
            lab.add_titrant(TitrantStep::FastStream)
                .map_or_else(ignored, |reading| render::reading_text(&reading)),
        ),
        LabCommand::Drop => Some(
            lab.add_titrant(TitrantStep::Dropwise)
                .map_or_else(ignored, |reading| render::reading_text(&reading)),
        ),
        LabCommand::Quiz => lab.advance_to_quiz().err().map(ignored),
        LabCommand::Answer(text) => {
            lab.set_answer_text(text.clone());
            Some(
                lab.submit_answer(&text)
                    .map_or_else(ignored, |outcome| outcome.message),
            )
        }
        LabCommand::Reset => {
            lab.reset();
            None
        }
        LabCommand::Show => {
            match format.snapshot(&lab.snapshot()) {
                Ok(rendered) => println!("{rendered}"),
                Err(err) => tracing::warn!(%err, "failed to render snapshot"),
            }
            None
        }
        LabCommand::Chart => Some(render::chart_text()),
        LabCommand::Curve => Some(render::curve_text(&lab.snapshot().history)),
        LabCommand::Help => {
            print_help();
            None
        }
        LabCommand::Quit => None,
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let parsed = Args::parse(&mut std::env::args().skip(1)).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let settings = config::load_settings(parsed.config.as_deref(), |name| {
        std::env::var(name).ok()
    })?;
    info!(?settings, config = ?parsed.config, "lab settings resolved");

    let lab = LabLoop::new(
        LabService::new(Clock::default_clock(), settings),
        Handle::current(),
    );
    let follower = tokio::spawn(follow(lab.subscribe(), parsed.format));

    println!("{}", parsed.format.snapshot(&lab.snapshot())?);
    if parsed.format == OutputFormat::Text {
        println!("Type `help` for commands.");
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let command = match LabCommand::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(err) => {
                eprintln!("{err}");
                continue;
            }
        };
        if command == LabCommand::Quit {
            break;
        }
        if let Some(message) = execute(&lab, command, parsed.format) {
            // Keep stdout machine-readable in JSON mode.
            match parsed.format {
                OutputFormat::Text => println!("{message}"),
                OutputFormat::Json => eprintln!("{message}"),
            }
        }
    }

    follower.abort();
    info!("lab closed");
    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
