//! Suggestion-to-text reconciler CLI.
//!
//! Replays recorded suggestion frames (one JSON object per line) against an
//! original document and prints the corrected document to stdout.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use reconciler::core::classifier::classify_frame;
use reconciler::core::types::SuggestionFrame;
use reconciler::core::walker::correction_groups;
use reconciler::error::ReconcileError;
use reconciler::exit_codes;
use reconciler::io::config::{ReconcileConfig, load_config, write_config};
use reconciler::io::frames::{DEFAULT_CHANNEL_CAPACITY, channel, spawn_jsonl_reader};
use reconciler::logging;
use reconciler::looping::reconcile_passes;

#[derive(Parser)]
#[command(
    name = "reconciler",
    version,
    about = "Apply correction-service suggestion frames to a document"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Reconcile a document against a JSONL file of frames.
    Apply {
        /// Original document.
        #[arg(long)]
        text: PathBuf,
        /// Frames, one JSON object per line.
        #[arg(long)]
        frames: PathBuf,
        /// TOML config (defaults apply when omitted).
        #[arg(long)]
        config: Option<PathBuf>,
        /// Replay the frames this many times, each over the previous output.
        #[arg(long, default_value_t = 1)]
        passes: u32,
        /// Print per-pass counters as JSON to stderr.
        #[arg(long)]
        stats: bool,
    },
    /// Print how each frame in a JSONL file is classified.
    Classify {
        #[arg(long)]
        frames: PathBuf,
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Write a config file holding the default settings.
    InitConfig {
        #[arg(long, default_value = "reconciler.toml")]
        path: PathBuf,
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() {
    logging::init();
    let code = match run().await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{:#}", err);
            exit_codes::INVALID
        }
    };
    std::process::exit(code);
}

async fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Apply {
            text,
            frames,
            config,
            passes,
            stats,
        } => cmd_apply(&text, frames, config.as_deref(), passes, stats).await,
        Command::Classify { frames, config } => cmd_classify(&frames, config.as_deref()),
        Command::InitConfig { path, force } => cmd_init_config(&path, force),
    }
}

async fn cmd_apply(
    text_path: &Path,
    frames_path: PathBuf,
    config_path: Option<&Path>,
    passes: u32,
    stats: bool,
) -> Result<i32> {
    if passes == 0 {
        bail!("--passes must be >= 1");
    }
    let cfg = resolve_config(config_path)?;
    if !frames_path.exists() {
        bail!("frames file not found: {}", frames_path.display());
    }
    let original = fs::read_to_string(text_path)
        .with_context(|| format!("read {}", text_path.display()))?;

    let outcome = reconcile_passes(original, passes, &cfg, |_pass| {
        let (sender, receiver) = channel(DEFAULT_CHANNEL_CAPACITY);
        spawn_jsonl_reader(frames_path.clone(), sender);
        receiver.into_stream()
    })
    .await;

    match outcome {
        Ok(outcomes) => {
            if stats {
                for (index, done) in outcomes.iter().enumerate() {
                    let counters = serde_json::to_string(&done.stats).context("serialize stats")?;
                    eprintln!("pass {}: {}", index + 1, counters);
                }
            }
            let text = outcomes.last().map(|done| done.text.as_str()).unwrap_or("");
            write_stdout(text)?;
            Ok(exit_codes::OK)
        }
        Err(failure) => {
            if stats {
                let counters = serde_json::to_string(&failure.stats).context("serialize stats")?;
                eprintln!("failed pass: {}", counters);
            }
            write_stdout(&failure.partial_text)?;
            eprintln!("reconcile failed: {}", failure.error);
            Ok(match failure.error {
                ReconcileError::Corruption { .. } => exit_codes::CORRUPTION,
                _ => exit_codes::TRANSPORT,
            })
        }
    }
}

fn cmd_classify(frames_path: &Path, config_path: Option<&Path>) -> Result<i32> {
    let cfg = resolve_config(config_path)?;
    let contents =
        fs::read(frames_path).with_context(|| format!("read {}", frames_path.display()))?;
    for (index, line) in contents.split(|byte| *byte == b'\n').enumerate() {
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }
        let line_no = index + 1;
        match classify_frame(line, &cfg.too_small_status) {
            Ok(decoded) => {
                let id = decoded.message_id.as_deref().unwrap_or("-");
                match decoded.frame {
                    SuggestionFrame::Progress => println!("line {line_no}: id={id} progress"),
                    SuggestionFrame::Terminal { scores, status } => println!(
                        "line {line_no}: id={id} terminal scores={} status={}",
                        scores.len(),
                        status.as_deref().unwrap_or("-")
                    ),
                    SuggestionFrame::SuggestionTree { rows } => println!(
                        "line {line_no}: id={id} suggestion rows={} groups={}",
                        rows.len(),
                        correction_groups(&rows).len()
                    ),
                }
            }
            Err(err) => println!("line {line_no}: {err}"),
        }
    }
    Ok(exit_codes::OK)
}

fn cmd_init_config(path: &Path, force: bool) -> Result<i32> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    write_config(path, &ReconcileConfig::default())?;
    println!("wrote {}", path.display());
    Ok(exit_codes::OK)
}

/// Explicit config paths must exist; without one, defaults apply.
fn resolve_config(path: Option<&Path>) -> Result<ReconcileConfig> {
    match path {
        Some(path) => {
            if !path.exists() {
                bail!("config not found: {}", path.display());
            }
            load_config(path)
        }
        None => {
            let cfg = ReconcileConfig::default();
            cfg.validate()?;
            Ok(cfg)
        }
    }
}

fn write_stdout(text: &str) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(text.as_bytes()).context("write stdout")?;
    stdout.flush().context("flush stdout")?;
    Ok(())
}
