use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use log::{info, warn};

use inattention::{AttentionMonitor, Config, Frame, Worker};

/// Builds an attention report from a JSON-lines stream of pose observations.
#[derive(Parser, Debug)]
#[command(name = "attention_report", version)]
struct Opts {
    /// One frame per line: {"index": .., "observations": [..]}
    input: PathBuf,

    #[arg(long, default_value_t = 30.0)]
    fps: f64,

    /// JSON file with threshold overrides
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(short, long)]
    threshold: Option<i32>,

    #[arg(short, long)]
    skip_frames: Option<u32>,

    /// Ignore frames at or beyond this index
    #[arg(long)]
    max_frames: Option<u64>,

    /// Write one event row per line
    #[arg(long)]
    events_out: Option<PathBuf>,

    #[arg(long)]
    summary_out: Option<PathBuf>,
}

fn parse_frame(line: std::io::Result<String>, lineno: usize) -> Option<Frame> {
    let line = match line {
        Ok(line) => line,
        Err(err) => {
            warn!("line {}: read failed: {}", lineno, err);
            return None;
        }
    };

    if line.trim().is_empty() {
        return None;
    }

    match serde_json::from_str(&line) {
        Ok(frame) => Some(frame),
        Err(err) => {
            warn!("line {}: wrong format: {}", lineno, err);
            None
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let opts = Opts::parse();

    let mut config = match &opts.config {
        Some(path) => Config::from_json_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => Config::default(),
    };

    if let Some(threshold) = opts.threshold {
        config.attention_score_threshold = threshold;
    }

    if let Some(skip) = opts.skip_frames {
        config.skip_frames = skip;
    }

    let monitor = AttentionMonitor::new(config, opts.fps)?;

    let input = File::open(&opts.input)
        .with_context(|| format!("opening {}", opts.input.display()))?;

    let max_frames = opts.max_frames.unwrap_or(u64::MAX);
    let frames = BufReader::new(input)
        .lines()
        .enumerate()
        .filter_map(|(i, line)| parse_frame(line, i + 1))
        .take_while(move |frame| frame.index < max_frames);

    let worker = Worker::spawn(monitor, frames);

    // channel closes when the worker finishes
    for p in worker.progress().iter() {
        info!(
            "frame {}: {} processed, {} events",
            p.frame_index, p.processed, p.recorded
        );
    }

    let report = worker.join()?;

    print!("{}", report.summary);

    if let Some(path) = &opts.events_out {
        let mut out = BufWriter::new(File::create(path)?);
        for row in report.rows() {
            serde_json::to_writer(&mut out, &row)?;
            writeln!(out)?;
        }
        out.flush()?;

        info!("{} events written to {}", report.events.len(), path.display());
    }

    if let Some(path) = &opts.summary_out {
        let out = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(out, &report.summary)?;

        info!("summary written to {}", path.display());
    }

    Ok(())
}
