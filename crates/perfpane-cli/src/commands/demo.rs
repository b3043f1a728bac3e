//! `perfpane demo`: print random word lines under the overlay.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use clap::Args;
use perfpane_common::config::ProfilerConfig;
use rand::Rng;
use rand::seq::SliceRandom;

const WORDS_PATH: &str = "/usr/share/dict/words";
const MAX_WORDS_PER_LINE: usize = 30;
const FALLBACK_WORDS: &[&str] = &[
    "alpha", "bravo", "cache", "delta", "entropy", "fork", "gauge", "heap", "inode", "jitter",
    "kernel", "latency", "mutex", "nice", "offset", "page", "queue", "register", "steal", "thread",
    "uptime", "vector", "wait", "xfer", "yield", "zombie",
];

/// Arguments for the `demo` command.
#[derive(Args, Debug)]
pub struct DemoArgs {
    /// Seconds between lines.
    #[arg(long, default_value_t = 1.0)]
    pub interval: f64,

    /// Stop after this many lines instead of waiting for Ctrl+C.
    #[arg(long)]
    pub lines: Option<u64>,

    /// Word list, one word per line.
    #[arg(long)]
    pub words: Option<PathBuf>,
}

/// Executes the `demo` command.
///
/// # Errors
///
/// Returns an error if the word list cannot be read or the overlay fails.
pub fn execute(args: DemoArgs, config: ProfilerConfig) -> anyhow::Result<()> {
    anyhow::ensure!(
        args.interval.is_finite() && args.interval > 0.0,
        "--interval must be positive, got {}",
        args.interval
    );
    let words = load_words(args.words.as_deref())?;
    let interrupted = super::ctrl_c_channel()?;

    let mut profiler = super::start_overlay(config)?;
    let output = profiler.output();
    let interval = Duration::from_secs_f64(args.interval);
    let mut rng = rand::thread_rng();
    let mut printed: u64 = 0;

    while args.lines.is_none_or(|limit| printed < limit) {
        output.write(&random_line(&mut rng, &words));
        printed += 1;
        if interrupted.recv_timeout(interval).is_ok() {
            break;
        }
    }

    tracing::info!(printed, "demo finished");
    profiler.stop()?;
    Ok(())
}

fn load_words(path: Option<&Path>) -> anyhow::Result<Vec<String>> {
    let words: Vec<String> = match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read word list {}", path.display()))?
            .lines()
            .map(str::trim)
            .filter(|w| !w.is_empty())
            .map(str::to_owned)
            .collect(),
        None => std::fs::read_to_string(WORDS_PATH)
            .map(|text| text.lines().map(str::to_owned).collect())
            .unwrap_or_default(),
    };

    if words.is_empty() {
        anyhow::ensure!(path.is_none(), "word list is empty");
        return Ok(FALLBACK_WORDS.iter().map(|w| (*w).to_owned()).collect());
    }
    Ok(words)
}

/// One line of 1 to 30 random words, newline-terminated.
fn random_line<R: Rng>(rng: &mut R, words: &[String]) -> String {
    let count = rng.gen_range(1..=MAX_WORDS_PER_LINE);
    let mut line = (0..count)
        .filter_map(|_| words.choose(rng).map(String::as_str))
        .collect::<Vec<_>>()
        .join(" ");
    line.push('\n');
    line
}
