//! Deadline-bounded execution of external query tools.
//!
//! A provider command that hangs must not stall the sampling loop for more
//! than one provider timeout, so the child is polled against a deadline and
//! killed when it expires.

use std::io::Read;
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

use perfpane_common::error::{PerfpaneError, Result};
use perfpane_common::types::TextEncoding;

/// How often a running child is polled for exit.
const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Runs `program` with `args` and returns its decoded standard output.
///
/// Standard error is discarded. The output is expected to be small (a few
/// lines); it is read after the child exits.
///
/// # Errors
///
/// Returns [`PerfpaneError::Provider`] tagged with `provider` if the binary
/// is missing, the child exits non-zero, the deadline passes, or the output
/// does not decode with `encoding`.
pub fn run_command(
    provider: &'static str,
    program: &str,
    args: &[&str],
    timeout: Duration,
    encoding: TextEncoding,
) -> Result<String> {
    tracing::trace!(provider, program, ?args, "running provider command");

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => {
                PerfpaneError::provider(provider, format!("{program} not found"))
            }
            _ => PerfpaneError::provider(provider, format!("failed to spawn {program}: {e}")),
        })?;

    let deadline = Instant::now() + timeout;
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) => {}
            Err(e) => {
                kill_and_reap(&mut child);
                return Err(PerfpaneError::provider(provider, e));
            }
        }
        let now = Instant::now();
        if now >= deadline {
            kill_and_reap(&mut child);
            tracing::debug!(provider, program, ?timeout, "provider command killed");
            return Err(PerfpaneError::provider(
                provider,
                format!("{program} timed out after {timeout:?}"),
            ));
        }
        std::thread::sleep(POLL_INTERVAL.min(deadline - now));
    };

    let mut stdout = Vec::new();
    if let Some(mut pipe) = child.stdout.take() {
        let _read = pipe
            .read_to_end(&mut stdout)
            .map_err(|e| PerfpaneError::provider(provider, e))?;
    }

    if !status.success() {
        return Err(PerfpaneError::provider(
            provider,
            format!("{program} exited with {status}"),
        ));
    }

    encoding
        .decode(&stdout)
        .map_err(|e| PerfpaneError::provider(provider, e))
}

/// Kills `child` and waits for it so no zombie is left behind.
fn kill_and_reap(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}
