//! `perfpane exec`: run a program with its output under the overlay.

use std::io::{BufRead, BufReader, Read};
use std::process::{Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::Context;
use clap::Args;
use perfpane_common::config::ProfilerConfig;
use perfpane_common::types::TextEncoding;
use perfpane_runtime::multiplexer::OutputMultiplexer;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Arguments for the `exec` command.
#[derive(Args, Debug)]
pub struct ExecArgs {
    /// Program and arguments to run.
    #[arg(trailing_var_arg = true, required = true)]
    pub command: Vec<String>,
}

/// Executes the `exec` command.
///
/// Stdout and stderr of the program are captured line by line into the
/// overlay's output region. Ctrl+C kills the program. The overlay is torn
/// down before the program's exit code is propagated.
///
/// # Errors
///
/// Returns an error if the program cannot be started or the overlay fails.
pub fn execute(args: ExecArgs, config: ProfilerConfig) -> anyhow::Result<()> {
    let Some((program, program_args)) = args.command.split_first() else {
        anyhow::bail!("no program given");
    };
    let encoding = config.text_encoding;
    let interrupted = super::ctrl_c_channel()?;

    let mut profiler = super::start_overlay(config)?;
    let output = profiler.output();

    let mut child = Command::new(program)
        .args(program_args)
        .stdin(Stdio::inherit())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .with_context(|| format!("failed to start {program}"))?;
    tracing::info!(program = %program, pid = child.id(), "program started");

    let forwarders: Vec<JoinHandle<()>> = [
        child.stdout.take().map(|s| forward(s, output.clone(), encoding)),
        child.stderr.take().map(|s| forward(s, output.clone(), encoding)),
    ]
    .into_iter()
    .flatten()
    .collect();

    let status = loop {
        if let Some(status) = child.try_wait().context("failed to wait for program")? {
            break status;
        }
        if interrupted.recv_timeout(POLL_INTERVAL).is_ok() {
            tracing::info!(program = %program, "interrupted, killing program");
            let _ = child.kill();
        }
    };
    for handle in forwarders {
        let _ = handle.join();
    }
    tracing::info!(program = %program, %status, "program exited");

    profiler.stop()?;
    drop(profiler);
    std::process::exit(exit_code(status));
}

/// Copies `reader` into `output` one line at a time.
fn forward<R>(reader: R, output: OutputMultiplexer, encoding: TextEncoding) -> JoinHandle<()>
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        let mut reader = BufReader::new(reader);
        let mut line = Vec::new();
        loop {
            line.clear();
            match reader.read_until(b'\n', &mut line) {
                Ok(0) => break,
                Ok(_) => output.write(&decode(&line, encoding)),
                Err(e) => {
                    tracing::warn!(error = %e, "program output closed");
                    break;
                }
            }
        }
    })
}

fn decode(bytes: &[u8], encoding: TextEncoding) -> String {
    encoding
        .decode(bytes)
        .unwrap_or_else(|_| String::from_utf8_lossy(bytes).into_owned())
}

/// Exit code to propagate: the program's own, or `128 + signal` when it was
/// killed by a signal.
fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    1
}
