//! Infrastructure implementation of the `CommandRunner` port.
//!
//! `TokioCommandRunner` is the production implementation: tokio processes
//! with line streaming, a hard timeout, and a guaranteed kill.

use std::process::Stdio;
use std::time::Duration;

use stagehand_common::OutputLine;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

use crate::application::ports::{CapturedOutput, CommandRunner, CommandSpec, OutputSink};
use crate::domain::error::ExecError;

/// Production `CommandRunner`.
///
/// On unix every child runs in its own process group, so terminal SIGINT
/// is left to the cooperative cancellation check between components. Both
/// pipes are read line by line in the same task, so lines reach the
/// sink in arrival order. Dropping `.output()` on a timeout does not kill the
/// OS process on every platform, so the timeout branch kills the child
/// explicitly and waits for it.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioCommandRunner;

impl TokioCommandRunner {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl CommandRunner for TokioCommandRunner {
    async fn run_streaming(
        &self,
        spec: &CommandSpec,
        sink: &dyn OutputSink,
        timeout: Duration,
    ) -> Result<CapturedOutput, ExecError> {
        let mut command = tokio::process::Command::new(&spec.program);
        command
            .args(&spec.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        // Own process group: a terminal Ctrl-C reaches stagehand only, and
        // a stage in flight finishes on its own terms.
        #[cfg(unix)]
        command.process_group(0);
        if let Some(dir) = &spec.cwd {
            command.current_dir(dir);
        }
        for (key, value) in &spec.env {
            command.env(key, value);
        }

        let mut child = command.spawn().map_err(|source| ExecError::Spawn {
            program: spec.program.clone(),
            source,
        })?;
        let mut stdout = child.stdout.take().map(BufReader::new);
        let mut stderr = child.stderr.take().map(BufReader::new);
        let mut captured = CapturedOutput::default();

        let finished = tokio::time::timeout(timeout, async {
            loop {
                tokio::select! {
                    line = read_line_lossy(&mut stdout), if stdout.is_some() => match line {
                        Some(text) => {
                            let line = OutputLine::stdout(text);
                            sink.line(&line);
                            captured.push(line);
                        }
                        None => stdout = None,
                    },
                    line = read_line_lossy(&mut stderr), if stderr.is_some() => match line {
                        Some(text) => {
                            let line = OutputLine::stderr(text);
                            sink.line(&line);
                            captured.push(line);
                        }
                        None => stderr = None,
                    },
                    else => break,
                }
            }
            child.wait().await
        })
        .await;

        match finished {
            Ok(status) => {
                captured.exit_code = status?.code().unwrap_or(-1);
                tracing::debug!(program = %spec.program, exit_code = captured.exit_code, "process exited");
                Ok(captured)
            }
            Err(_) => {
                tracing::warn!(program = %spec.program, secs = timeout.as_secs(), "process timed out, killing");
                let _ = child.kill().await;
                Err(ExecError::Timeout {
                    after: timeout,
                    output: captured.combined(),
                })
            }
        }
    }
}

/// Next line without its terminator, decoded lossily. `None` at EOF or on a
/// read error; the reader is left in place for the caller to drop.
async fn read_line_lossy<R: AsyncBufRead + Unpin>(reader: &mut Option<R>) -> Option<String> {
    let reader = reader.as_mut()?;
    let mut buf = Vec::new();
    match reader.read_until(b'\n', &mut buf).await {
        Ok(0) | Err(_) => None,
        Ok(_) => {
            if buf.last() == Some(&b'\n') {
                buf.pop();
            }
            if buf.last() == Some(&b'\r') {
                buf.pop();
            }
            Some(String::from_utf8_lossy(&buf).into_owned())
        }
    }
}
