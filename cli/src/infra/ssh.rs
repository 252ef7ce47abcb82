//! Infrastructure implementation of the `RemoteExecutor` port over the
//! system OpenSSH client.
//!
//! One `SshClient` is one server. `connect` opens a multiplexed master
//! connection (ControlMaster) so every later `ssh`/`scp` call reuses it.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::application::ports::{
    CapturedOutput, CommandRunner, CommandSpec, NullSink, OutputSink, RemoteExecutor,
};
use crate::domain::config::ServerConfig;
use crate::domain::error::ExecError;
use crate::domain::ssh::{SshTarget, SshTool, classify_failure};
use crate::infra::command_runner::TokioCommandRunner;

/// Timeout for asking the master connection to exit.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(10);

static NEXT_SOCKET: AtomicU64 = AtomicU64::new(0);

/// Short, unique control socket path. Unix socket paths are limited to
/// roughly 100 bytes, so the name stays compact.
fn control_socket_path() -> PathBuf {
    let n = NEXT_SOCKET.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!("stagehand-{}-{n}", std::process::id()))
}

pub struct SshClient<R = TokioCommandRunner> {
    target: SshTarget,
    runner: R,
    timeout: Duration,
}

impl<R: CommandRunner> SshClient<R> {
    /// Build a client without touching the network.
    #[must_use]
    pub fn new(server: &ServerConfig, runner: R, timeout: Duration) -> Self {
        Self {
            target: SshTarget::from_server(server, Some(control_socket_path())),
            runner,
            timeout,
        }
    }

    /// Build a client and open the master connection.
    ///
    /// # Errors
    ///
    /// `AuthFailure` or `HostUnreachable` when the server cannot be used.
    pub async fn connect(server: &ServerConfig, runner: R, timeout: Duration) -> Result<Self, ExecError> {
        let client = Self::new(server, runner, timeout);
        tracing::debug!(host = %client.target.host, "opening ssh connection");
        client.run_command("true", &NullSink).await?;
        Ok(client)
    }

    #[must_use]
    pub fn target(&self) -> &SshTarget {
        &self.target
    }

    async fn run_tool(
        &self,
        tool: SshTool,
        args: Vec<String>,
        sink: &dyn OutputSink,
        timeout: Duration,
    ) -> Result<CapturedOutput, ExecError> {
        let program = match tool {
            SshTool::Ssh => "ssh",
            SshTool::Scp => "scp",
        };
        let spec = CommandSpec::new(program).args(args);
        let captured = self.runner.run_streaming(&spec, sink, timeout).await?;
        if captured.success() {
            return Ok(captured);
        }
        let err = classify_failure(
            tool,
            &self.target.host,
            captured.exit_code,
            &captured.stderr,
            &captured.combined(),
        );
        tracing::debug!(program, exit_code = captured.exit_code, error = %err, "remote call failed");
        Err(err)
    }
}

impl<R: CommandRunner> RemoteExecutor for SshClient<R> {
    fn host(&self) -> &str {
        &self.target.host
    }

    fn default_timeout(&self) -> Duration {
        self.timeout
    }

    async fn run_command_with_timeout(
        &self,
        command: &str,
        sink: &dyn OutputSink,
        timeout: Duration,
    ) -> Result<CapturedOutput, ExecError> {
        self.run_tool(SshTool::Ssh, self.target.ssh_args(command), sink, timeout)
            .await
    }

    async fn upload_file(
        &self,
        local: &Path,
        remote: &str,
        sink: &dyn OutputSink,
    ) -> Result<(), ExecError> {
        let args = self
            .target
            .scp_args(&local.to_string_lossy(), remote);
        self.run_tool(SshTool::Scp, args, sink, self.timeout)
            .await
            .map(drop)
    }

    async fn test_connection(&self) -> Result<String, ExecError> {
        let out = self.run_command("uname -a", &NullSink).await?;
        Ok(out.stdout.trim().to_string())
    }

    async fn disconnect(&self) -> Result<(), ExecError> {
        let Some(args) = self.target.close_args() else {
            return Ok(());
        };
        // A missing master is not an error; only a failure to launch is.
        self.runner
            .run_streaming(&CommandSpec::new("ssh").args(args), &NullSink, CLOSE_TIMEOUT)
            .await
            .map(drop)
    }
}
