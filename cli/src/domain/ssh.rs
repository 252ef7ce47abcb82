//! SSH argument building and failure classification.

use std::path::PathBuf;

use crate::domain::config::ServerConfig;
use crate::domain::error::ExecError;

/// Exit status `ssh` reserves for its own (connection-level) failures.
pub const SSH_CONNECTION_EXIT: i32 = 255;

const AUTH_MARKERS: &[&str] = &[
    "Permission denied (",
    "Permission denied, please try again",
    "Too many authentication failures",
    "Host key verification failed",
    "no matching host key type found",
];

const UNREACHABLE_MARKERS: &[&str] = &[
    "Could not resolve hostname",
    "Connection refused",
    "Connection timed out",
    "Operation timed out",
    "No route to host",
    "Network is unreachable",
    "Connection closed by",
    "Connection reset by",
    "lost connection",
];

/// Which OpenSSH tool produced a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SshTool {
    Ssh,
    Scp,
}

/// Resolved connection parameters for one server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshTarget {
    pub host: String,
    pub user: Option<String>,
    pub port: u16,
    pub identity_file: Option<PathBuf>,
    /// Multiplexing socket path; `None` disables connection sharing.
    pub control_path: Option<PathBuf>,
}

impl SshTarget {
    #[must_use]
    pub fn from_server(server: &ServerConfig, control_path: Option<PathBuf>) -> Self {
        Self {
            host: server.host.clone(),
            user: server.user.clone(),
            port: server.port,
            identity_file: server.identity_file.clone(),
            control_path,
        }
    }

    /// `user@host` or `host`.
    #[must_use]
    pub fn destination(&self) -> String {
        match &self.user {
            Some(user) => format!("{user}@{}", self.host),
            None => self.host.clone(),
        }
    }

    /// Options shared by `ssh` and `scp`. Batch mode makes a missing or
    /// rejected key fail fast instead of prompting.
    #[must_use]
    pub fn common_options(&self) -> Vec<String> {
        let mut opts = vec![
            "-o".to_string(),
            "BatchMode=yes".to_string(),
            "-o".to_string(),
            "ConnectTimeout=15".to_string(),
        ];
        if let Some(identity) = &self.identity_file {
            opts.push("-i".to_string());
            opts.push(identity.display().to_string());
        }
        if let Some(control) = &self.control_path {
            opts.push("-o".to_string());
            opts.push("ControlMaster=auto".to_string());
            opts.push("-o".to_string());
            opts.push(format!("ControlPath={}", control.display()));
            opts.push("-o".to_string());
            opts.push("ControlPersist=300".to_string());
        }
        opts
    }

    /// Full argument vector for `ssh <dest> <command>`.
    #[must_use]
    pub fn ssh_args(&self, command: &str) -> Vec<String> {
        let mut args = self.common_options();
        args.push("-p".to_string());
        args.push(self.port.to_string());
        args.push(self.destination());
        args.push(command.to_string());
        args
    }

    /// Full argument vector for `scp <local> <dest>:<remote>`.
    #[must_use]
    pub fn scp_args(&self, local: &str, remote: &str) -> Vec<String> {
        let mut args = self.common_options();
        args.push("-q".to_string());
        args.push("-P".to_string());
        args.push(self.port.to_string());
        args.push(local.to_string());
        args.push(format!("{}:{remote}", self.destination()));
        args
    }

    /// Argument vector asking the multiplexing master to exit.
    #[must_use]
    pub fn close_args(&self) -> Option<Vec<String>> {
        let control = self.control_path.as_ref()?;
        Some(vec![
            "-o".to_string(),
            format!("ControlPath={}", control.display()),
            "-O".to_string(),
            "exit".to_string(),
            self.destination(),
        ])
    }
}

/// Quote `s` for a POSIX shell.
#[must_use]
pub fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "'\\''"))
}

/// A remote path is safe to create or delete under when it is non-empty,
/// not the filesystem root, and has no `..` segment.
#[must_use]
pub fn is_safe_remote_path(path: &str) -> bool {
    let trimmed = path.trim();
    !trimmed.trim_end_matches('/').is_empty() && !trimmed.split('/').any(|segment| segment == "..")
}

/// Map a failed `ssh`/`scp` invocation onto an `ExecError`.
///
/// `ssh` exits 255 for its own failures and passes the remote exit code
/// through otherwise, so auth and reachability are only inferred from a 255.
/// `scp` exits 1 for everything, so its stderr decides.
#[must_use]
pub fn classify_failure(
    tool: SshTool,
    host: &str,
    exit_code: i32,
    stderr: &str,
    combined_output: &str,
) -> ExecError {
    let connection_level = match tool {
        SshTool::Ssh => exit_code == SSH_CONNECTION_EXIT,
        SshTool::Scp => {
            AUTH_MARKERS.iter().any(|m| stderr.contains(m))
                || UNREACHABLE_MARKERS.iter().any(|m| stderr.contains(m))
        }
    };
    if !connection_level {
        return ExecError::CommandFailed {
            exit_code,
            output: combined_output.to_string(),
        };
    }

    let detail = stderr
        .lines()
        .map(str::trim)
        .rfind(|l| !l.is_empty())
        .unwrap_or("connection failed")
        .to_string();
    if AUTH_MARKERS.iter().any(|m| stderr.contains(m)) {
        ExecError::AuthFailure {
            host: host.to_string(),
            detail,
        }
    } else {
        ExecError::HostUnreachable {
            host: host.to_string(),
            detail,
        }
    }
}
