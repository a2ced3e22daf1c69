//! Remote command execution over a fresh SSH session per attempt.
//!
//! Each call shells out to the system `ssh` client, authenticates with the
//! process-wide credential, runs exactly one command, and duplexes the
//! command's merged stdout and stderr into a sink as bytes arrive. The
//! session is released on every exit path; there is no connection reuse
//! across attempts.
//!
//! Failures are classified into typed categories here so callers never have
//! to parse message text: the retry loop in [`crate::logs`] matches on
//! [`ExecError`] variants only.

use std::ffi::OsString;
use std::future::Future;
use std::pin::Pin;
use std::process::Stdio;
use std::sync::Arc;

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::sync::mpsc;

use crate::config::TailConfig;
use crate::credential::Credential;

/// Trailing stderr bytes retained for failure classification.
const STDERR_CAPTURE_LIMIT: usize = 4096;

/// Exit status the OpenSSH client reserves for its own failures, as opposed
/// to the remote command's status.
const SSH_CLIENT_FAILURE: i32 = 255;

/// Read buffer size for pipe forwarding.
const READ_BUF_SIZE: usize = 8192;

/// Stderr fragments OpenSSH prints when the remote host rejects an identity.
const AUTH_MARKERS: &[&str] = &[
    "permission denied",
    "unable to authenticate",
    "authentication failed",
    "too many authentication failures",
    "no supported authentication",
];

/// Sink receiving merged stdout/stderr bytes from a remote command.
#[derive(Clone, Debug)]
pub struct LogSink {
    tx: mpsc::Sender<Vec<u8>>,
}

impl LogSink {
    /// Wraps a channel sender as a byte sink.
    #[must_use]
    pub const fn new(tx: mpsc::Sender<Vec<u8>>) -> Self {
        Self { tx }
    }

    /// Delivers one chunk to the reader; returns `false` once the reader is
    /// gone.
    pub async fn write(&self, chunk: Vec<u8>) -> bool {
        self.tx.send(chunk).await.is_ok()
    }
}

/// Errors raised by one remote execution attempt.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ExecError {
    /// The ssh client could not be spawned at all.
    #[error("failed to spawn {program}: {message}")]
    Spawn {
        /// Program that failed to start.
        program: String,
        /// Operating system error string.
        message: String,
    },
    /// The remote host rejected the process credential.
    #[error("authentication rejected by {host}: {detail}")]
    Auth {
        /// Host that rejected the identity.
        host: String,
        /// Last diagnostic line printed by the ssh client.
        detail: String,
    },
    /// The remote command itself exited with a failure status.
    #[error("remote command exited with status {code}")]
    RemoteExit {
        /// Exit status reported by the remote command.
        code: i32,
    },
    /// The session failed before the remote command completed.
    #[error("transport failure talking to {host}: {detail}")]
    Transport {
        /// Host the session targeted.
        host: String,
        /// Last diagnostic line printed by the ssh client.
        detail: String,
    },
}

impl ExecError {
    /// Returns `true` when retrying the attempt can never succeed.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Auth { .. } | Self::RemoteExit { .. })
    }
}

/// Future returned by exec client operations.
pub type ExecFuture<'a> = Pin<Box<dyn Future<Output = Result<(), ExecError>> + Send + 'a>>;

/// One remote command execution per call over an authenticated channel.
pub trait ExecClient: Send + Sync {
    /// Runs `command` on `host`, duplexing merged output into `sink`.
    fn run<'a>(&'a self, host: &'a str, command: &'a str, sink: LogSink) -> ExecFuture<'a>;
}

/// Exec client backed by the system `ssh` binary.
#[derive(Debug)]
pub struct SshExecClient {
    config: TailConfig,
    credential: Arc<Credential>,
}

impl SshExecClient {
    /// Creates a client from tail configuration and the shared credential.
    #[must_use]
    pub const fn new(config: TailConfig, credential: Arc<Credential>) -> Self {
        Self { config, credential }
    }

    fn build_args(&self, host: &str, command: &str) -> Vec<OsString> {
        let mut args = vec![
            OsString::from("-p"),
            OsString::from(self.config.ssh_port.to_string()),
            OsString::from("-i"),
            OsString::from(self.credential.identity_path()),
            OsString::from("-o"),
            OsString::from("BatchMode=yes"),
        ];

        if !self.config.strict_host_key_checking {
            // Ephemeral nodes have no stable host identity; accepting any
            // key is a configured trade-off, toggled in TailConfig.
            args.push(OsString::from("-o"));
            args.push(OsString::from("StrictHostKeyChecking=no"));
            args.push(OsString::from("-o"));
            args.push(OsString::from(format!(
                "UserKnownHostsFile={}",
                self.config.known_hosts_file
            )));
        }

        args.push(OsString::from(format!(
            "{}@{host}",
            self.credential.user()
        )));
        args.push(OsString::from(command));
        args
    }

    async fn run_once(&self, host: &str, command: &str, sink: LogSink) -> Result<(), ExecError> {
        let args = self.build_args(host, command);
        let mut child = Command::new(&self.config.ssh_bin)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|err| ExecError::Spawn {
                program: self.config.ssh_bin.clone(),
                message: err.to_string(),
            })?;

        let stdout_task = child
            .stdout
            .take()
            .map(|pipe| tokio::spawn(pump(pipe, sink.clone(), false)));
        let stderr_task = child
            .stderr
            .take()
            .map(|pipe| tokio::spawn(pump(pipe, sink, true)));

        let status = child.wait().await.map_err(|err| ExecError::Transport {
            host: host.to_owned(),
            detail: err.to_string(),
        })?;

        if let Some(task) = stdout_task {
            task.await.ok();
        }
        let mut stderr_tail = Vec::new();
        if let Some(task) = stderr_task {
            stderr_tail = task.await.unwrap_or_default();
        }

        classify(host, status.code(), &stderr_tail)
    }
}

impl ExecClient for SshExecClient {
    fn run<'a>(&'a self, host: &'a str, command: &'a str, sink: LogSink) -> ExecFuture<'a> {
        Box::pin(self.run_once(host, command, sink))
    }
}

/// Forwards a pipe into the sink chunk by chunk.
///
/// When `capture` is set the trailing bytes are also retained for failure
/// classification. The pipe is drained even after the reader goes away so
/// the child never blocks on a full pipe.
async fn pump<R>(mut reader: R, sink: LogSink, capture: bool) -> Vec<u8>
where
    R: AsyncRead + Unpin + Send,
{
    let mut captured = Vec::new();
    let mut buf = [0u8; READ_BUF_SIZE];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                let chunk = buf.get(..n).map(<[u8]>::to_vec).unwrap_or_default();
                if capture {
                    retain_tail(&mut captured, &chunk);
                }
                let _delivered = sink.write(chunk).await;
            }
        }
    }
    captured
}

fn retain_tail(captured: &mut Vec<u8>, chunk: &[u8]) {
    captured.extend_from_slice(chunk);
    if captured.len() > STDERR_CAPTURE_LIMIT {
        let excess = captured.len() - STDERR_CAPTURE_LIMIT;
        captured.drain(..excess);
    }
}

fn classify(host: &str, code: Option<i32>, stderr_tail: &[u8]) -> Result<(), ExecError> {
    let detail = String::from_utf8_lossy(stderr_tail).into_owned();
    match code {
        Some(0) => Ok(()),
        Some(SSH_CLIENT_FAILURE) => {
            if is_auth_failure(&detail) {
                Err(ExecError::Auth {
                    host: host.to_owned(),
                    detail: last_line(&detail),
                })
            } else {
                Err(ExecError::Transport {
                    host: host.to_owned(),
                    detail: last_line(&detail),
                })
            }
        }
        Some(status) => Err(ExecError::RemoteExit { code: status }),
        None => Err(ExecError::Transport {
            host: host.to_owned(),
            detail: String::from("terminated by signal"),
        }),
    }
}

fn is_auth_failure(detail: &str) -> bool {
    let lowered = detail.to_ascii_lowercase();
    AUTH_MARKERS.iter().any(|marker| lowered.contains(marker))
}

fn last_line(detail: &str) -> String {
    detail
        .lines()
        .rev()
        .find(|line| !line.trim().is_empty())
        .unwrap_or("")
        .trim()
        .to_owned()
}
