//! Resilient log tailing over the remote execution channel.
//!
//! A background retry loop drives one [`ExecClient`] attempt at a time,
//! decoupled from the caller by a byte channel: the caller can begin reading
//! immediately while the loop attempts (and re-attempts) to establish a
//! working remote execution. Freshly provisioned nodes often have no active
//! log sink yet, so early attempts are expected to fail transiently; only
//! authentication rejections and explicit remote-side failures abort
//! immediately, since retrying those can never succeed.

use std::sync::Arc;

use log::{debug, warn};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::exec::{ExecClient, ExecError, LogSink};
use crate::provider::Node;
use crate::retry::Backoff;

/// Default command used to follow a node's system log in raw form.
pub const DEFAULT_FOLLOW_COMMAND: &str = "sudo journalctl --output=cat --follow";

/// Chunk buffering between the streaming loop and the caller.
const LOG_CHANNEL_CAPACITY: usize = 64;

/// Errors terminating a log stream.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum TailError {
    /// The node address could not be parsed into a reachable host.
    #[error("node {name} has no usable address: {address}")]
    Address {
        /// Name of the node being tailed.
        name: String,
        /// Address that failed to parse.
        address: String,
    },
    /// The remote host rejected the process credential.
    #[error("authentication failed: {0}")]
    Auth(#[source] ExecError),
    /// The follow command itself exited with a failure status.
    #[error("remote command failed: {0}")]
    RemoteCommand(#[source] ExecError),
    /// The caller canceled the stream during a backoff wait.
    #[error("log tail canceled")]
    Canceled,
    /// The streaming task ended without reporting an outcome.
    #[error("log stream terminated unexpectedly")]
    Interrupted,
}

/// One-directional byte stream with a single deferred terminal error.
///
/// Readers consume chunks until end-of-stream; the terminal status becomes
/// observable exactly once afterwards. Dropping the stream detaches the
/// reader without interrupting an in-flight remote execution.
#[derive(Debug)]
#[must_use]
pub struct LogStream {
    rx: mpsc::Receiver<Vec<u8>>,
    outcome: oneshot::Receiver<Result<(), TailError>>,
}

impl LogStream {
    /// Receives the next chunk of log output, or `None` at end of stream.
    pub async fn next_chunk(&mut self) -> Option<Vec<u8>> {
        self.rx.recv().await
    }

    /// Consumes the stream and returns its terminal status.
    ///
    /// Resolves once the background loop finishes; undelivered chunks are
    /// discarded. The receiver is released first so a loop blocked on a full
    /// channel can still run to completion.
    pub async fn finish(self) -> Result<(), TailError> {
        let Self { rx, outcome } = self;
        drop(rx);
        outcome.await.unwrap_or(Err(TailError::Interrupted))
    }

    /// Drains the stream to completion, returning the collected bytes and
    /// the terminal status together.
    pub async fn collect(self) -> (Vec<u8>, Result<(), TailError>) {
        let Self { mut rx, outcome } = self;
        let mut data = Vec::new();
        while let Some(chunk) = rx.recv().await {
            data.extend_from_slice(&chunk);
        }
        let status = outcome.await.unwrap_or(Err(TailError::Interrupted));
        (data, status)
    }
}

/// Tails a node's logs, retrying transient failures under backoff.
#[derive(Debug)]
pub struct LogTailer<C> {
    client: Arc<C>,
    follow_command: String,
    backoff: Backoff,
}

impl<C> LogTailer<C>
where
    C: ExecClient + 'static,
{
    /// Creates a tailer around the given exec client.
    #[must_use]
    pub fn new(client: Arc<C>, follow_command: impl Into<String>, backoff: Backoff) -> Self {
        Self {
            client,
            follow_command: follow_command.into(),
            backoff,
        }
    }

    /// Starts tailing `node` in the background and returns the stream.
    ///
    /// Never fails directly; every failure is delivered through the stream's
    /// terminal error. Cancellation is honored at backoff-wait boundaries
    /// only: an in-flight remote execution completes or fails on its own
    /// before the loop next observes the token.
    #[must_use]
    pub fn tail(&self, node: &Node, cancel: CancellationToken) -> LogStream {
        let (tx, rx) = mpsc::channel(LOG_CHANNEL_CAPACITY);
        let (done_tx, done_rx) = oneshot::channel();
        let sink = LogSink::new(tx);
        let client = Arc::clone(&self.client);
        let follow_command = self.follow_command.clone();
        let backoff = self.backoff;
        let target = node.clone();

        tokio::spawn(async move {
            let outcome = stream_loop(
                client.as_ref(),
                &target,
                &follow_command,
                backoff,
                &sink,
                &cancel,
            )
            .await;
            drop(sink);
            done_tx.send(outcome).ok();
        });

        LogStream {
            rx,
            outcome: done_rx,
        }
    }
}

async fn stream_loop<C>(
    client: &C,
    node: &Node,
    command: &str,
    backoff: Backoff,
    sink: &LogSink,
    cancel: &CancellationToken,
) -> Result<(), TailError>
where
    C: ExecClient + ?Sized,
{
    let Some(host) = host_of(&node.address) else {
        return Err(TailError::Address {
            name: node.name.clone(),
            address: node.address.clone(),
        });
    };

    let mut attempt: u32 = 0;
    loop {
        match client.run(&host, command, sink.clone()).await {
            Ok(()) => {
                debug!("tail {host}: follow command completed");
                return Ok(());
            }
            Err(err @ ExecError::Auth { .. }) => return Err(TailError::Auth(err)),
            Err(err @ ExecError::RemoteExit { .. }) => return Err(TailError::RemoteCommand(err)),
            Err(err) => {
                let delay = backoff.delay(attempt);
                warn!("tail {host}: attempt {attempt} failed: {err}; retrying in {delay:?}");
                attempt = attempt.saturating_add(1);
                tokio::select! {
                    () = cancel.cancelled() => return Err(TailError::Canceled),
                    () = sleep(delay) => {}
                }
            }
        }
    }
}

/// Extracts the host component from a node's URL-like address.
fn host_of(address: &str) -> Option<String> {
    Url::parse(address)
        .ok()
        .and_then(|url| url.host_str().map(str::to_owned))
}
