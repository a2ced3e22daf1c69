//! Test support utilities shared across unit and integration tests.

use std::collections::{HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use thiserror::Error;
use tokio::time::sleep;

use crate::exec::{ExecClient, ExecError, ExecFuture, LogSink};
use crate::provider::{Node, NodeProvider, ProviderFuture};

/// Error type produced by scripted test doubles.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[error("scripted failure: {0}")]
pub struct ScriptedError(pub String);

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Scripted provider driving fleet tests without network calls.
///
/// Creations succeed by default; individual node names can be marked as
/// failing. Every invocation is recorded for assertions.
#[derive(Debug, Default)]
pub struct ScriptedProvider {
    failing: Mutex<HashSet<String>>,
    failing_deletes: Mutex<HashSet<String>>,
    create_calls: Mutex<Vec<String>>,
    deleted: Mutex<Vec<String>>,
    listing: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    /// Creates a provider with no scripted failures.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a node name whose creation must fail.
    pub fn fail_creation(&self, name: impl Into<String>) {
        lock(&self.failing).insert(name.into());
    }

    /// Marks a node name whose deletion must fail.
    pub fn fail_deletion(&self, name: impl Into<String>) {
        lock(&self.failing_deletes).insert(name.into());
    }

    /// Seeds the names returned by `list`.
    pub fn set_listing(&self, names: Vec<String>) {
        *lock(&self.listing) = names;
    }

    /// Returns every creation request observed so far.
    #[must_use]
    pub fn create_calls(&self) -> Vec<String> {
        lock(&self.create_calls).clone()
    }

    /// Returns every deletion observed so far.
    #[must_use]
    pub fn deleted(&self) -> Vec<String> {
        lock(&self.deleted).clone()
    }

    /// Builds the address a scripted node is created with.
    #[must_use]
    pub fn address_for(name: &str) -> String {
        format!("https://{name}.internal:8443")
    }
}

impl NodeProvider for ScriptedProvider {
    type Error = ScriptedError;

    fn create<'a>(&'a self, name: &'a str) -> ProviderFuture<'a, Node, Self::Error> {
        Box::pin(async move {
            lock(&self.create_calls).push(name.to_owned());
            if lock(&self.failing).contains(name) {
                return Err(ScriptedError(format!("creation of {name} refused")));
            }
            Ok(Node {
                name: name.to_owned(),
                address: Self::address_for(name),
            })
        })
    }

    fn list(&self) -> ProviderFuture<'_, Vec<String>, Self::Error> {
        Box::pin(async move { Ok(lock(&self.listing).clone()) })
    }

    fn delete<'a>(&'a self, name: &'a str) -> ProviderFuture<'a, (), Self::Error> {
        Box::pin(async move {
            if lock(&self.failing_deletes).contains(name) {
                return Err(ScriptedError(format!("deletion of {name} refused")));
            }
            lock(&self.deleted).push(name.to_owned());
            Ok(())
        })
    }
}

/// One scripted remote execution outcome.
#[derive(Clone, Debug)]
pub enum ExecStep {
    /// Emit the given chunks into the sink, then succeed.
    Succeed(Vec<Vec<u8>>),
    /// Wait for the delay, emit the given chunks, then succeed. Models a
    /// remote command that is still running when something else happens.
    SucceedAfter(Duration, Vec<Vec<u8>>),
    /// Emit the given chunks into the sink, then fail with the error.
    Fail(Vec<Vec<u8>>, ExecError),
}

/// Scripted exec client returning pre-seeded outcomes in FIFO order.
///
/// Once the script is exhausted every further attempt succeeds without
/// output. Attempts and their targets are recorded for assertions.
#[derive(Debug, Default)]
pub struct ScriptedExec {
    script: Mutex<VecDeque<ExecStep>>,
    attempts: Mutex<Vec<(String, String)>>,
}

impl ScriptedExec {
    /// Creates a client with an empty script.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a step to the script.
    pub fn push(&self, step: ExecStep) {
        lock(&self.script).push_back(step);
    }

    /// Appends `count` transient transport failures to the script.
    pub fn push_transient_failures(&self, count: usize) {
        for _ in 0..count {
            self.push(ExecStep::Fail(
                Vec::new(),
                ExecError::Transport {
                    host: String::from("scripted"),
                    detail: String::from("connection refused"),
                },
            ));
        }
    }

    /// Returns how many attempts have been made.
    #[must_use]
    pub fn attempt_count(&self) -> usize {
        lock(&self.attempts).len()
    }

    /// Returns the `(host, command)` pairs observed so far.
    #[must_use]
    pub fn attempts(&self) -> Vec<(String, String)> {
        lock(&self.attempts).clone()
    }
}

impl ExecClient for ScriptedExec {
    fn run<'a>(&'a self, host: &'a str, command: &'a str, sink: LogSink) -> ExecFuture<'a> {
        Box::pin(async move {
            lock(&self.attempts).push((host.to_owned(), command.to_owned()));
            let step = lock(&self.script)
                .pop_front()
                .unwrap_or(ExecStep::Succeed(Vec::new()));
            match step {
                ExecStep::Succeed(chunks) => {
                    for chunk in chunks {
                        let _delivered = sink.write(chunk).await;
                    }
                    Ok(())
                }
                ExecStep::SucceedAfter(delay, chunks) => {
                    sleep(delay).await;
                    for chunk in chunks {
                        let _delivered = sink.write(chunk).await;
                    }
                    Ok(())
                }
                ExecStep::Fail(chunks, err) => {
                    for chunk in chunks {
                        let _delivered = sink.write(chunk).await;
                    }
                    Err(err)
                }
            }
        })
    }
}
