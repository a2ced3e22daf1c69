//! Core library for the flotilla fleet provisioning tool.
//!
//! The crate exposes a provider abstraction for bulk node provisioning
//! (create many → aggregate partial failures → tear down) and a resilient
//! log tailing pipeline that follows a node's system log over SSH, retrying
//! transient failures under exponential backoff.

pub mod config;
pub mod credential;
pub mod exec;
pub mod fleet;
pub mod gce;
pub mod logs;
pub mod provider;
pub mod retry;
pub mod test_support;

pub use config::{ConfigError, FleetConfig, TailConfig};
pub use credential::Credential;
pub use exec::{ExecClient, ExecError, LogSink, SshExecClient};
pub use fleet::{Fleet, FleetError};
pub use gce::{GceError, GceProvider, NODE_API_PORT};
pub use logs::{DEFAULT_FOLLOW_COMMAND, LogStream, LogTailer, TailError};
pub use provider::{Node, NodeProvider};
pub use retry::Backoff;
