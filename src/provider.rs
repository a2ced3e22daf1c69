//! Provider abstraction for creating and destroying remote compute nodes.

use std::future::Future;
use std::pin::Pin;

/// A provisioned remote compute node addressable over the network.
///
/// Nodes are owned by the provider once created; the rest of the crate holds
/// only transient references and never mutates a node after creation.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Node {
    /// Provider-assigned instance name.
    pub name: String,
    /// URL-like address of the node's service endpoint. Only the host part
    /// is used when opening a remote command channel.
    pub address: String,
}

/// Future returned by provider operations.
pub type ProviderFuture<'a, T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'a>>;

/// Minimal interface implemented by cloud providers.
///
/// Project, zone, and boot image are construction state of the implementing
/// provider; requests carry only the node name. Each call is assumed
/// idempotent-per-call and independently retryable, and the provider is the
/// sole source of truth for node existence. The fleet coordinator does not
/// retry provider calls itself.
pub trait NodeProvider: Send + Sync {
    /// Provider specific error type returned by operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Creates a node with the given name and returns it once addressable.
    fn create<'a>(&'a self, name: &'a str) -> ProviderFuture<'a, Node, Self::Error>;

    /// Lists the names of nodes visible to this provider.
    fn list(&self) -> ProviderFuture<'_, Vec<String>, Self::Error>;

    /// Deletes the named node.
    fn delete<'a>(&'a self, name: &'a str) -> ProviderFuture<'a, (), Self::Error>;
}
