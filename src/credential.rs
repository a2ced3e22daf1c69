//! Process-wide SSH credential shared by every remote execution attempt.

use std::sync::OnceLock;

/// SSH identity used for every remote session.
///
/// One user and one private key serve the whole process. The key path is
/// tilde-expanded lazily on first use and cached for the process lifetime;
/// the credential is never rotated. Sharing it read-only across concurrent
/// attempts is safe.
#[derive(Debug)]
pub struct Credential {
    user: String,
    identity_file: String,
    resolved: OnceLock<String>,
}

impl Credential {
    /// Creates a credential from a remote user and a private key path.
    #[must_use]
    pub fn new(user: impl Into<String>, identity_file: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            identity_file: identity_file.into(),
            resolved: OnceLock::new(),
        }
    }

    /// Returns the remote user identity.
    #[must_use]
    pub fn user(&self) -> &str {
        &self.user
    }

    /// Returns the expanded private key path, resolving it on first use.
    pub fn identity_path(&self) -> &str {
        self.resolved
            .get_or_init(|| expand_tilde(&self.identity_file))
    }
}

/// Expands a leading `~/` prefix to the user's home directory.
///
/// If the `HOME` environment variable is not set, the input is returned
/// unchanged; SSH then fails with a key-not-found error the caller can act
/// on.
#[must_use]
pub fn expand_tilde(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/")
        && let Some(home) = std::env::var_os("HOME")
    {
        return format!("{}/{rest}", home.to_string_lossy());
    }
    path.to_owned()
}
