//! Configuration loading via `ortho-config`.
//!
//! Both configuration structs merge defaults, configuration files, and
//! environment variables. Validation trims whitespace and produces messages
//! that name the environment variable to set.

use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;

use crate::credential::Credential;
use crate::logs::DEFAULT_FOLLOW_COMMAND;

/// Fleet provisioning settings loaded via `ortho-config`.
#[derive(Clone, Debug, Deserialize, OrthoConfig, PartialEq, Eq)]
#[ortho_config(prefix = "FLOTILLA")]
pub struct FleetConfig {
    /// Cloud project that owns the fleet.
    pub project: String,
    /// Compute zone nodes are created in.
    pub zone: String,
    /// Boot image deployed on every new node.
    pub image: String,
    /// Machine type requested for each node.
    #[ortho_config(default = "f1-micro".to_owned())]
    pub machine_type: String,
    /// Bearer token used to authenticate provider API calls.
    pub auth_token: String,
    /// Name prefix applied to every node in the fleet.
    #[ortho_config(default = "flotilla".to_owned())]
    pub name_prefix: String,
}

impl FleetConfig {
    /// Loads configuration without parsing CLI arguments. Values still merge
    /// defaults, configuration files, and environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when merging sources fails.
    pub fn load_without_cli_args() -> Result<Self, ConfigError> {
        Self::load_from_iter([std::ffi::OsString::from("flotilla")])
            .map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Ensures required values are present after trimming whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] when any required field is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_value(&self.project, "project", "FLOTILLA_PROJECT")?;
        require_value(&self.zone, "zone", "FLOTILLA_ZONE")?;
        require_value(&self.image, "image", "FLOTILLA_IMAGE")?;
        require_value(&self.machine_type, "machine_type", "FLOTILLA_MACHINE_TYPE")?;
        require_value(&self.auth_token, "auth_token", "FLOTILLA_AUTH_TOKEN")?;
        require_value(&self.name_prefix, "name_prefix", "FLOTILLA_NAME_PREFIX")?;
        Ok(())
    }
}

/// Log tailing and SSH settings loaded via `ortho-config`.
#[derive(Clone, Debug, Deserialize, OrthoConfig, PartialEq, Eq)]
#[ortho_config(prefix = "FLOTILLA_TAIL")]
pub struct TailConfig {
    /// Path to the `ssh` executable.
    #[ortho_config(default = "ssh".to_owned())]
    pub ssh_bin: String,
    /// Remote user to connect as.
    #[ortho_config(default = "root".to_owned())]
    pub ssh_user: String,
    /// TCP port of the remote command channel.
    #[ortho_config(default = 22)]
    pub ssh_port: u16,
    /// Path to the SSH private key authenticating every session. Supports
    /// tilde expansion (`~/.ssh/google_compute_engine`).
    #[ortho_config(default = "~/.ssh/google_compute_engine".to_owned())]
    pub identity_file: String,
    /// Whether to verify the remote host key. Defaults to off: freshly
    /// provisioned nodes have no stable host identity, so any identity is
    /// accepted. Enabling this requires pre-populating the known hosts file.
    #[ortho_config(default = false)]
    pub strict_host_key_checking: bool,
    /// Known hosts file override; defaults to `/dev/null` for ephemeral
    /// nodes.
    #[ortho_config(default = "/dev/null".to_owned())]
    pub known_hosts_file: String,
    /// Command executed on the node to follow its system log.
    #[ortho_config(default = DEFAULT_FOLLOW_COMMAND.to_owned())]
    pub follow_command: String,
}

impl TailConfig {
    /// Loads configuration without parsing CLI arguments.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when merging sources fails.
    pub fn load_without_cli_args() -> Result<Self, ConfigError> {
        Self::load_from_iter([std::ffi::OsString::from("flotilla")])
            .map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Ensures required values are present after trimming whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] when any required field is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_value(&self.ssh_bin, "ssh_bin", "FLOTILLA_TAIL_SSH_BIN")?;
        require_value(&self.ssh_user, "ssh_user", "FLOTILLA_TAIL_SSH_USER")?;
        require_value(
            &self.identity_file,
            "identity_file",
            "FLOTILLA_TAIL_IDENTITY_FILE",
        )?;
        require_value(
            &self.known_hosts_file,
            "known_hosts_file",
            "FLOTILLA_TAIL_KNOWN_HOSTS_FILE",
        )?;
        require_value(
            &self.follow_command,
            "follow_command",
            "FLOTILLA_TAIL_FOLLOW_COMMAND",
        )?;
        Ok(())
    }

    /// Builds the process-wide credential from the configured identity.
    #[must_use]
    pub fn credential(&self) -> Credential {
        Credential::new(self.ssh_user.clone(), self.identity_file.clone())
    }
}

fn require_value(value: &str, field: &str, env_var: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::MissingField(format!(
            "missing {field}: set {env_var} or add {field} to flotilla.toml"
        )));
    }
    Ok(())
}

/// Errors raised during configuration loading and validation.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum ConfigError {
    /// Indicates a required configuration field is empty or missing.
    #[error("missing configuration field: {0}")]
    MissingField(String),
    /// Surfaces errors from the `ortho-config` loader.
    #[error("configuration parsing failed: {0}")]
    Parse(String),
}

impl From<ortho_config::OrthoError> for ConfigError {
    fn from(value: ortho_config::OrthoError) -> Self {
        Self::Parse(value.to_string())
    }
}
