//! Compute Engine implementation of the node provider.
//!
//! Talks to the instances API directly over REST. Creation is asynchronous on
//! the provider side, so `create` polls the instance resource until it is
//! running with an external address; the node's API endpoint is derived from
//! that address.

mod error;
mod types;

use std::sync::LazyLock;
use std::time::Duration;

use log::debug;
use tokio::time::{Instant, sleep};

use crate::config::FleetConfig;
use crate::provider::{Node, NodeProvider, ProviderFuture};
use types::{
    AccessConfigSpec, AttachedDisk, DiskInitializeParams, InsertInstanceRequest, Instance,
    ListInstancesResponse, NetworkInterfaceSpec,
};

pub use error::GceError;

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);
const POLL_INTERVAL: Duration = Duration::from_secs(5);
const READY_TIMEOUT: Duration = Duration::from_secs(300);
const COMPUTE_API_BASE: &str = "https://compute.googleapis.com/compute/v1";

/// Port the node-side API listens on once an instance has booted.
pub const NODE_API_PORT: u16 = 8443;

static HTTP_CLIENT: LazyLock<reqwest::Client> = LazyLock::new(|| {
    reqwest::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
});

/// Provider that provisions nodes through the Compute Engine instances API.
#[derive(Clone, Debug)]
pub struct GceProvider {
    config: FleetConfig,
    api_base: String,
    poll_interval: Duration,
    ready_timeout: Duration,
}

impl GceProvider {
    /// Constructs a provider from validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`GceError::Config`] when the configuration fails validation.
    pub fn new(config: FleetConfig) -> Result<Self, GceError> {
        config.validate()?;
        Ok(Self {
            config,
            api_base: COMPUTE_API_BASE.to_owned(),
            poll_interval: POLL_INTERVAL,
            ready_timeout: READY_TIMEOUT,
        })
    }

    fn instances_url(&self) -> String {
        format!(
            "{}/projects/{}/zones/{}/instances",
            self.api_base, self.config.project, self.config.zone
        )
    }

    fn instance_url(&self, name: &str) -> String {
        format!("{}/{name}", self.instances_url())
    }

    fn insert_request(&self, name: &str) -> InsertInstanceRequest {
        InsertInstanceRequest {
            name: name.to_owned(),
            machine_type: format!(
                "zones/{}/machineTypes/{}",
                self.config.zone, self.config.machine_type
            ),
            disks: vec![AttachedDisk {
                boot: true,
                auto_delete: true,
                initialize_params: DiskInitializeParams {
                    source_image: self.config.image.clone(),
                },
            }],
            network_interfaces: vec![NetworkInterfaceSpec {
                access_configs: vec![AccessConfigSpec {
                    kind: String::from("ONE_TO_ONE_NAT"),
                    name: String::from("External NAT"),
                }],
            }],
        }
    }

    async fn insert_instance(&self, name: &str) -> Result<(), GceError> {
        let response = HTTP_CLIENT
            .post(self.instances_url())
            .bearer_auth(&self.config.auth_token)
            .json(&self.insert_request(name))
            .send()
            .await
            .map_err(|err| GceError::Http {
                message: err.to_string(),
            })?;

        check_status("instance creation", response).await?;
        Ok(())
    }

    async fn fetch_instance(&self, name: &str) -> Result<Option<Instance>, GceError> {
        let response = HTTP_CLIENT
            .get(self.instance_url(name))
            .bearer_auth(&self.config.auth_token)
            .send()
            .await
            .map_err(|err| GceError::Http {
                message: err.to_string(),
            })?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let body = check_status("instance lookup", response).await?;
        let instance: Instance =
            serde_json::from_slice(&body).map_err(|err| GceError::Decode {
                operation: String::from("instance lookup"),
                message: err.to_string(),
            })?;
        Ok(Some(instance))
    }

    async fn wait_until_reachable(&self, name: &str) -> Result<Node, GceError> {
        let deadline = Instant::now() + self.ready_timeout;
        loop {
            if Instant::now() > deadline {
                return Err(GceError::Unreachable {
                    name: name.to_owned(),
                });
            }

            if let Some(instance) = self.fetch_instance(name).await?
                && instance.status == "RUNNING"
                && let Some(ip) = instance.public_ip()
            {
                return Ok(Node {
                    name: instance.name.clone(),
                    address: format!("https://{ip}:{NODE_API_PORT}"),
                });
            }

            debug!("instance {name} not yet reachable; polling again");
            sleep(self.poll_interval).await;
        }
    }

    async fn list_names(&self) -> Result<Vec<String>, GceError> {
        let response = HTTP_CLIENT
            .get(self.instances_url())
            .bearer_auth(&self.config.auth_token)
            .send()
            .await
            .map_err(|err| GceError::Http {
                message: err.to_string(),
            })?;

        let body = check_status("instance listing", response).await?;
        let parsed: ListInstancesResponse =
            serde_json::from_slice(&body).map_err(|err| GceError::Decode {
                operation: String::from("instance listing"),
                message: err.to_string(),
            })?;
        Ok(parsed
            .items
            .into_iter()
            .map(|instance| instance.name)
            .collect())
    }

    async fn remove_instance(&self, name: &str) -> Result<(), GceError> {
        let response = HTTP_CLIENT
            .delete(self.instance_url(name))
            .bearer_auth(&self.config.auth_token)
            .send()
            .await
            .map_err(|err| GceError::Http {
                message: err.to_string(),
            })?;

        // Deleting an already-absent instance is a no-op.
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(());
        }
        check_status("instance deletion", response).await?;
        Ok(())
    }
}

impl NodeProvider for GceProvider {
    type Error = GceError;

    fn create<'a>(&'a self, name: &'a str) -> ProviderFuture<'a, Node, Self::Error> {
        Box::pin(async move {
            self.insert_instance(name).await?;
            self.wait_until_reachable(name).await
        })
    }

    fn list(&self) -> ProviderFuture<'_, Vec<String>, Self::Error> {
        Box::pin(async move { self.list_names().await })
    }

    fn delete<'a>(&'a self, name: &'a str) -> ProviderFuture<'a, (), Self::Error> {
        Box::pin(async move { self.remove_instance(name).await })
    }
}

async fn check_status(
    operation: &str,
    response: reqwest::Response,
) -> Result<Vec<u8>, GceError> {
    let status = response.status();
    let body = response.bytes().await.map_err(|err| GceError::Http {
        message: err.to_string(),
    })?;

    if status.is_success() {
        return Ok(body.to_vec());
    }
    Err(GceError::Api {
        operation: operation.to_owned(),
        status: status.as_u16(),
        message: String::from_utf8_lossy(&body).into_owned(),
    })
}
