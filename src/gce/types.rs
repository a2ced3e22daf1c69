//! Wire types for the Compute Engine instances API.

use serde::{Deserialize, Serialize};

/// Instance creation request body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct InsertInstanceRequest {
    pub(super) name: String,
    pub(super) machine_type: String,
    pub(super) disks: Vec<AttachedDisk>,
    pub(super) network_interfaces: Vec<NetworkInterfaceSpec>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct AttachedDisk {
    pub(super) boot: bool,
    pub(super) auto_delete: bool,
    pub(super) initialize_params: DiskInitializeParams,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct DiskInitializeParams {
    pub(super) source_image: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct NetworkInterfaceSpec {
    pub(super) access_configs: Vec<AccessConfigSpec>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct AccessConfigSpec {
    #[serde(rename = "type")]
    pub(super) kind: String,
    pub(super) name: String,
}

/// Instance resource as returned by get and list calls.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct Instance {
    pub(super) name: String,
    pub(super) status: String,
    #[serde(default)]
    pub(super) network_interfaces: Vec<NetworkInterface>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct NetworkInterface {
    #[serde(default)]
    pub(super) access_configs: Vec<AccessConfig>,
}

#[derive(Debug, Deserialize)]
pub(super) struct AccessConfig {
    #[serde(rename = "natIP")]
    pub(super) nat_ip: Option<String>,
}

/// Paged list response; `items` is absent when the zone has no instances.
#[derive(Debug, Deserialize)]
pub(super) struct ListInstancesResponse {
    #[serde(default)]
    pub(super) items: Vec<Instance>,
}

impl Instance {
    /// Returns the instance's external NAT address, when one is assigned.
    pub(super) fn public_ip(&self) -> Option<&str> {
        self.network_interfaces
            .iter()
            .flat_map(|interface| interface.access_configs.iter())
            .find_map(|access| access.nat_ip.as_deref())
    }
}
