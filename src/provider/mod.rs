//! Cloud resource provider API
//!
//! The provider owns projects, ssh keys and devices. The orchestrator only
//! talks to it through the `ResourceApi` trait; `PacketClient` is the HTTP
//! implementation and `InMemoryApi` the test double.

pub mod mock;
pub mod packet;

pub use mock::InMemoryApi;
pub use packet::PacketClient;

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Remote state string a device reports once it is provisioned
pub const ACTIVE_STATE: &str = "active";

/// A provider project grouping devices for one run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
}

/// An ssh key registered with the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SshKeyRecord {
    pub id: String,
    pub label: String,
    pub key: String,
}

/// One address attached to a provider device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpAddressRecord {
    pub address: String,
    pub public: bool,
    pub address_family: u8,
}

/// A device as the provider reports it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRecord {
    pub id: String,
    pub hostname: String,
    pub state: String,
    #[serde(default)]
    pub ip_addresses: Vec<IpAddressRecord>,
}

impl DeviceRecord {
    /// Whether the device has reached the active provisioning state
    pub fn is_active(&self) -> bool {
        self.state == ACTIVE_STATE
    }

    pub fn public_ipv4(&self) -> Option<&str> {
        self.ip_addresses
            .iter()
            .find(|ip| ip.public && ip.address_family == 4)
            .map(|ip| ip.address.as_str())
    }

    pub fn private_ipv4(&self) -> Option<&str> {
        self.ip_addresses
            .iter()
            .find(|ip| !ip.public && ip.address_family == 4)
            .map(|ip| ip.address.as_str())
    }
}

/// Request body for device creation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceCreate {
    pub hostname: String,
    pub plan: String,
    pub facility: String,
    pub operating_system: String,
}

/// Operations the orchestrator needs from the resource provider.
///
/// Any error is fatal to the phase that issued the call; retry policy, if
/// any, belongs to the caller.
#[async_trait]
pub trait ResourceApi: Send + Sync {
    async fn create_project(&self, name: &str) -> Result<Project>;
    async fn get_project(&self, id: &str) -> Result<Project>;
    async fn delete_project(&self, id: &str) -> Result<()>;

    async fn list_ssh_keys(&self) -> Result<Vec<SshKeyRecord>>;
    async fn add_ssh_key(&self, label: &str, key: &str) -> Result<SshKeyRecord>;
    async fn delete_ssh_key(&self, id: &str) -> Result<()>;

    async fn list_devices(&self, project_id: &str) -> Result<Vec<DeviceRecord>>;
    async fn create_device(&self, project_id: &str, request: &DeviceCreate) -> Result<DeviceRecord>;
    async fn delete_device(&self, device_id: &str) -> Result<()>;
}
