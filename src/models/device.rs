//! Device records and the active device set
//!
//! A `Device` is the local view of one provisionable remote machine. It is
//! declared at configuration time and driven through its provisioning states
//! by the orchestrator; every other component only reads it.

use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Role a device plays in a benchmark pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceRole {
    /// Runs the benchmark client
    Source,
    /// Runs the reflector the client dials
    Target,
}

/// Provisioning lifecycle of a device within one run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProvisionState {
    /// Declared in configuration, nothing requested yet
    Declared,
    /// Creation request issued to the provider
    Creating,
    /// Created, waiting for the provider to report it active
    Polling,
    /// Active with addresses recorded
    Ready,
    /// Provisioning gave up on this device
    Aborted,
}

/// One provisionable remote machine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    /// Logical name, unique within the run (e.g. `target1`)
    pub name: String,
    /// Hardware plan tier, used to pair sources with targets
    pub class_tier: u8,
    /// Source or target role
    pub role: DeviceRole,
    /// Provisioning lifecycle state
    pub state: ProvisionState,
    /// Provider-assigned identifier, present once created
    pub id: Option<String>,
    /// Public IPv4 address, recorded when the device becomes ready
    pub public_addr: Option<String>,
    /// Private IPv4 address, recorded when the device becomes ready
    pub private_addr: Option<String>,
}

impl Device {
    /// Declare a new device
    pub fn new<S: Into<String>>(name: S, class_tier: u8, role: DeviceRole) -> Self {
        Self {
            name: name.into(),
            class_tier,
            role,
            state: ProvisionState::Declared,
            id: None,
            public_addr: None,
            private_addr: None,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.state == ProvisionState::Ready
    }

    /// Public address, or an error naming the device when it is not ready yet
    pub fn public_addr(&self) -> Result<&str> {
        self.public_addr
            .as_deref()
            .ok_or_else(|| AppError::internal(format!("{}: no public address recorded", self.name)))
    }

    /// Private address, or an error naming the device when it is not ready yet
    pub fn private_addr(&self) -> Result<&str> {
        self.private_addr
            .as_deref()
            .ok_or_else(|| AppError::internal(format!("{}: no private address recorded", self.name)))
    }
}

/// The set of devices active for one run, keyed by logical name
///
/// Iteration order is the lexicographic name order, so every fan-out and the
/// generated test matrix are reproducible across runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSet {
    devices: BTreeMap<String, Device>,
}

impl DeviceSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// The standard fleet: one source/target pair per class tier
    pub fn standard(class_tiers: &[u8]) -> Self {
        let mut set = Self::new();
        for &tier in class_tiers {
            set.insert(Device::new(format!("source{}", tier), tier, DeviceRole::Source));
            set.insert(Device::new(format!("target{}", tier), tier, DeviceRole::Target));
        }
        set
    }

    pub fn insert(&mut self, device: Device) {
        self.devices.insert(device.name.clone(), device);
    }

    pub fn get(&self, name: &str) -> Option<&Device> {
        self.devices.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Device> {
        self.devices.get_mut(name)
    }

    /// Device lookup that treats a missing name as an internal error
    pub fn require(&self, name: &str) -> Result<&Device> {
        self.get(name)
            .ok_or_else(|| AppError::internal(format!("unknown device: {}", name)))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Device> {
        self.devices.values()
    }

    pub fn names(&self) -> Vec<String> {
        self.devices.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Devices with the target role, in name order
    pub fn targets(&self) -> Vec<&Device> {
        self.iter().filter(|d| d.role == DeviceRole::Target).collect()
    }

    /// Names of devices not yet ready, in name order
    pub fn outstanding(&self) -> Vec<String> {
        self.iter()
            .filter(|d| !d.is_ready())
            .map(|d| d.name.clone())
            .collect()
    }

    pub fn all_ready(&self) -> bool {
        self.iter().all(Device::is_ready)
    }

    /// Resolve the source-role counterpart of a target device.
    ///
    /// The counterpart is the unique source-role device on the same class
    /// tier. Zero or multiple candidates mean the fleet cannot run remote
    /// scope tests and is rejected before anything is provisioned.
    pub fn source_counterpart(&self, target: &Device) -> Result<&Device> {
        let mut candidates = self
            .iter()
            .filter(|d| d.role == DeviceRole::Source && d.class_tier == target.class_tier);

        let first = candidates.next().ok_or_else(|| {
            AppError::validation(format!(
                "target {} (tier {}) has no source counterpart",
                target.name, target.class_tier
            ))
        })?;

        if let Some(second) = candidates.next() {
            return Err(AppError::validation(format!(
                "target {} (tier {}) has multiple source counterparts ({}, {}, ...)",
                target.name, target.class_tier, first.name, second.name
            )));
        }

        Ok(first)
    }

    /// Check that every target has exactly one source counterpart
    pub fn validate_remote_pairing(&self) -> Result<()> {
        for target in self.targets() {
            self.source_counterpart(target)?;
        }
        Ok(())
    }
}
