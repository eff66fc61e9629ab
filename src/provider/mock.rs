//! In-memory resource provider for testing
//!
//! Tracks projects, keys and devices like the real provider and records
//! every operation so tests can assert on call order. Device listings can be
//! scripted round by round to exercise readiness polling; with nothing
//! scripted, created devices list as active with synthesized addresses.

use crate::error::{AppError, Result};
use crate::provider::{
    DeviceCreate, DeviceRecord, IpAddressRecord, Project, ResourceApi, SshKeyRecord, ACTIVE_STATE,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
struct ApiInner {
    next_id: u32,
    projects: HashMap<String, Project>,
    ssh_keys: Vec<SshKeyRecord>,
    devices: Vec<DeviceRecord>,
    listing_rounds: VecDeque<Result<Vec<DeviceRecord>>>,
    create_device_failures: Vec<String>,
    delete_device_failures: Vec<String>,
    calls: Vec<String>,
}

impl ApiInner {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}-{}", prefix, self.next_id)
    }
}

/// Scriptable in-memory `ResourceApi` implementation
#[derive(Debug, Default)]
pub struct InMemoryApi {
    inner: Arc<Mutex<ApiInner>>,
}

impl InMemoryApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Preload an existing project (for project-reuse scenarios)
    pub fn seed_project(&self, id: &str, name: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.projects.insert(
            id.to_string(),
            Project {
                id: id.to_string(),
                name: name.to_string(),
            },
        );
    }

    /// Preload a device that already exists in the project
    pub fn seed_device(&self, record: DeviceRecord) {
        self.inner.lock().unwrap().devices.push(record);
    }

    /// Preload a registered ssh key
    pub fn seed_ssh_key(&self, record: SshKeyRecord) {
        self.inner.lock().unwrap().ssh_keys.push(record);
    }

    /// Script the reply for one future `list_devices` call. Rounds are
    /// consumed in order; once exhausted the default listing applies.
    pub fn push_listing_round(&self, round: Result<Vec<DeviceRecord>>) {
        self.inner.lock().unwrap().listing_rounds.push_back(round);
    }

    /// Make creation of the named device fail
    pub fn fail_create_device(&self, hostname: &str) {
        self.inner
            .lock()
            .unwrap()
            .create_device_failures
            .push(hostname.to_string());
    }

    /// Make deletion of the given device id fail
    pub fn fail_delete_device(&self, device_id: &str) {
        self.inner
            .lock()
            .unwrap()
            .delete_device_failures
            .push(device_id.to_string());
    }

    /// Every operation performed, in call order
    pub fn calls(&self) -> Vec<String> {
        self.inner.lock().unwrap().calls.clone()
    }

    /// Devices currently known to the provider
    pub fn devices(&self) -> Vec<DeviceRecord> {
        self.inner.lock().unwrap().devices.clone()
    }

    /// Synthesize deterministic addresses for a created device
    fn addresses_for(index: u32) -> Vec<IpAddressRecord> {
        vec![
            IpAddressRecord {
                address: format!("198.51.100.{}", index),
                public: true,
                address_family: 4,
            },
            IpAddressRecord {
                address: format!("10.99.0.{}", index),
                public: false,
                address_family: 4,
            },
        ]
    }
}

impl Clone for InMemoryApi {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[async_trait]
impl ResourceApi for InMemoryApi {
    async fn create_project(&self, name: &str) -> Result<Project> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push("create_project".to_string());
        let id = inner.next_id("proj");
        let project = Project {
            id: id.clone(),
            name: name.to_string(),
        };
        inner.projects.insert(id, project.clone());
        Ok(project)
    }

    async fn get_project(&self, id: &str) -> Result<Project> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(format!("get_project {}", id));
        inner
            .projects
            .get(id)
            .cloned()
            .ok_or_else(|| AppError::resource_api(format!("project {} does not exist", id)))
    }

    async fn delete_project(&self, id: &str) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(format!("delete_project {}", id));
        inner
            .projects
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| AppError::resource_api(format!("project {} does not exist", id)))
    }

    async fn list_ssh_keys(&self) -> Result<Vec<SshKeyRecord>> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push("list_ssh_keys".to_string());
        Ok(inner.ssh_keys.clone())
    }

    async fn add_ssh_key(&self, label: &str, key: &str) -> Result<SshKeyRecord> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push("add_ssh_key".to_string());
        let id = inner.next_id("key");
        let record = SshKeyRecord {
            id,
            label: label.to_string(),
            key: key.to_string(),
        };
        inner.ssh_keys.push(record.clone());
        Ok(record)
    }

    async fn delete_ssh_key(&self, id: &str) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(format!("delete_ssh_key {}", id));
        let before = inner.ssh_keys.len();
        inner.ssh_keys.retain(|k| k.id != id);
        if inner.ssh_keys.len() == before {
            return Err(AppError::resource_api(format!("ssh key {} does not exist", id)));
        }
        Ok(())
    }

    async fn list_devices(&self, project_id: &str) -> Result<Vec<DeviceRecord>> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(format!("list_devices {}", project_id));

        if let Some(round) = inner.listing_rounds.pop_front() {
            return round;
        }

        // default: everything the provider knows is active with addresses
        let devices = inner
            .devices
            .iter()
            .enumerate()
            .map(|(i, d)| {
                let mut record = d.clone();
                if record.state != ACTIVE_STATE {
                    record.state = ACTIVE_STATE.to_string();
                }
                if record.ip_addresses.is_empty() {
                    record.ip_addresses = Self::addresses_for(i as u32 + 1);
                }
                record
            })
            .collect();
        Ok(devices)
    }

    async fn create_device(&self, project_id: &str, request: &DeviceCreate) -> Result<DeviceRecord> {
        let mut inner = self.inner.lock().unwrap();
        inner
            .calls
            .push(format!("create_device {} {}", project_id, request.hostname));

        if inner.create_device_failures.contains(&request.hostname) {
            return Err(AppError::resource_api(format!(
                "cannot provision {}: no capacity",
                request.hostname
            )));
        }

        let id = inner.next_id("dev");
        let record = DeviceRecord {
            id,
            hostname: request.hostname.clone(),
            state: "provisioning".to_string(),
            ip_addresses: Vec::new(),
        };
        inner.devices.push(record.clone());
        Ok(record)
    }

    async fn delete_device(&self, device_id: &str) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(format!("delete_device {}", device_id));

        if inner.delete_device_failures.iter().any(|d| d == device_id) {
            return Err(AppError::resource_api(format!(
                "device {} is locked and cannot be deleted",
                device_id
            )));
        }

        let before = inner.devices.len();
        inner.devices.retain(|d| d.id != device_id);
        if inner.devices.len() == before {
            return Err(AppError::resource_api(format!(
                "device {} does not exist",
                device_id
            )));
        }
        Ok(())
    }
}
