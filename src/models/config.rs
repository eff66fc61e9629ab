//! Run configuration data model and validation

use crate::error::{AppError, Result};
use crate::models::{DeviceSet, NetworkScope, Protocol, SuiteKind};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Resolved configuration for one benchmark run
///
/// Built once from defaults overridden by caller-supplied selections and
/// immutable for the duration of the run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Protocols to benchmark
    #[serde(default = "default_protocols")]
    pub protocols: Vec<Protocol>,

    /// Payload sizes in bytes
    #[serde(default = "default_sizes")]
    pub sizes: Vec<u32>,

    /// Suites to run (metal and/or container network modes)
    #[serde(default = "default_suites")]
    pub suites: Vec<SuiteKind>,

    /// Network scopes to benchmark
    #[serde(default = "default_scopes")]
    pub scopes: Vec<NetworkScope>,

    /// Device class tiers active for this run
    #[serde(default = "default_class_tiers")]
    pub class_tiers: Vec<u8>,

    /// Reuse this provider project instead of creating a new one
    #[serde(default)]
    pub project_id: Option<String>,

    /// Skip destroying devices, project and key at the end of the run
    #[serde(default)]
    pub keep_resources: bool,

    /// Provider facility devices are created in
    #[serde(default = "default_facility")]
    pub facility: String,

    /// Operating system image for created devices
    #[serde(default = "default_operating_system")]
    pub operating_system: String,

    /// netserver control port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request/response repetitions per benchmark invocation
    #[serde(default = "default_repetitions")]
    pub repetitions: u32,

    /// Seconds to wait between readiness poll rounds
    #[serde(default = "default_check_delay_secs")]
    pub check_delay_secs: u64,

    /// Local directory of suite scripts uploaded to every device
    #[serde(default = "default_scripts_dir")]
    pub scripts_dir: PathBuf,

    /// Key-pair file read at startup, generated and persisted if missing
    #[serde(default = "default_key_file")]
    pub key_file: PathBuf,

    /// Provider API token
    #[serde(default, skip_serializing)]
    pub api_token: String,

    /// Enable colored terminal output
    #[serde(default = "default_enable_color")]
    pub enable_color: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            protocols: default_protocols(),
            sizes: default_sizes(),
            suites: default_suites(),
            scopes: default_scopes(),
            class_tiers: default_class_tiers(),
            project_id: None,
            keep_resources: false,
            facility: default_facility(),
            operating_system: default_operating_system(),
            port: default_port(),
            repetitions: default_repetitions(),
            check_delay_secs: default_check_delay_secs(),
            scripts_dir: default_scripts_dir(),
            key_file: default_key_file(),
            api_token: String::new(),
            enable_color: default_enable_color(),
        }
    }
}

impl RunConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay between readiness poll rounds
    pub fn check_delay(&self) -> Duration {
        Duration::from_secs(self.check_delay_secs)
    }

    /// Build the active device set for this run
    pub fn active_devices(&self) -> DeviceSet {
        DeviceSet::standard(&self.class_tiers)
    }

    /// Validate the configuration and return any errors
    ///
    /// Everything that can fail before a provider or remote call is made
    /// fails here, including the source/target pairing needed for remote
    /// scope tests.
    pub fn validate(&self) -> Result<()> {
        if self.protocols.is_empty() {
            return Err(AppError::config("No protocols selected"));
        }
        if self.sizes.is_empty() {
            return Err(AppError::config("No payload sizes selected"));
        }
        if self.suites.is_empty() {
            return Err(AppError::config("No test suites selected"));
        }
        if self.scopes.is_empty() {
            return Err(AppError::config("No network scopes selected"));
        }
        if self.class_tiers.is_empty() {
            return Err(AppError::config("No device class tiers selected"));
        }

        for &size in &self.sizes {
            if size == 0 {
                return Err(AppError::config("Payload size must be greater than 0"));
            }
        }

        if self.port == 0 {
            return Err(AppError::config("netserver port must be greater than 0"));
        }
        if self.repetitions == 0 {
            return Err(AppError::config("Repetition count must be greater than 0"));
        }
        if self.api_token.is_empty() {
            return Err(AppError::config(
                "No provider API token (set PACKET_AUTH_TOKEN or create a token file)",
            ));
        }

        let devices = self.active_devices();
        if devices.is_empty() {
            return Err(AppError::config("Device class tier selection matches no devices"));
        }
        if self.scopes.contains(&NetworkScope::Remote) {
            devices.validate_remote_pairing()?;
        }

        Ok(())
    }

    /// Container suites in configured order (everything except metal)
    pub fn container_suites(&self) -> Vec<&SuiteKind> {
        self.suites.iter().filter(|s| !s.is_metal()).collect()
    }

    /// Whether the bare-metal suite was requested
    pub fn metal_requested(&self) -> bool {
        self.suites.iter().any(SuiteKind::is_metal)
    }
}

// Default value functions for serde
fn default_protocols() -> Vec<Protocol> {
    crate::defaults::DEFAULT_PROTOCOLS.to_vec()
}

fn default_sizes() -> Vec<u32> {
    crate::defaults::DEFAULT_SIZES.to_vec()
}

fn default_suites() -> Vec<SuiteKind> {
    crate::defaults::DEFAULT_SUITES
        .iter()
        .map(|s| s.parse().expect("default suite names are valid"))
        .collect()
}

fn default_scopes() -> Vec<NetworkScope> {
    crate::defaults::DEFAULT_SCOPES.to_vec()
}

fn default_class_tiers() -> Vec<u8> {
    crate::defaults::DEFAULT_CLASS_TIERS.to_vec()
}

fn default_facility() -> String {
    crate::defaults::FACILITY.to_string()
}

fn default_operating_system() -> String {
    crate::defaults::OPERATING_SYSTEM.to_string()
}

fn default_port() -> u16 {
    crate::defaults::NETSERVER_PORT
}

fn default_repetitions() -> u32 {
    crate::defaults::DEFAULT_REPETITIONS
}

fn default_check_delay_secs() -> u64 {
    crate::defaults::CHECK_DELAY.as_secs()
}

fn default_scripts_dir() -> PathBuf {
    PathBuf::from(crate::defaults::SCRIPTS_DIR)
}

fn default_key_file() -> PathBuf {
    PathBuf::from(crate::defaults::KEY_FILE)
}

fn default_enable_color() -> bool {
    true
}
