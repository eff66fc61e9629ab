//! netperf-fleet
//!
//! Provisions a fleet of bare-metal cloud devices, runs a combinatorial
//! matrix of netperf benchmarks across them (bare metal and containerized,
//! over multiple protocols and network modes), collects the results and
//! tears the fleet down again.

pub mod cli;
pub mod config;
pub mod error;
pub mod keys;
pub mod logging;
pub mod matrix;
pub mod models;
pub mod orchestrator;
pub mod poller;
pub mod provider;
pub mod reflector;
pub mod report;
pub mod runner;
pub mod transport;

// Re-export commonly used types
pub use error::{AppError, Result};
pub use models::{
    BenchmarkResult, Device, DeviceRole, DeviceSet, NetworkScope, Protocol, ReflectorHandle,
    RunConfig, SuiteKind, TestCase,
};
pub use orchestrator::{Orchestrator, RunReport};

/// Application version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");

/// Default configuration values
pub mod defaults {
    use crate::models::{NetworkScope, Protocol};
    use std::time::Duration;

    pub const DEFAULT_PROTOCOLS: &[Protocol] = &[Protocol::Tcp, Protocol::Udp];
    pub const DEFAULT_SIZES: &[u32] = &[300, 500, 1024, 2048];
    pub const DEFAULT_SUITES: &[&str] = &["metal", "bridge", "host"];
    pub const DEFAULT_SCOPES: &[NetworkScope] = &[NetworkScope::Local, NetworkScope::Remote];
    pub const DEFAULT_CLASS_TIERS: &[u8] = &[1, 3];
    pub const DEFAULT_REPETITIONS: u32 = 50_000;

    /// Delay between device readiness poll rounds
    pub const CHECK_DELAY: Duration = Duration::from_secs(30);

    /// netserver control port
    pub const NETSERVER_PORT: u16 = 7002;
    /// netserver data connection port
    pub const NETSERVER_DATA_PORT: u16 = 7003;
    /// netperf local data port
    pub const NETSERVER_LOCAL_PORT: u16 = 7004;

    pub const FACILITY: &str = "ewr1";
    pub const OPERATING_SYSTEM: &str = "centos_7";
    pub const SSH_USER: &str = "root";

    /// Key-pair file read at startup, generated if missing
    pub const KEY_FILE: &str = "keys";
    pub const KEY_COMMENT: &str = "netperf-fleet-user";

    /// Provider token sources: environment first, then this file
    pub const TOKEN_ENV: &str = "PACKET_AUTH_TOKEN";
    pub const TOKEN_FILE: &str = "token";

    pub const API_BASE_URL: &str = "https://api.packet.net/";
    pub const PROJECT_PREFIX: &str = "netperf-fleet";

    /// Local suite-script directory and its remote destination
    pub const SCRIPTS_DIR: &str = "network-tests";
    pub const REMOTE_SCRIPTS_PATH: &str = "/root/network-tests/";

    /// Software installed on every device before any suite runs, in order
    pub const INSTALL_COMMANDS: &[&str] = &[
        "network-tests/scripts/installnetperf.sh",
        "network-tests/scripts/installdocker.sh",
        "docker build -t netperf network-tests/image",
    ];
}
