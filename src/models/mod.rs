//! Data models and structures for the fleet benchmark orchestrator

pub mod case;
pub mod config;
pub mod device;

// Re-export main model types
pub use case::{BenchmarkResult, NetworkScope, Protocol, ReflectorHandle, SuiteKind, TestCase};
pub use config::RunConfig;
pub use device::{Device, DeviceRole, DeviceSet, ProvisionState};
