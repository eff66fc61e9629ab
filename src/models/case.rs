//! Benchmark case and result records
//!
//! A `TestCase` is one benchmark invocation produced by the matrix generator;
//! it is immutable once generated. A `BenchmarkResult` is a completed case
//! plus the raw netperf output captured from the remote run.

use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Benchmark protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Protocol {
    Tcp,
    Udp,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Tcp => "TCP",
            Protocol::Udp => "UDP",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Protocol {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "TCP" => Ok(Protocol::Tcp),
            "UDP" => Ok(Protocol::Udp),
            _ => Err(AppError::parse(format!("Invalid protocol: {}", s))),
        }
    }
}

/// Network scope of a benchmark pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkScope {
    /// Source and target are the same device
    Local,
    /// Source dials a distinct paired device
    Remote,
}

impl NetworkScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            NetworkScope::Local => "local",
            NetworkScope::Remote => "remote",
        }
    }
}

impl fmt::Display for NetworkScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NetworkScope {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" => Ok(NetworkScope::Local),
            "remote" => Ok(NetworkScope::Remote),
            _ => Err(AppError::parse(format!("Invalid network scope: {}", s))),
        }
    }
}

/// One class of test run sharing one reflector lifecycle
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SuiteKind {
    /// netserver runs directly on the target host
    Metal,
    /// netserver runs in a container using the named docker network mode
    Container(String),
}

impl SuiteKind {
    pub fn as_str(&self) -> &str {
        match self {
            SuiteKind::Metal => "metal",
            SuiteKind::Container(mode) => mode,
        }
    }

    pub fn is_metal(&self) -> bool {
        matches!(self, SuiteKind::Metal)
    }
}

impl fmt::Display for SuiteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SuiteKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(AppError::parse("Suite name cannot be empty"));
        }
        match trimmed {
            "metal" => Ok(SuiteKind::Metal),
            mode => Ok(SuiteKind::Container(mode.to_string())),
        }
    }
}

impl Serialize for SuiteKind {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for SuiteKind {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// One benchmark invocation, immutable once generated
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TestCase {
    /// Suite this case belongs to
    #[serde(rename = "test")]
    pub suite: SuiteKind,
    /// Local or remote pairing
    #[serde(rename = "type")]
    pub scope: NetworkScope,
    /// Device that runs the benchmark client
    pub from: String,
    /// Device that runs the reflector
    pub to: String,
    /// netserver control port
    pub port: u16,
    /// Request/response repetitions per invocation
    #[serde(rename = "reps")]
    pub repetitions: u32,
    /// Payload size in bytes
    pub size: u32,
    /// TCP or UDP
    pub protocol: Protocol,
}

impl TestCase {
    /// Short human label used in per-case log lines
    pub fn label(&self) -> String {
        format!("test: {} {} {}", self.scope, self.protocol, self.size)
    }
}

/// Runtime record of a started reflector on a target device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReflectorHandle {
    /// Owning device name
    pub device: String,
    /// Process or container identifier captured from the start command
    pub reflector_id: String,
    /// Address benchmark clients should dial
    pub addr: String,
}

/// A completed test case plus the raw output captured from the remote run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BenchmarkResult {
    #[serde(flatten)]
    pub case: TestCase,
    /// Raw netperf output text
    pub results: String,
}
