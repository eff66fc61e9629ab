//! Command-line interface

use crate::models::{NetworkScope, Protocol, SuiteKind};
use clap::{ArgAction, Parser};

/// netperf-fleet - distributed network performance benchmarks on a
/// provisioned bare-metal fleet
#[derive(Parser, Debug, Clone)]
#[command(name = "npf")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Use only devices of this class tier (repeatable; default: all tiers)
    #[arg(long = "type", value_name = "TIER", action = ArgAction::Append)]
    pub types: Vec<u8>,

    /// Protocol to test, TCP or UDP (repeatable; default: all)
    #[arg(long = "protocol", value_name = "PROTOCOL", action = ArgAction::Append)]
    pub protocols: Vec<Protocol>,

    /// Payload size to test, in bytes (repeatable; default: 300 500 1024 2048)
    #[arg(long = "size", value_name = "BYTES", action = ArgAction::Append)]
    pub sizes: Vec<u32>,

    /// Test suite to run, metal or a docker network mode
    /// (repeatable; default: metal bridge host)
    #[arg(long = "test", value_name = "SUITE", action = ArgAction::Append)]
    pub tests: Vec<SuiteKind>,

    /// Network test to perform, local or remote (repeatable; default: both)
    #[arg(long = "network", value_name = "SCOPE", action = ArgAction::Append)]
    pub networks: Vec<NetworkScope>,

    /// Use existing project ID instead of creating a new one
    #[arg(long, value_name = "ID")]
    pub project: Option<String>,

    /// Do not destroy devices or project at the end of the run
    #[arg(long)]
    pub keep: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,
}

impl Cli {
    /// Validate CLI arguments for conflicts and requirements
    pub fn validate(&self) -> Result<(), String> {
        if let Some(project) = &self.project {
            if project.trim().is_empty() {
                return Err("--project requires a non-empty project ID".to_string());
            }
        }
        for &size in &self.sizes {
            if size == 0 {
                return Err("--size must be greater than 0".to_string());
            }
        }
        Ok(())
    }

    /// Check if colors should be enabled
    pub fn use_colors(&self) -> bool {
        !self.no_color
    }
}
