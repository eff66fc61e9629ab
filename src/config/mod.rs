//! Configuration parsing from CLI arguments and the environment

use crate::{
    cli::Cli,
    defaults,
    error::{AppError, Result},
    models::RunConfig,
};
use std::path::Path;

/// Configuration parser that layers defaults, environment and CLI overrides
pub struct ConfigParser {
    cli: Cli,
}

impl ConfigParser {
    /// Create a new configuration parser with CLI arguments
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Parse and build the complete run configuration
    pub fn parse(&self) -> Result<RunConfig> {
        self.cli.validate().map_err(AppError::config)?;

        // Start with default configuration
        let mut config = RunConfig::default();

        // Load .env if present, then resolve the provider token
        dotenv::dotenv().ok();
        config.api_token = resolve_token()?;

        // Override with CLI arguments
        self.apply_cli_overrides(&mut config);

        // Validate the final configuration
        config.validate()?;

        Ok(config)
    }

    /// Apply CLI argument overrides to the configuration
    fn apply_cli_overrides(&self, config: &mut RunConfig) {
        if !self.cli.protocols.is_empty() {
            config.protocols = uniq(&self.cli.protocols);
        }
        if !self.cli.sizes.is_empty() {
            config.sizes = uniq(&self.cli.sizes);
        }
        if !self.cli.tests.is_empty() {
            config.suites = uniq(&self.cli.tests);
        }
        if !self.cli.networks.is_empty() {
            config.scopes = uniq(&self.cli.networks);
        }
        if !self.cli.types.is_empty() {
            // tier selection filters the standard fleet, it cannot extend it
            let requested = uniq(&self.cli.types);
            config.class_tiers = defaults::DEFAULT_CLASS_TIERS
                .iter()
                .copied()
                .filter(|tier| requested.contains(tier))
                .collect();
        }

        config.project_id = self.cli.project.clone();
        config.keep_resources = self.cli.keep;
        config.enable_color = self.cli.use_colors();
    }
}

/// Provider token from the environment, falling back to the token file
fn resolve_token() -> Result<String> {
    if let Ok(token) = std::env::var(defaults::TOKEN_ENV) {
        let token = token.trim().to_string();
        if !token.is_empty() {
            return Ok(token);
        }
    }

    let path = Path::new(defaults::TOKEN_FILE);
    if path.exists() {
        let token = std::fs::read_to_string(path)
            .map_err(|e| AppError::io(format!("cannot read token file: {}", e)))?;
        return Ok(token.trim().to_string());
    }

    Ok(String::new())
}

/// Deduplicate while preserving first-use order
fn uniq<T: PartialEq + Clone>(values: &[T]) -> Vec<T> {
    let mut out: Vec<T> = Vec::with_capacity(values.len());
    for value in values {
        if !out.contains(value) {
            out.push(value.clone());
        }
    }
    out
}
