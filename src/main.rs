//! netperf-fleet - Main CLI application
//!
//! Provisions a fleet of remote devices, runs the configured benchmark
//! matrix across them and tears the fleet down again.

use clap::Parser;
use netperf_fleet::{
    cli::Cli,
    config::ConfigParser,
    defaults,
    error::Result,
    keys::KeyPair,
    logging::Logger,
    orchestrator::Orchestrator,
    provider::PacketClient,
    report::ReportFormatter,
    transport::SshExecutor,
};
use std::process;

#[tokio::main]
async fn main() {
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("Application panic: {}", panic_info);
        process::exit(1);
    }));

    let cli = Cli::parse();
    let use_color = cli.use_colors();

    if let Err(e) = run_application(cli).await {
        eprintln!("{}", e.format_for_console(use_color));
        process::exit(e.exit_code());
    }
}

/// Main application logic
async fn run_application(cli: Cli) -> Result<()> {
    let config = ConfigParser::new(cli).parse()?;
    let logger = Logger::new(config.enable_color);

    let key = KeyPair::load_or_generate(&config.key_file, defaults::KEY_COMMENT).await?;
    let api = PacketClient::new(defaults::API_BASE_URL, &config.api_token)?;
    let executor = SshExecutor::new(defaults::SSH_USER, &key.private_key_path);

    let orchestrator = Orchestrator::new(&api, &executor, &config, key, &logger);
    let report = orchestrator.run().await;

    // the accumulated result collection is printed even after a failed run
    let formatter = ReportFormatter::new(config.enable_color);
    println!("{}", ReportFormatter::to_json(&report.results)?);
    println!("{}", formatter.summary(&report));

    match report.error {
        None => Ok(()),
        Some(e) => Err(e),
    }
}
