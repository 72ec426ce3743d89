// Switchboard query router
// Main entry point for the switchboard binary

use clap::Parser;
use switchboard_engine::cli::{
    handle_ask, handle_route, handle_serve, handle_status, Cli, Command, OutputFormat,
};
use switchboard_engine::config::Config;
use switchboard_engine::telemetry::init_telemetry_with_level;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration (or use custom path if provided)
    let config = if let Some(config_path) = &cli.config {
        Config::load_from_path(config_path)?
    } else {
        Config::load_or_create()?
    };

    // --log beats the config file; RUST_LOG beats both
    let log_level = cli.log.as_deref().unwrap_or(&config.core.log_level);
    init_telemetry_with_level(log_level);

    tracing::info!("Switchboard v{}", env!("CARGO_PKG_VERSION"));

    let format = OutputFormat::from_flag(cli.json);

    match cli.command {
        Command::Serve { host, port } => handle_serve(&config, host, port).await,
        Command::Ask { prompt } => handle_ask(&prompt, &config, format).await,
        Command::Route { prompt } => handle_route(&prompt, &config, format),
        Command::Status => handle_status(&config, format).await,
    }
}
