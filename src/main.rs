use clap::Parser;
use lorabridge::cli::Cli;
use lorabridge::cli::Commands;
use lorabridge::AppConfig;
use lorabridge::Result;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration (missing file just means an unconfigured gateway)
    let config = AppConfig::load()?;

    // Initialize logging
    if cli.verbose {
        lorabridge::logging::init_logging_with_level("debug")?;
    } else {
        lorabridge::logging::init_logging_with_config(&config.logging)?;
    }

    match cli.command {
        Commands::Serve { host, port } => {
            lorabridge::api::serve(config, host, port).await?;
        }
        Commands::Status => {
            lorabridge::cli::handle_status_command(config).await?;
        }
        Commands::Routes => {
            lorabridge::cli::handle_routes_command(&config);
        }
    }

    Ok(())
}
