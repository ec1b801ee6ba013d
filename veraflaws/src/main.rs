//! Veraflaws - Veracode flaw export tool
//!
//! Writes the open flaws of every application's latest completed build to CSV
use chrono::Local;
use clap::Parser;
use log::info;
use veracode_platform::{VeracodeClient, VeracodeConfig};
use veraflaws::{Result, cli::Args, credentials};

#[tokio::main]
async fn main() {
    // Initialize logging; row write failures are reported on stdout
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stdout)
        .init();

    let args = Args::parse();

    if let Err(e) = export(args).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn export(args: Args) -> Result<()> {
    info!("Veraflaws - Veracode flaw export");

    let veracode_credentials = credentials::load_credentials(&args.creds_file)?;
    let config = VeracodeConfig::from_credentials(veracode_credentials).with_region(args.region);
    let client = VeracodeClient::new(config)?;

    let run_config = args.run_config(&Local::now());
    info!("Writing flaws to {}", run_config.output_path.display());

    let summary = veraflaws::run(&client, &run_config).await?;
    summary.log();

    Ok(())
}
