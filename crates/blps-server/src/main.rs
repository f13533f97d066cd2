// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of BLPS.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.
//
// For commercial licensing, please contact: info@solare.cz

use std::path::PathBuf;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use blps_server::build_state;
use blps_server::config::ServerConfig;

#[derive(Parser, Debug)]
#[command(name = "blps-server")]
#[command(author, version, about = "BLPS battery storage evaluation dashboard")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "blps.toml")]
    config: PathBuf,

    /// Port to listen on, overriding `server.port`
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("blps_server=info,blps_web=info,blps_client=info")
        }))
        .init();

    let cli = Cli::parse();
    info!(path = %cli.config.display(), "Loading configuration");
    let mut config = ServerConfig::from_file(&cli.config)?;
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    let state = build_state(&config)?;
    blps_web::start_web_server(state, &config.listen_address()).await
}
