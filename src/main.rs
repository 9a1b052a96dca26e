use anyhow::Result;
use clap::{Parser, Subcommand};

use labflow::config::LabflowConfig;
use labflow::{init_telemetry, server, shutdown_telemetry};

#[derive(Parser)]
#[command(name = "labflow")]
#[command(about = "Lab workflow coordinator: books devices and drives workflows through their lifecycle")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the workflow HTTP service (default)
    Serve {
        /// Interface to bind, overriding server.host
        #[arg(long)]
        host: Option<String>,
        /// Port to listen on, overriding server.port
        #[arg(long)]
        port: Option<u16>,
    },
    /// Print the resolved configuration as TOML
    Config,
}

fn load_config() -> Result<LabflowConfig> {
    LabflowConfig::load_env_file()?;
    LabflowConfig::load()
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Serve {
        host: None,
        port: None,
    }) {
        Commands::Serve { host, port } => {
            let mut config = load_config()?;
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            init_telemetry(&config.observability)?;

            let result = tokio::runtime::Runtime::new()?.block_on(async {
                server::run(&config).await
            });
            shutdown_telemetry();
            result
        }
        Commands::Config => {
            let config = load_config()?;
            print!("{}", config.to_toml()?);
            Ok(())
        }
    }
}
