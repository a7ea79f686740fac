use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cmd;

#[derive(Parser)]
#[command(name = "backoffice")]
#[command(version, about = "Back-office console for template-driven record forms")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to backoffice.toml. Defaults to ./backoffice.toml, then the user config directory.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Serve the console forms
    Serve {
        /// Port to serve on (overrides [server] port)
        #[arg(short, long)]
        port: Option<u16>,

        /// Enable dev mode (bind 0.0.0.0, permissive CORS)
        #[arg(long)]
        dev: bool,

        /// Open the console in a browser after the server starts
        #[arg(long)]
        open: bool,
    },
    /// List the templates of a collection with their fields
    Templates {
        /// `activity` or `space`
        kind: String,
    },
    /// Render a template's field inputs as HTML, offline
    Render {
        /// Template JSON file (`{id, name, fields: [...]}`)
        template: PathBuf,

        /// Stored custom field values to pre-fill (`[{name, value}, ...]`)
        #[arg(long)]
        values: Option<PathBuf>,
    },
    /// View or validate configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show the effective configuration
    Show,
    /// Validate the configuration file
    Validate,
    /// Create a default backoffice.toml
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    backoffice::telemetry::init_tracing(cli.verbose)?;

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Serve { port, dev, open } => cmd::cmd_serve(config_path, port, dev, open).await?,
        Commands::Templates { kind } => cmd::cmd_templates(config_path, &kind).await?,
        Commands::Render { template, values } => cmd::cmd_render(&template, values.as_deref())?,
        Commands::Config { command } => cmd::cmd_config(config_path, command)?,
    }

    Ok(())
}
