//! Configuration view and validation commands: `backoffice config`.

use std::path::{Path, PathBuf};

use anyhow::Result;
use backoffice::config::{CONFIG_FILE, ConsoleToml, ENV_API_TOKEN, ENV_API_URL, ENV_TEST_USER};
use console::style;

use super::super::ConfigCommands;

pub fn cmd_config(config_path: Option<&Path>, command: Option<ConfigCommands>) -> Result<()> {
    match command {
        None | Some(ConfigCommands::Show) => {
            println!();
            println!("{}", style("Back-office Configuration").bold());
            println!("=========================");
            println!();

            let (toml, used) = ConsoleToml::discover(config_path)?;
            match &used {
                Some(path) => println!("Config file: {}", path.display()),
                None => println!("No {} found. Using default configuration.", CONFIG_FILE),
            }
            println!();

            println!("[api]");
            println!("  base_url = \"{}\"", toml.api.base_url);
            if let Some(user) = &toml.api.test_user {
                println!("  test_user = \"{}\"", user);
            }
            if toml.api.token.is_some() {
                println!("  token = \"********\"");
            }
            println!("  timeout_secs = {}", toml.api.timeout_secs);
            println!();

            println!("[server]");
            println!("  port = {}", toml.server.port);
            println!("  dev = {}", toml.server.dev);
            println!();

            println!("Effective values (with env overrides):");
            println!("  base_url = \"{}\"  ({})", toml.base_url(), ENV_API_URL);
            println!(
                "  test_user = {}  ({})",
                toml.test_user()
                    .map(|u| format!("\"{}\"", u))
                    .unwrap_or_else(|| "(none)".into()),
                ENV_TEST_USER
            );
            println!(
                "  token = {}  ({})",
                if toml.token().is_some() { "(set)" } else { "(none)" },
                ENV_API_TOKEN
            );
            println!();

            if used.is_none() {
                println!("Run 'backoffice config init' to create a {} file.", CONFIG_FILE);
                println!();
            }
        }
        Some(ConfigCommands::Validate) => {
            println!();
            println!("Validating configuration...");
            println!();

            let (toml, used) = ConsoleToml::discover(config_path)?;
            if used.is_none() {
                println!("No {} found. Checking defaults.", CONFIG_FILE);
            }
            let warnings = toml.validate();

            if warnings.is_empty() {
                println!("{}", style("Configuration is valid.").green());
            } else {
                println!("{}", style("Configuration warnings:").yellow());
                for warning in warnings {
                    println!("  - {}", warning);
                }
            }
            println!();
        }
        Some(ConfigCommands::Init) => {
            let path = config_path
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from(CONFIG_FILE));
            if path.exists() {
                println!("{} already exists at {}", CONFIG_FILE, path.display());
                println!("Delete it first if you want to recreate it.");
                return Ok(());
            }

            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            ConsoleToml::default().save(&path)?;

            println!("Created {} at {}", CONFIG_FILE, path.display());
            println!();
            println!("You can now customize:");
            println!("  - [api] base_url, test_user, token, timeout_secs");
            println!("  - [server] port, dev");
            println!();
        }
    }

    Ok(())
}
