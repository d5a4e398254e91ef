use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;

use newsdesk::api::ApiClient;
use newsdesk::app::{App, AppEvent};
use newsdesk::config::Config;
use newsdesk::keybindings::KeybindingRegistry;
use newsdesk::ui;

/// Get the config directory path (~/.config/newsdesk/)
fn get_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".config").join("newsdesk"))
}

/// Create the config directory if needed, readable by the user only.
fn ensure_config_dir(config_dir: &Path) -> Result<()> {
    if !config_dir.exists() {
        std::fs::create_dir_all(config_dir).context("Failed to create config directory")?;
        tracing::info!(path = %config_dir.display(), "Created config directory");
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        match std::fs::metadata(config_dir) {
            Ok(metadata) => {
                let mut perms = metadata.permissions();
                perms.set_mode(0o700);
                if let Err(e) = std::fs::set_permissions(config_dir, perms) {
                    tracing::warn!(
                        path = %config_dir.display(),
                        error = %e,
                        "Failed to set config directory permissions to 0700"
                    );
                }
            }
            Err(e) => {
                tracing::warn!(
                    path = %config_dir.display(),
                    error = %e,
                    "Failed to read config directory metadata"
                );
            }
        }
    }
    Ok(())
}

#[derive(Parser, Debug)]
#[command(
    name = "newsdesk",
    about = "Terminal client for a news aggregation server"
)]
struct Args {
    /// Config file (default: ~/.config/newsdesk/config.toml)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Backend root URL, overriding server_url from the config file
    #[arg(long, value_name = "URL")]
    server: Option<String>,

    /// Account to pre-fill on the login screen
    #[arg(long, value_name = "NAME")]
    account: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let config_path = match args.config {
        Some(path) => path,
        None => {
            let dir = get_config_dir()?;
            ensure_config_dir(&dir)?;
            dir.join("config.toml")
        }
    };

    let mut config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;
    if let Some(server) = args.server {
        config.server_url = server;
    }
    if let Some(account) = args.account {
        config.account = Some(account);
    }

    let mut keybindings = KeybindingRegistry::new();
    for warning in keybindings.apply_overrides(&config.keybindings) {
        tracing::warn!("{warning}");
    }

    let api = ApiClient::new(&config.server_url, config.timeouts())
        .with_context(|| format!("Invalid server URL '{}'", config.server_url))?;
    tracing::info!(server = %api.base_url(), "Starting newsdesk");

    let (event_tx, event_rx) = mpsc::channel::<AppEvent>(32);
    let mut app = App::new(&config, api, keybindings, event_tx.clone());

    ui::run(&mut app, event_tx, event_rx).await?;

    println!("Goodbye!");
    Ok(())
}
