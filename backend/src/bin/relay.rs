use anyhow::Context;
use autoresponder::automation::agents::GeminiPage;
use autoresponder::automation::core::BrowserSession;
use autoresponder::automation::{CoordinatorHandle, CoordinatorStatus, LogSink, TaskCoordinator};
use autoresponder::client::{http_client, TaskClient};
use autoresponder::config::{RelayConfig, Settings};
use clap::Parser;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Drives the Gemini tab: polls the task queue, submits prompts, reports replies.
#[derive(Parser, Debug)]
#[command(name = "relay", version)]
struct Args {
    /// TOML file with settings, timing, page selectors and browser options.
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    server_url: Option<String>,

    #[arg(long)]
    interval_ms: Option<u64>,

    /// Start with automation enabled.
    #[arg(long)]
    enable: bool,

    /// Attach to Chrome on this DevTools port if it is already running.
    #[arg(long)]
    debug_port: Option<u16>,

    #[arg(long)]
    headless: bool,
}

fn load_config(args: &Args) -> anyhow::Result<RelayConfig> {
    let mut config = match &args.config {
        Some(path) => RelayConfig::load(path)?,
        None => RelayConfig::default(),
    };
    if let Some(url) = &args.server_url {
        config.settings.server_url = url.clone();
    }
    if let Some(ms) = args.interval_ms {
        config.settings.polling_interval_ms = ms;
    }
    if args.enable {
        config.settings.enabled = true;
    }
    if args.debug_port.is_some() {
        config.browser.debug_port = args.debug_port;
    }
    if args.headless {
        config.browser.headless = true;
    }
    config.settings.validate()?;
    Ok(config)
}

fn settings_from(status: &CoordinatorStatus) -> Settings {
    Settings {
        enabled: status.enabled,
        server_url: status.server_url.clone(),
        polling_interval_ms: status.polling_interval_ms,
    }
}

/// Applies one console line. Returns false when the relay should exit.
async fn handle_line(handle: &CoordinatorHandle, line: &str) -> bool {
    let mut parts = line.split_whitespace();
    let command = parts.next().unwrap_or_default();
    let arg = parts.next();

    match (command, arg) {
        ("", _) => {}
        ("enable", _) => {
            handle.enable().await;
        }
        ("disable", _) => {
            handle.disable().await;
        }
        ("interval", Some(value)) => match value.parse::<u64>() {
            Ok(ms) => {
                if let Some(status) = handle.status().await {
                    let settings = Settings { polling_interval_ms: ms, ..settings_from(&status) };
                    if let Err(e) = handle.update_settings(settings).await {
                        warn!(error = %e, "settings rejected");
                    }
                }
            }
            Err(_) => warn!(value, "interval must be a number of milliseconds"),
        },
        ("server", Some(url)) => {
            if let Some(status) = handle.status().await {
                let settings = Settings { server_url: url.to_string(), ..settings_from(&status) };
                if let Err(e) = handle.update_settings(settings).await {
                    warn!(error = %e, "settings rejected");
                }
            }
        }
        ("status", _) => match handle.status().await {
            Some(status) => match serde_json::to_string(&status) {
                Ok(json) => println!("{}", json),
                Err(e) => warn!(error = %e, "could not render status"),
            },
            None => warn!("coordinator is not running"),
        },
        ("quit" | "exit", _) => return false,
        _ => println!("commands: enable | disable | interval <ms> | server <url> | status | quit"),
    }
    true
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config = load_config(&args)?;

    let http = http_client(&config.timing).context("building HTTP client")?;
    let session = BrowserSession::start(&config.browser, &http)
        .await
        .context("starting browser")?;
    let page = session
        .open_page(&config.page.url)
        .await
        .context("opening host page")?;

    let coordinator = TaskCoordinator::new(
        config.settings.clone(),
        config.timing,
        TaskClient::new(http),
        GeminiPage::new(page, config.page.clone()),
        LogSink,
    );
    let (handle, control) = CoordinatorHandle::channel(32);
    let worker = tokio::spawn(coordinator.run(control));
    info!(enabled = config.settings.enabled, "relay ready; type `help` for commands");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    if !handle_line(&handle, line.trim()).await {
                        break;
                    }
                }
                Ok(None) => {
                    // Stdin closed: keep relaying until Ctrl-C.
                    tokio::signal::ctrl_c().await?;
                    break;
                }
                Err(e) => {
                    warn!(error = %e, "stdin read failed");
                    break;
                }
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    info!("shutting down");
    handle.shutdown().await;
    if let Err(e) = worker.await {
        warn!(error = %e, "coordinator task failed");
    }
    session.close().await;
    Ok(())
}
