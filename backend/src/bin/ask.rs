use anyhow::Context;
use autoresponder::client::http_client;
use autoresponder::config::{Timing, DEFAULT_SERVER_URL};
use autoresponder::prompt_client::PromptClient;
use clap::Parser;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

const DEFAULT_PROMPT: &str = "pythonで\"Hello world\"を表示するには";

/// Sends one prompt through the task queue and prints the answer.
#[derive(Parser, Debug)]
#[command(name = "ask", version)]
struct Args {
    #[arg(long, default_value = DEFAULT_SERVER_URL)]
    server: String,

    #[arg(short, long)]
    prompt: Option<String>,

    #[arg(long, default_value_t = 3000)]
    poll_ms: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let args = Args::parse();
    let prompt = args.prompt.unwrap_or_else(|| DEFAULT_PROMPT.to_string());
    let http = http_client(&Timing::default()).context("building HTTP client")?;
    let client = PromptClient::new(http, args.server);

    let task_id = client.send_prompt(&prompt).await.context("sending prompt")?;
    println!("[{}] {}", task_id, prompt);

    let response = client
        .wait_for_response(&task_id, Duration::from_millis(args.poll_ms))
        .await
        .with_context(|| format!("waiting for task {}", task_id))?;
    println!("--- [Response {} Received] ---", task_id);
    println!("{}", response);
    println!("--- [Response {} End] ---\n", task_id);
    Ok(())
}
