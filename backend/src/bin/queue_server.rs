use anyhow::Context;
use autoresponder::queue::TaskQueue;
use autoresponder::{run_server, DEFAULT_ALLOWED_ORIGIN};
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// In-memory task queue between prompt senders and the relay.
#[derive(Parser, Debug)]
#[command(name = "queue_server", version)]
struct Args {
    #[arg(long, default_value = "127.0.0.1:8000")]
    bind: SocketAddr,

    /// Browser origin allowed to call the API. Repeat for more; `*` allows any.
    #[arg(long = "allow-origin", default_value = DEFAULT_ALLOWED_ORIGIN)]
    allow_origin: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let queue = Arc::new(TaskQueue::new());
    run_server(args.bind, queue, &args.allow_origin)
        .await
        .with_context(|| format!("serving on {}", args.bind))
}
