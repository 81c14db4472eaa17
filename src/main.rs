//! Signon binary entry point: one login attempt, token on stdout.

use std::sync::Arc;

use signon::config::AuthRequest;
use signon::environment::EnvironmentSnapshot;
use signon::flows::HttpAuthBackend;
use signon::selector::FlowSelector;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let request = AuthRequest::from_env()?;
    let snapshot = EnvironmentSnapshot::probe(&request);

    let selector = FlowSelector::new(Arc::new(HttpAuthBackend::new()));
    let token = selector.acquire(&snapshot, &request).await?;

    println!("{}", token.access_token);
    Ok(())
}
