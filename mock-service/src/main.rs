use mock_service::{EventConfig, EventState};
use std::net::SocketAddr;
use std::time::Duration;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

const DEFAULT_ADDR: &str = "0.0.0.0:3002";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("mock_service=info,tower_http=info")),
        )
        .init();

    let addr: SocketAddr = std::env::var("MOCK_ADDR")
        .unwrap_or_else(|_| DEFAULT_ADDR.to_string())
        .parse()?;
    let stock = std::env::var("MOCK_STOCK")
        .ok()
        .map(|s| s.parse())
        .transpose()?
        .unwrap_or(1);
    let delay = std::env::var("MOCK_DELAY_MS")
        .ok()
        .map(|s| s.parse())
        .transpose()?
        .map(Duration::from_millis)
        .unwrap_or_default();

    mock_service::run(addr, EventState::new(EventConfig::new(stock).delay(delay))).await
}
