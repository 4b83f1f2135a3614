//! Shared helpers for the end-to-end race tests.
use mock_service::{EventConfig, EventState};
use stampede::prelude::*;
use std::io::Write;
use std::net::SocketAddr;
use std::num::NonZeroUsize;
use std::sync::OnceLock;
use std::time::Duration;
use tempfile::NamedTempFile;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

pub fn init() {
    static ONCE_LOCK: OnceLock<()> = OnceLock::new();

    ONCE_LOCK.get_or_init(|| {
        let _ = FmtSubscriber::builder()
            .with_max_level(Level::INFO)
            .with_test_writer()
            .try_init();
    });
}

/// A running mock event and the handle used to inspect it.
pub struct MockEvent {
    pub addr: SocketAddr,
    pub state: EventState,
}

impl MockEvent {
    pub async fn start(config: EventConfig) -> anyhow::Result<Self> {
        let state = EventState::new(config);
        let (addr, _handle) = mock_service::spawn(state.clone()).await?;
        Ok(Self { addr, state })
    }

    pub fn config(&self, clients: usize, credentials: &NamedTempFile) -> RaceConfig {
        let target = format!("http://{}", self.addr)
            .parse()
            .expect("socket address is a valid url");
        let mut config = RaceConfig::new("e2e", target);
        config.clients = NonZeroUsize::new(clients).expect("at least one client");
        config.credentials = credentials.path().to_path_buf();
        config.max_duration = Duration::from_secs(30);
        config.request_timeout = Some(Duration::from_secs(20));
        config
    }
}

/// `token-1` through `token-{count}`, one per line, with a few blank lines mixed in.
pub fn token_file(count: usize) -> anyhow::Result<NamedTempFile> {
    let mut file = NamedTempFile::new()?;
    for i in 1..=count {
        writeln!(file, "token-{i}")?;
        if i % 100 == 0 {
            writeln!(file)?;
        }
    }
    file.flush()?;
    Ok(file)
}
