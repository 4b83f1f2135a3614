//! A first-come-first-served event endpoint to race against.
//!
//! `POST /api/event/apply` hands out a limited stock: callers who get one receive
//! `202 Accepted`, everyone else (and anyone applying twice) receives `409 Conflict`.
use axum::{
    debug_handler,
    extract::State,
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicI64, AtomicU64, Ordering},
    Arc, Mutex,
};
use std::time::Duration;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

#[derive(Clone, Debug, Default)]
pub struct EventConfig {
    pub stock: i64,
    /// Artificial processing time per request.
    pub delay: Duration,
    /// Tokens whose requests never get an answer.
    pub hang: HashSet<String>,
}

impl EventConfig {
    pub fn new(stock: i64) -> Self {
        Self {
            stock,
            ..Default::default()
        }
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn hang_on(mut self, token: &str) -> Self {
        self.hang.insert(token.to_string());
        self
    }
}

#[derive(Clone)]
pub struct EventState {
    inner: Arc<Inner>,
}

struct Inner {
    stock: AtomicI64,
    applicants: Mutex<HashSet<String>>,
    requests: AtomicU64,
    delay: Duration,
    hang: HashSet<String>,
}

impl EventState {
    pub fn new(config: EventConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                stock: AtomicI64::new(config.stock),
                applicants: Mutex::new(HashSet::new()),
                requests: AtomicU64::new(0),
                delay: config.delay,
                hang: config.hang,
            }),
        }
    }

    /// Apply requests received so far, including rejected ones.
    pub fn requests(&self) -> u64 {
        self.inner.requests.load(Ordering::SeqCst)
    }

    pub fn stock(&self) -> i64 {
        self.inner.stock.load(Ordering::SeqCst)
    }

    fn reset(&self, stock: i64) {
        self.inner.stock.store(stock, Ordering::SeqCst);
        if let Ok(mut applicants) = self.inner.applicants.lock() {
            applicants.clear();
        }
    }
}

pub fn router(state: EventState) -> Router {
    Router::new()
        .route("/api/event/apply", post(apply))
        .route("/api/admin/event/stock", post(set_stock))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

pub async fn run(addr: SocketAddr, state: EventState) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Mock event service listening on {}", listener.local_addr()?);
    axum::serve(listener, router(state)).await?;
    Ok(())
}

/// Serve on an ephemeral local port in the background.
pub async fn spawn(state: EventState) -> anyhow::Result<(SocketAddr, JoinHandle<()>)> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let app = router(state);

    let handle = tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, app).await {
            tracing::error!("Mock event service stopped: {err}");
        }
    });

    Ok((addr, handle))
}

#[debug_handler]
async fn apply(State(state): State<EventState>, headers: HeaderMap) -> StatusCode {
    let inner = &state.inner;
    inner.requests.fetch_add(1, Ordering::SeqCst);

    let Some(token) = bearer_token(&headers) else {
        return StatusCode::UNAUTHORIZED;
    };

    if inner.hang.contains(token) {
        std::future::pending::<()>().await;
    }

    if !inner.delay.is_zero() {
        tokio::time::sleep(inner.delay).await;
    }

    let first_attempt = match inner.applicants.lock() {
        Ok(mut applicants) => applicants.insert(token.to_string()),
        Err(_) => return StatusCode::INTERNAL_SERVER_ERROR,
    };
    if !first_attempt {
        debug!("Repeated application");
        return StatusCode::CONFLICT;
    }

    let remaining = inner.stock.fetch_sub(1, Ordering::SeqCst) - 1;
    if remaining < 0 {
        inner.stock.fetch_add(1, Ordering::SeqCst);
        debug!("Event closed");
        return StatusCode::CONFLICT;
    }

    debug!("Application accepted, {remaining} left");
    StatusCode::ACCEPTED
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SetStock {
    pub stock: i64,
}

#[debug_handler]
async fn set_stock(
    State(state): State<EventState>,
    Json(request): Json<SetStock>,
) -> Result<Json<SetStock>, StatusCode> {
    if request.stock < 0 {
        return Err(StatusCode::BAD_REQUEST);
    }

    state.reset(request.stock);
    Ok(Json(SetStock {
        stock: state.stock(),
    }))
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then_some(token)
}
