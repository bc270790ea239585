//! # Matchday API Server
//!
//! REST API over the cached sports and news services, consumed by the web frontend.
//!
//! ## Endpoints
//!
//! - `GET /api/fixtures?date=YYYY-MM-DD` - Fixtures on a day
//! - `GET /api/fixtures/live?live=all` - Fixtures in play
//! - `GET /api/matches/:id` - One fixture
//! - `GET /api/standings?leagueId=&season=` - League table
//! - `GET /api/leagues` - Leagues of the current season
//! - `GET /api/news`, `GET /api/news/latest`, `GET /api/news/:id` - News posts
//! - `GET /api/cache/stats`, `GET /api/cache/:key` - Cache inspection
//! - `DELETE /api/cache/:key`, `DELETE /api/cache` - Cache purge, operator-only
//!   (disable with `CACHE_ADMIN_ENABLED=false`)
//!
//! ## Example
//!
//! ```rust,ignore
//! use matchday_api::{ApiServer, ApiConfig};
//!
//! let server = ApiServer::new(ApiConfig::from_env())?;
//! server.run(([0, 0, 0, 0], 3001)).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod dto;
mod error;
mod handlers;
mod routes;
mod state;

pub use error::{ApiError, ErrorCode};
pub use routes::create_router;
pub use state::{ApiConfig, AppState};

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use matchday_core::error::Result;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

/// API server for Matchday.
pub struct ApiServer {
    state: Arc<AppState>,
}

impl ApiServer {
    /// Creates a new API server with the given configuration.
    pub fn new(config: ApiConfig) -> Result<Self> {
        Ok(Self::with_state(Arc::new(AppState::new(config)?)))
    }

    /// Creates a server over existing state.
    pub fn with_state(state: Arc<AppState>) -> Self {
        Self { state }
    }

    /// Creates the router with all routes configured.
    pub fn router(&self) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        create_router(self.state.clone())
            .layer(cors)
            .layer(TraceLayer::new_for_http())
    }

    /// Runs the server on the given address.
    pub async fn run(self, addr: impl Into<SocketAddr>) -> std::io::Result<()> {
        let addr = addr.into();
        let listener = tokio::net::TcpListener::bind(addr).await?;

        info!(
            default_ttl_ms = self.state.config.cache_default_ttl_ms,
            max_entries = ?self.state.config.cache_max_entries,
            "Matchday API server listening on {}",
            addr
        );

        axum::serve(listener, self.router()).await
    }
}
