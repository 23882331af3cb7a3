//! # numlease: Control Layer for a Leasable Number Pool
//!
//! `numlease` operates a pool of leasable phone numbers consumed against
//! per-user prepaid credit balances. A user leases a number for one credit,
//! retrieves the one-time verification code sent to it from an external
//! delivery provider, and either keeps the number or releases it for a
//! refund, refundable only until the first code has been delivered.
//!
//! ## Overview
//!
//! The hard part of this system is the allocation and ledger engine: it must
//! guarantee exactly-once assignment of a scarce shared pool under
//! concurrent demand, keep every balance reconcilable against an immutable
//! transaction log, and enforce the time-ordered lease lifecycle
//! (free → assigned → [code fetched] → released/retired) without losing
//! money or leaking numbers on crash or contention.
//!
//! The chat transport that turns end-user messages into these operations is
//! deliberately out of scope; it talks to the thin JSON API in [`api`] and
//! owns all presentation. The SMS delivery provider is behind the
//! [`provider::CodeProvider`] trait.
//!
//! ## Architecture
//!
//! The application is built on [Axum](https://github.com/tokio-rs/axum) for
//! the HTTP layer and uses SQLx over an embedded SQLite database for all
//! persistence, so a single binary with no external services is a complete
//! deployment.
//!
//! The **database layer** ([`db`]) uses the repository pattern: each entity
//! has a repository handling queries and mutations, and every engine
//! operation runs its repositories inside one transaction. The **engine**
//! ([`engine`]) implements allocation, release/refund, code delivery with a
//! per-user cooldown, and operator ledger adjustments. The **API layer**
//! ([`api`]) exposes the engine's operations plus a `/healthz` liveness
//! route for uptime monitoring.
//!
//! ## Quick start
//!
//! ```no_run
//! use clap::Parser;
//! use numlease::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = numlease::config::Args::parse();
//!     let config = Config::load(&args)?;
//!
//!     numlease::telemetry::init_telemetry()?;
//!
//!     let app = Application::new(config).await?;
//!     app.serve(async {
//!         tokio::signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
//!     })
//!     .await?;
//!
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod db;
pub mod engine;
pub mod errors;
pub mod provider;
pub mod telemetry;
mod types;

#[cfg(test)]
pub(crate) mod test_utils;

use std::sync::Arc;

use axum::{
    Router,
    routing::{delete, get, post, put},
};
use sqlx::SqlitePool;
use tokio::net::TcpListener;
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::{Level, info, instrument};

pub use config::Config;
pub use types::{AssignmentId, NumberId, UserId};

use crate::db::errors::DbError;
use crate::db::handlers::Users;
use crate::engine::{CODE_FETCH_COOLDOWN, RateLimiter};
use crate::provider::{CodeProvider, HttpCodeProvider};

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: Config,
    pub provider: Arc<dyn CodeProvider>,
    pub rate_limiter: Arc<RateLimiter>,
}

/// Get the numlease database migrator
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}

/// Idempotently create (or promote) the configured operator account.
///
/// Called during startup so there is always an administrator able to grant
/// credits and manage the pool. Admin status is never granted through the
/// API itself.
#[instrument(skip(db), err)]
pub async fn seed_admin_user(external_id: &str, handle: Option<&str>, db: &SqlitePool) -> Result<UserId, errors::Error> {
    let mut tx = db.begin().await.map_err(DbError::from)?;
    let admin = Users::new(&mut tx).ensure_admin(external_id, handle).await?;
    tx.commit().await.map_err(DbError::from)?;
    Ok(admin.id)
}

/// Build the application router with all endpoints and middleware.
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        // Users: registration and read-side queries
        .route("/users", post(api::handlers::users::register_user))
        .route("/users/{external_id}/balance", get(api::handlers::users::get_balance))
        .route("/users/{external_id}/leases", get(api::handlers::users::list_leases))
        .route(
            "/users/{external_id}/transactions",
            get(api::handlers::users::list_transactions),
        )
        // Lease lifecycle
        .route("/leases", post(api::handlers::leases::create_lease))
        .route("/leases/{assignment_id}", delete(api::handlers::leases::release_lease))
        .route(
            "/leases/{assignment_id}/code",
            post(api::handlers::leases::fetch_lease_code),
        )
        // Operator ledger operations
        .route("/credits/grants", post(api::handlers::credits::create_grant))
        .route("/credits/balance", put(api::handlers::credits::set_balance))
        // Operator pool inventory
        .route(
            "/numbers",
            get(api::handlers::numbers::list_numbers).post(api::handlers::numbers::import_numbers),
        )
        .route(
            "/numbers/{number_id}/retire",
            post(api::handlers::numbers::retire_number),
        )
        .with_state(state);

    Router::new()
        // Liveness only: says nothing about engine state, used by external
        // uptime monitoring.
        .route("/healthz", get(|| async { "OK" }))
        .nest("/api/v1", api_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
}

/// Main application struct that owns all resources and lifecycle.
///
/// 1. **Create**: [`Application::new`] connects the database, runs
///    migrations, and seeds the configured admin user.
/// 2. **Serve**: [`Application::serve`] binds the TCP port and handles
///    requests until the shutdown future resolves.
pub struct Application {
    router: Router,
    config: Config,
    pool: SqlitePool,
}

impl Application {
    /// Create a new application instance with all resources initialized
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let pool = db::connect(
            &config.database.url,
            config.database.max_connections,
            config.database.busy_timeout,
        )
        .await?;
        migrator().run(&pool).await?;

        if let Some(admin) = &config.admin {
            let admin_id = seed_admin_user(&admin.external_id, admin.handle.as_deref(), &pool).await?;
            info!(admin_id, "Ensured admin user {}", admin.external_id);
        }

        let provider = HttpCodeProvider::new(config.provider.base_url.clone(), config.provider.timeout)?;

        let state = AppState {
            db: pool.clone(),
            config: config.clone(),
            provider: Arc::new(provider),
            rate_limiter: Arc::new(RateLimiter::new(CODE_FETCH_COOLDOWN)),
        };
        let router = build_router(state);

        Ok(Self { router, config, pool })
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!("numlease listening on http://{bind_addr}");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Closing database connections...");
        self.pool.close().await;

        Ok(())
    }
}
