//! ShelfSense — retail inventory and restocking management API.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;

pub mod api;
pub mod auth;
pub mod cli;
pub mod config;
pub mod errors;
pub mod jobs;
pub mod models;
pub mod notification;
pub mod storage;
pub mod store;

use auth::token::TokenService;
use notification::email::EmailNotifier;
use storage::blob::BlobStore;
use store::postgres::PgStore;

/// Shared application state passed to handlers and middleware.
pub struct AppState {
    pub db: PgStore,
    pub tokens: TokenService,
    pub notifier: EmailNotifier,
    /// None when no blob store URL is configured; image uploads then fail
    /// with 503 while everything else keeps working.
    pub blob: Option<BlobStore>,
    pub config: config::Config,
    /// Per-user single-flight locks serializing refresh exchanges. Entries
    /// are reaped once the last in-flight exchange for a user completes.
    pub refresh_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl AppState {
    pub fn new(
        db: PgStore,
        notifier: EmailNotifier,
        blob: Option<BlobStore>,
        config: config::Config,
    ) -> Self {
        let tokens = TokenService::new(
            &config.jwt_secret,
            &config.jwt_issuer,
            &config.jwt_audience,
            config.access_token_minutes,
        );
        Self {
            db,
            tokens,
            notifier,
            blob,
            config,
            refresh_locks: DashMap::new(),
        }
    }
}
