use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tower_http::cors::CorsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use shelfsense::auth::password;
use shelfsense::models::user::{NewUser, ROLE_MANAGER};
use shelfsense::notification::email::EmailNotifier;
use shelfsense::storage::blob::BlobStore;
use shelfsense::store::postgres::PgStore;
use shelfsense::{api, cli, config, jobs, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "shelfsense=debug,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cfg = config::load()?;
    let args = cli::Cli::parse();

    let result = match args.command {
        Some(cli::Commands::Serve { port }) => {
            let port = port.unwrap_or(cfg.port);
            run_server(cfg, port).await
        }
        Some(cli::Commands::Seed) => {
            let db = PgStore::connect(&cfg.database_url).await?;
            db.migrate().await?;
            seed_default_admin(&db).await;
            Ok(())
        }
        Some(cli::Commands::CheckStock) => {
            let db = PgStore::connect(&cfg.database_url).await?;
            let notifier = EmailNotifier::new(&cfg.smtp)
                .map_err(|e| anyhow::anyhow!("smtp setup failed: {}", e))?;
            jobs::stock_alerts::run_stock_check(&db, &notifier, cfg.low_stock_days).await
        }
        None => {
            let port = cfg.port;
            run_server(cfg, port).await
        }
    };

    if let Err(ref e) = result {
        tracing::error!("fatal: {:?}", e);
    }
    result
}

async fn run_server(cfg: config::Config, port: u16) -> anyhow::Result<()> {
    tracing::info!("Connecting to database...");
    let db = PgStore::connect(&cfg.database_url).await?;

    tracing::info!("Running migrations...");
    db.migrate().await?;

    let notifier =
        EmailNotifier::new(&cfg.smtp).map_err(|e| anyhow::anyhow!("smtp setup failed: {}", e))?;

    let blob = match &cfg.blob_store_url {
        Some(url) => match BlobStore::from_url(url) {
            Ok(b) => Some(b),
            Err(e) => {
                tracing::warn!("blob store unavailable, image uploads disabled: {}", e);
                None
            }
        },
        None => {
            tracing::info!("no blob store configured, image uploads disabled");
            None
        }
    };

    // Seed failures are logged and never prevent startup.
    seed_default_admin(&db).await;

    let state = Arc::new(AppState::new(db, notifier, blob, cfg));

    let app = axum::Router::new()
        .route("/healthz", axum::routing::get(|| async { "ok" }))
        .nest("/api", api::api_router(state.clone()))
        .with_state(state.clone())
        .layer({
            use axum::http::{HeaderName, Method};
            use tower_http::cors::AllowOrigin;
            let dashboard_origin = state.config.dashboard_origin.clone();
            CorsLayer::new()
                .allow_origin(AllowOrigin::predicate(move |origin, _| {
                    let origin_str = origin.to_str().unwrap_or("");
                    origin_str == dashboard_origin
                        || origin_str.starts_with("http://localhost:")
                        || origin_str.starts_with("http://127.0.0.1:")
                }))
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PUT,
                    Method::DELETE,
                    Method::OPTIONS,
                ])
                .allow_headers([
                    HeaderName::from_static("content-type"),
                    HeaderName::from_static("authorization"),
                ])
                .allow_credentials(true)
        })
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(axum::middleware::from_fn(security_headers_middleware));

    // Hourly stock-alert job, single-flight per name.
    {
        let db = state.db.clone();
        let notifier = state.notifier.clone();
        let low_stock_days = state.config.low_stock_days;
        jobs::scheduler::register(
            "stock-alert-notification",
            Duration::from_secs(3600),
            move || {
                let db = db.clone();
                let notifier = notifier.clone();
                async move {
                    jobs::stock_alerts::run_stock_check(&db, &notifier, low_stock_days).await
                }
            },
        );
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("ShelfSense API listening on {}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the default manager account on first boot. Idempotent; failures
/// are logged and never abort startup.
async fn seed_default_admin(db: &PgStore) {
    const DEFAULT_ADMIN_EMAIL: &str = "admin@shelfsense.local";

    match db.find_user_by_email(DEFAULT_ADMIN_EMAIL).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            let initial_password = std::env::var("SHELFSENSE_ADMIN_PASSWORD")
                .unwrap_or_else(|_| "ChangeMe1!".into());
            let hashed = match password::hash(&initial_password) {
                Ok(h) => h,
                Err(e) => {
                    tracing::error!("seed: failed to hash default admin password: {}", e);
                    return;
                }
            };
            let result = db
                .insert_user(&NewUser {
                    name: "Administrator".into(),
                    email: DEFAULT_ADMIN_EMAIL.into(),
                    phone: None,
                    password_hash: hashed,
                    role: ROLE_MANAGER.into(),
                    store_id: None,
                })
                .await;
            match result {
                Ok(_) => tracing::info!("seed: created default admin user {}", DEFAULT_ADMIN_EMAIL),
                Err(e) => tracing::error!("seed: failed to create default admin: {}", e),
            }
        }
        Err(e) => tracing::error!("seed: lookup failed: {}", e),
    }
}

/// Middleware: injects a unique X-Request-Id into every response so clients
/// can correlate errors with server logs.
async fn request_id_middleware(
    req: axum::extract::Request,
    next: axum::middleware::Next,
) -> axum::response::Response {
    let req_id = uuid::Uuid::new_v4().to_string();
    let mut resp = next.run(req).await;
    if let Ok(val) = axum::http::HeaderValue::from_str(&req_id) {
        resp.headers_mut().insert("x-request-id", val);
    }
    resp
}

/// Middleware: security headers on every response.
async fn security_headers_middleware(
    req: axum::extract::Request,
    next: axum::middleware::Next,
) -> axum::response::Response {
    let mut resp = next.run(req).await;
    let headers = resp.headers_mut();
    headers.insert(
        "X-Content-Type-Options",
        axum::http::HeaderValue::from_static("nosniff"),
    );
    headers.insert(
        "X-Frame-Options",
        axum::http::HeaderValue::from_static("DENY"),
    );
    headers.insert(
        "Cache-Control",
        axum::http::HeaderValue::from_static("no-store"),
    );
    headers.insert(
        "Referrer-Policy",
        axum::http::HeaderValue::from_static("no-referrer"),
    );
    headers.remove("Server");
    resp
}
