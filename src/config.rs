use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    /// Symmetric secret for HS256 access-token signing.
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub jwt_audience: String,
    /// Access-token validity window in minutes.
    pub access_token_minutes: i64,
    /// Refresh-token validity window in days.
    pub refresh_token_days: i64,
    pub smtp: SmtpConfig,
    /// Object-store URL for product images (e.g. s3://bucket, file:///var/images).
    /// Image uploads fail with 503 when unset.
    pub blob_store_url: Option<String>,
    /// Allowed CORS origin for the dashboard dev client.
    pub dashboard_origin: String,
    /// Days-to-depletion window under which a placement is flagged low-stock.
    pub low_stock_days: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from_address: String,
}

pub fn load() -> anyhow::Result<Config> {
    dotenvy::dotenv().ok();

    let jwt_secret = std::env::var("SHELFSENSE_JWT_SECRET")
        .unwrap_or_else(|_| "CHANGE_ME_DEV_ONLY_SECRET".into());

    if jwt_secret == "CHANGE_ME_DEV_ONLY_SECRET" {
        let env_mode = std::env::var("SHELFSENSE_ENV")
            .or_else(|_| std::env::var("RUST_ENV"))
            .unwrap_or_default();
        if env_mode == "production" {
            anyhow::bail!(
                "SHELFSENSE_JWT_SECRET is still the insecure placeholder. \
                 Set a proper secret before running in production."
            );
        }
        tracing::warn!(
            "SHELFSENSE_JWT_SECRET is not set — using insecure placeholder. \
             Set a real secret for production."
        );
    }

    Ok(Config {
        port: std::env::var("SHELFSENSE_PORT")
            .unwrap_or_else(|_| "8080".into())
            .parse()
            .unwrap_or(8080),
        database_url: std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "postgres://localhost/shelfsense".into()),
        jwt_secret,
        jwt_issuer: std::env::var("SHELFSENSE_JWT_ISSUER")
            .unwrap_or_else(|_| "shelfsense".into()),
        jwt_audience: std::env::var("SHELFSENSE_JWT_AUDIENCE")
            .unwrap_or_else(|_| "shelfsense-dashboard".into()),
        access_token_minutes: std::env::var("SHELFSENSE_ACCESS_TOKEN_MINUTES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(15),
        refresh_token_days: std::env::var("SHELFSENSE_REFRESH_TOKEN_DAYS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(7),
        smtp: SmtpConfig {
            host: std::env::var("SHELFSENSE_SMTP_HOST")
                .unwrap_or_else(|_| "localhost".into()),
            port: std::env::var("SHELFSENSE_SMTP_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(587),
            username: std::env::var("SHELFSENSE_SMTP_USERNAME").unwrap_or_default(),
            password: std::env::var("SHELFSENSE_SMTP_PASSWORD").unwrap_or_default(),
            from_address: std::env::var("SHELFSENSE_SMTP_FROM")
                .unwrap_or_else(|_| "alerts@shelfsense.local".into()),
        },
        blob_store_url: std::env::var("SHELFSENSE_BLOB_STORE_URL").ok(),
        dashboard_origin: std::env::var("SHELFSENSE_DASHBOARD_ORIGIN")
            .unwrap_or_else(|_| "http://localhost:4200".to_string()),
        low_stock_days: std::env::var("SHELFSENSE_LOW_STOCK_DAYS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(3.0),
    })
}
