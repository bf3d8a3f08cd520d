//! Application configuration loaded from the environment (and `.env`).

use dotenv::dotenv;
use std::env;
use tracing::{info, warn};

/// Public sandbox secret published by eSewa for the `EPAYTEST` merchant.
pub const ESEWA_SANDBOX_SECRET: &str = "8gBm/:&EnhH.1/q";

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub server_host: String,
    pub server_port: u16,
    pub max_connections: u32,
    pub connection_lifetime_secs: u64,
    pub app_env: String,

    /// HS256 secret used to verify identity-provider session tokens.
    pub identity_jwt_secret: Option<String>,
    /// RS256 public key (PEM). Takes precedence over the secret when set.
    pub identity_jwt_public_key: Option<String>,
    /// Webhook signing secret, `whsec_` prefixed.
    pub identity_webhook_secret: Option<String>,

    pub esewa_secret_key: String,
    pub esewa_product_code: String,
    pub esewa_form_url: String,
    pub esewa_status_url: String,

    /// Base URL of this API, used to build gateway callback URLs.
    pub public_base_url: String,
    /// Where the browser lands after a payment callback.
    pub frontend_url: String,

    pub realtime_relay_url: Option<String>,
    pub realtime_relay_secret: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: String::new(),
            server_host: "127.0.0.1".to_string(),
            server_port: 3000,
            max_connections: 20,
            connection_lifetime_secs: 1800,
            app_env: "development".to_string(),
            identity_jwt_secret: None,
            identity_jwt_public_key: None,
            identity_webhook_secret: None,
            esewa_secret_key: ESEWA_SANDBOX_SECRET.to_string(),
            esewa_product_code: "EPAYTEST".to_string(),
            esewa_form_url: "https://rc-epay.esewa.com.np/api/epay/main/v2/form".to_string(),
            esewa_status_url: "https://rc.esewa.com.np/api/epay/transaction/status/".to_string(),
            public_base_url: "http://127.0.0.1:3000".to_string(),
            frontend_url: "http://localhost:5173".to_string(),
            realtime_relay_url: None,
            realtime_relay_secret: None,
        }
    }
}

impl Config {
    /// Loads the configuration from environment variables.
    /// Calls dotenv() first so a local `.env` file is honoured.
    pub fn from_env() -> Result<Self, String> {
        dotenv().ok();
        let defaults = Config::default();

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| "DATABASE_URL must be set in .env file".to_string())?;

        let server_host = env::var("SERVER_HOST").unwrap_or(defaults.server_host);

        let server_port = parse_var("SERVER_PORT", defaults.server_port)
            .map_err(|_| "Invalid SERVER_PORT: must be a number between 0-65535".to_string())?;

        let max_connections = parse_var("MAX_DB_CONNECTIONS", defaults.max_connections)
            .map_err(|_| "Invalid MAX_DB_CONNECTIONS: must be a positive number".to_string())?;

        let connection_lifetime_secs =
            parse_var("DB_CONNECTION_LIFETIME_SECS", defaults.connection_lifetime_secs).map_err(
                |_| "Invalid DB_CONNECTION_LIFETIME_SECS: must be a positive number".to_string(),
            )?;

        let app_env = env::var("APP_ENV").unwrap_or(defaults.app_env);

        let identity_jwt_secret = optional_var("IDENTITY_JWT_SECRET");
        let identity_jwt_public_key = optional_var("IDENTITY_JWT_PUBLIC_KEY");
        if identity_jwt_secret.is_none() && identity_jwt_public_key.is_none() {
            return Err(
                "Either IDENTITY_JWT_SECRET or IDENTITY_JWT_PUBLIC_KEY must be set".to_string(),
            );
        }

        let esewa_secret_key = env::var("ESEWA_SECRET_KEY").unwrap_or_else(|_| {
            warn!("ESEWA_SECRET_KEY not set, using the public sandbox key");
            defaults.esewa_secret_key
        });

        let config = Config {
            database_url,
            server_host,
            server_port,
            max_connections,
            connection_lifetime_secs,
            app_env,
            identity_jwt_secret,
            identity_jwt_public_key,
            identity_webhook_secret: optional_var("IDENTITY_WEBHOOK_SECRET"),
            esewa_secret_key,
            esewa_product_code: env::var("ESEWA_PRODUCT_CODE")
                .unwrap_or(defaults.esewa_product_code),
            esewa_form_url: env::var("ESEWA_FORM_URL").unwrap_or(defaults.esewa_form_url),
            esewa_status_url: env::var("ESEWA_STATUS_URL").unwrap_or(defaults.esewa_status_url),
            public_base_url: env::var("PUBLIC_BASE_URL")
                .unwrap_or(defaults.public_base_url)
                .trim_end_matches('/')
                .to_string(),
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or(defaults.frontend_url)
                .trim_end_matches('/')
                .to_string(),
            realtime_relay_url: optional_var("REALTIME_RELAY_URL"),
            realtime_relay_secret: optional_var("REALTIME_RELAY_SECRET"),
        };
        config.ensure_production_ready()?;
        Ok(config)
    }

    /// Logs the configuration, hiding secrets.
    pub fn print_info(&self) {
        info!("Environment: {}", self.app_env);
        info!("Server address: {}:{}", self.server_host, self.server_port);
        info!("Database: {}", Self::mask_url(&self.database_url));
        info!("Max DB connections: {}", self.max_connections);
        info!("Connection lifetime: {}s", self.connection_lifetime_secs);
        info!(
            "Session tokens: {}",
            if self.identity_jwt_public_key.is_some() {
                "RS256 public key"
            } else {
                "HS256 secret"
            }
        );
        info!(
            "Identity webhook secret: {}",
            if self.identity_webhook_secret.is_some() { "configured" } else { "MISSING" }
        );
        info!(
            "eSewa: product {} ({})",
            self.esewa_product_code,
            if self.esewa_secret_key == ESEWA_SANDBOX_SECRET {
                "sandbox key"
            } else {
                "custom key"
            }
        );
        info!(
            "Realtime relay: {}",
            self.realtime_relay_url.as_deref().unwrap_or("disabled")
        );
    }

    pub fn is_production(&self) -> bool {
        self.app_env.eq_ignore_ascii_case("production")
    }

    /// Production must not take real payments with the sandbox key or accept
    /// identity events it cannot verify.
    pub fn ensure_production_ready(&self) -> Result<(), String> {
        if !self.is_production() {
            return Ok(());
        }
        if self.esewa_secret_key == ESEWA_SANDBOX_SECRET {
            return Err("ESEWA_SECRET_KEY must be set in production".to_string());
        }
        if self.identity_webhook_secret.is_none() {
            return Err("IDENTITY_WEBHOOK_SECRET must be set in production".to_string());
        }
        Ok(())
    }

    /// Masks the credentials of a database URL for logging.
    pub fn mask_url(url: &str) -> String {
        if let Some(at_pos) = url.find('@') {
            if let Some(scheme_end) = url.find("://") {
                let scheme = &url[..scheme_end + 3];
                let after_at = &url[at_pos..];
                return format!("{}***{}", scheme, after_at);
            }
        }
        "***".to_string()
    }
}

fn optional_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_var<T: std::str::FromStr>(key: &str, default: T) -> Result<T, T::Err> {
    match env::var(key) {
        Ok(raw) => raw.trim().parse::<T>(),
        Err(_) => Ok(default),
    }
}
