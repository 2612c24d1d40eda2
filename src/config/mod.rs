use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

const DEFAULT_REGION: &str = "ap-southeast-1";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub services: ServicesConfig,
    pub email: EmailConfig,
    pub tracking: TrackingConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_request_size_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
    pub connection_timeout: u64,
    pub run_migrations: bool,
}

/// Identity provider settings used to verify bearer tokens.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    pub jwks_url: Option<String>,
    pub user_pool_id: Option<String>,
    pub region: String,
    pub issuer: Option<String>,
    pub app_client_id: Option<String>,
    pub jwks_cache_ttl_secs: u64,
    pub leeway_secs: u64,
    pub allow_insecure: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServicesConfig {
    pub media_service_url: String,
    pub media_timeout_secs: u64,
    pub user_service_url: Option<String>,
    pub tracking_service_url: Option<String>,
    pub proxy_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    pub smtp_host: Option<String>,
    pub smtp_port: u16,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<String>,
    pub smtp_starttls: bool,
    pub sender: Option<String>,
    pub batch_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingConfig {
    pub stale_minutes: i64,
}

impl TrackingConfig {
    /// One year; larger windows would overflow timestamp arithmetic.
    pub const MAX_STALE_MINUTES: i64 = 365 * 24 * 60;

    /// Stale window bounded to `1..=MAX_STALE_MINUTES`.
    pub fn clamp_minutes(minutes: i64) -> i64 {
        minutes.clamp(1, Self::MAX_STALE_MINUTES)
    }
}

impl AuthConfig {
    fn cognito_base(&self) -> Option<String> {
        let pool_id = self.user_pool_id.as_deref().filter(|p| !p.is_empty())?;
        Some(format!(
            "https://cognito-idp.{}.amazonaws.com/{}",
            self.region, pool_id
        ))
    }

    /// Explicit JWKS URL, else the one derived from the user pool.
    pub fn jwks_url(&self) -> Option<String> {
        if let Some(url) = self.jwks_url.as_ref().filter(|u| !u.is_empty()) {
            return Some(url.clone());
        }
        self.cognito_base()
            .map(|base| format!("{}/.well-known/jwks.json", base))
    }

    /// Expected `iss` claim, if one can be determined.
    pub fn issuer(&self) -> Option<String> {
        if let Some(issuer) = self.issuer.as_ref().filter(|i| !i.is_empty()) {
            return Some(issuer.clone());
        }
        self.cognito_base()
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Server overrides
        if let Ok(v) = env::var("HOST") {
            self.server.host = v;
        }
        if let Ok(v) = env::var("PORT") {
            self.server.port = v.parse().unwrap_or(self.server.port);
        }
        if let Ok(v) = env::var("API_MAX_REQUEST_SIZE_BYTES") {
            self.server.max_request_size_bytes =
                v.parse().unwrap_or(self.server.max_request_size_bytes);
        }

        // Database overrides
        self.database.url = non_empty_var("DATABASE_URL").or(self.database.url);
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout =
                v.parse().unwrap_or(self.database.connection_timeout);
        }
        if let Ok(v) = env::var("DATABASE_RUN_MIGRATIONS") {
            self.database.run_migrations = parse_flag(&v);
        }

        // Auth overrides
        self.auth.jwks_url = non_empty_var("COGNITO_JWKS_URL")
            .or_else(|| non_empty_var("JWKS_URL"))
            .or(self.auth.jwks_url);
        self.auth.user_pool_id = non_empty_var("COGNITO_USER_POOL_ID")
            .or_else(|| non_empty_var("COGNITO_POOL_ID"))
            .or(self.auth.user_pool_id);
        if let Some(region) =
            non_empty_var("COGNITO_REGION").or_else(|| non_empty_var("AWS_REGION"))
        {
            self.auth.region = region;
        }
        self.auth.issuer = non_empty_var("JWT_ISSUER")
            .or_else(|| non_empty_var("COGNITO_ISSUER"))
            .or(self.auth.issuer);
        self.auth.app_client_id =
            non_empty_var("COGNITO_APP_CLIENT_ID").or(self.auth.app_client_id);
        if let Ok(v) = env::var("JWKS_CACHE_TTL") {
            self.auth.jwks_cache_ttl_secs = v.parse().unwrap_or(self.auth.jwks_cache_ttl_secs);
        }
        if let Ok(v) = env::var("JWT_LEEWAY") {
            self.auth.leeway_secs = v.parse().unwrap_or(self.auth.leeway_secs);
        }
        if let Ok(v) = env::var("ALLOW_INSECURE_JWT") {
            self.auth.allow_insecure = parse_flag(&v);
        }

        // Service overrides
        if let Some(v) = non_empty_var("MEDIA_SERVICE_URL") {
            self.services.media_service_url = v;
        }
        self.services.user_service_url =
            non_empty_var("USER_SERVICE_URL").or(self.services.user_service_url);
        self.services.tracking_service_url =
            non_empty_var("TRACKING_SERVICE_URL").or(self.services.tracking_service_url);

        // Email overrides
        self.email.smtp_host = non_empty_var("SMTP_HOST").or(self.email.smtp_host);
        if let Ok(v) = env::var("SMTP_PORT") {
            self.email.smtp_port = v.parse().unwrap_or(self.email.smtp_port);
        }
        self.email.smtp_username = non_empty_var("SMTP_USERNAME").or(self.email.smtp_username);
        self.email.smtp_password = non_empty_var("SMTP_PASSWORD").or(self.email.smtp_password);
        if let Ok(v) = env::var("SMTP_STARTTLS") {
            self.email.smtp_starttls = parse_flag(&v);
        }
        self.email.sender = non_empty_var("EMAIL_SENDER")
            .or_else(|| non_empty_var("AWS_SES_SENDER_EMAIL"))
            .or(self.email.sender);

        // Tracking overrides
        if let Ok(v) = env::var("TRACKING_STALE_MINUTES") {
            let minutes = v.parse().unwrap_or(self.tracking.stale_minutes);
            self.tracking.stale_minutes = TrackingConfig::clamp_minutes(minutes);
        }

        self
    }

    fn base(environment: Environment) -> Self {
        Self {
            environment,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 5001,
                max_request_size_bytes: 512 * 1024 * 1024, // video uploads
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 10,
                connection_timeout: 30,
                run_migrations: true,
            },
            auth: AuthConfig {
                jwks_url: None,
                user_pool_id: None,
                region: DEFAULT_REGION.to_string(),
                issuer: None,
                app_client_id: None,
                jwks_cache_ttl_secs: 86_400,
                leeway_secs: 0,
                allow_insecure: false,
            },
            services: ServicesConfig {
                media_service_url: "http://localhost:5002".to_string(),
                media_timeout_secs: 300,
                user_service_url: None,
                tracking_service_url: None,
                proxy_timeout_secs: 30,
            },
            email: EmailConfig {
                smtp_host: None,
                smtp_port: 587,
                smtp_username: None,
                smtp_password: None,
                smtp_starttls: true,
                sender: None,
                batch_size: 50,
            },
            tracking: TrackingConfig { stale_minutes: 30 },
        }
    }

    pub fn development() -> Self {
        Self::base(Environment::Development)
    }

    fn staging() -> Self {
        let mut config = Self::base(Environment::Staging);
        config.database.max_connections = 20;
        config.database.connection_timeout = 10;
        config
    }

    fn production() -> Self {
        let mut config = Self::base(Environment::Production);
        config.database.max_connections = 50;
        config.database.connection_timeout = 5;
        config.database.run_migrations = false;
        config
    }
}

/// Accepts `true`, `1` and `yes` in any case.
pub fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes"
    )
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}
