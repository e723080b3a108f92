//! Configuration management for the StudyBuddy server

use anyhow::{Context, Result};
use serde::Deserialize;
use studybuddy::StudyConfig;

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server host (default: 0.0.0.0)
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port (default: 5000)
    #[serde(default = "default_port")]
    pub port: u16,

    /// MongoDB connection string (default: mongodb://localhost:27017)
    #[serde(default = "default_mongodb_uri")]
    pub mongodb_uri: String,

    /// Database name (default: studybuddy)
    #[serde(default = "default_mongodb_database")]
    pub mongodb_database: String,

    /// Secret used to sign access and refresh tokens
    pub jwt_secret: String,

    #[serde(default = "default_jwt_access_ttl_minutes")]
    pub jwt_access_ttl_minutes: i64,

    #[serde(default = "default_jwt_refresh_ttl_days")]
    pub jwt_refresh_ttl_days: i64,

    /// Generation endpoints answer 500 while this is unset
    pub openai_api_key: Option<String>,

    #[serde(default = "default_openai_model")]
    pub openai_model: String,

    #[serde(default = "default_openai_api_url")]
    pub openai_api_url: String,

    #[serde(default = "default_openai_max_tokens")]
    pub openai_max_tokens: u32,

    pub stripe_secret_key: Option<String>,
    pub stripe_webhook_secret: Option<String>,
    /// Price used when a checkout request names none
    pub stripe_price_id: Option<String>,
    pub stripe_success_url: Option<String>,
    pub stripe_cancel_url: Option<String>,

    #[serde(default = "default_stripe_api_url")]
    pub stripe_api_url: String,

    pub notion_client_id: Option<String>,
    pub notion_client_secret: Option<String>,
    pub notion_redirect_uri: Option<String>,

    #[serde(default = "default_notion_api_url")]
    pub notion_api_url: String,

    /// CORS allowed origins (comma-separated). If empty, mirror_request is used (dev mode).
    pub cors_allowed_origins: Option<String>,

    #[serde(default = "default_rate_limit_window_minutes")]
    pub rate_limit_window_minutes: u64,

    #[serde(default = "default_rate_limit_max_requests")]
    pub rate_limit_max_requests: u32,

    /// Key the rate limiter on X-Forwarded-For; only set behind a trusted proxy
    #[serde(default)]
    pub trust_proxy: bool,

    /// Documents a free account may own per resource collection
    #[serde(default = "default_free_tier_limit")]
    pub free_tier_limit: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_mongodb_uri() -> String {
    "mongodb://localhost:27017".to_string()
}

fn default_mongodb_database() -> String {
    "studybuddy".to_string()
}

fn default_jwt_access_ttl_minutes() -> i64 {
    60
}

fn default_jwt_refresh_ttl_days() -> i64 {
    7
}

fn default_openai_model() -> String {
    studybuddy::ai::DEFAULT_MODEL.to_string()
}

fn default_openai_api_url() -> String {
    studybuddy::ai::DEFAULT_OPENAI_URL.to_string()
}

fn default_openai_max_tokens() -> u32 {
    studybuddy::ai::DEFAULT_MAX_TOKENS
}

fn default_stripe_api_url() -> String {
    "https://api.stripe.com".to_string()
}

fn default_notion_api_url() -> String {
    "https://api.notion.com".to_string()
}

fn default_rate_limit_window_minutes() -> u64 {
    15
}

fn default_rate_limit_max_requests() -> u32 {
    100
}

fn default_free_tier_limit() -> u64 {
    5
}

/// Non-empty value of an environment variable
fn env_opt(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    env_opt(name).and_then(|s| s.parse().ok())
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let jwt_secret = env_opt("JWT_SECRET").context("JWT_SECRET must be set")?;

        let config = Self {
            host: env_opt("STUDYBUDDY_HOST").unwrap_or_else(default_host),
            port: env_parse("STUDYBUDDY_PORT").unwrap_or_else(default_port),
            mongodb_uri: env_opt("MONGODB_URI").unwrap_or_else(default_mongodb_uri),
            mongodb_database: env_opt("MONGODB_DATABASE").unwrap_or_else(default_mongodb_database),
            jwt_secret,
            jwt_access_ttl_minutes: env_parse("JWT_ACCESS_TTL_MINUTES")
                .unwrap_or_else(default_jwt_access_ttl_minutes),
            jwt_refresh_ttl_days: env_parse("JWT_REFRESH_TTL_DAYS")
                .unwrap_or_else(default_jwt_refresh_ttl_days),
            openai_api_key: env_opt("OPENAI_API_KEY"),
            openai_model: env_opt("OPENAI_MODEL").unwrap_or_else(default_openai_model),
            openai_api_url: env_opt("OPENAI_API_URL").unwrap_or_else(default_openai_api_url),
            openai_max_tokens: env_parse("OPENAI_MAX_TOKENS")
                .unwrap_or_else(default_openai_max_tokens),
            stripe_secret_key: env_opt("STRIPE_SECRET_KEY"),
            stripe_webhook_secret: env_opt("STRIPE_WEBHOOK_SECRET"),
            stripe_price_id: env_opt("STRIPE_PRICE_ID"),
            stripe_success_url: env_opt("STRIPE_SUCCESS_URL"),
            stripe_cancel_url: env_opt("STRIPE_CANCEL_URL"),
            stripe_api_url: env_opt("STRIPE_API_URL").unwrap_or_else(default_stripe_api_url),
            notion_client_id: env_opt("NOTION_CLIENT_ID"),
            notion_client_secret: env_opt("NOTION_CLIENT_SECRET"),
            notion_redirect_uri: env_opt("NOTION_REDIRECT_URI"),
            notion_api_url: env_opt("NOTION_API_URL").unwrap_or_else(default_notion_api_url),
            cors_allowed_origins: env_opt("CORS_ALLOWED_ORIGINS"),
            rate_limit_window_minutes: env_parse("RATE_LIMIT_WINDOW_MINUTES")
                .unwrap_or_else(default_rate_limit_window_minutes),
            rate_limit_max_requests: env_parse("RATE_LIMIT_MAX_REQUESTS")
                .unwrap_or_else(default_rate_limit_max_requests),
            trust_proxy: env_parse("TRUST_PROXY").unwrap_or(false),
            free_tier_limit: env_parse("FREE_TIER_LIMIT").unwrap_or_else(default_free_tier_limit),
        };
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path))?;
        let config: Config =
            toml::from_str(&content).with_context(|| "Failed to parse config file")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.jwt_secret.len() < 16 {
            anyhow::bail!("JWT_SECRET must be at least 16 characters");
        }
        if self.jwt_access_ttl_minutes <= 0 || self.jwt_refresh_ttl_days <= 0 {
            anyhow::bail!("Token lifetimes must be positive");
        }
        if self.rate_limit_max_requests == 0 || self.rate_limit_window_minutes == 0 {
            anyhow::bail!("Rate limit window and maximum must be positive");
        }
        Ok(())
    }

    /// Settings handed to the core routes
    pub fn study_config(&self) -> StudyConfig {
        StudyConfig::new().with_free_tier_limit(self.free_tier_limit)
    }

    /// Origins for the CORS layer; empty means mirror the request origin
    pub fn cors_origins(&self) -> Vec<String> {
        self.cors_allowed_origins
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: &[&str] = &[
        "JWT_SECRET",
        "STUDYBUDDY_PORT",
        "OPENAI_API_KEY",
        "FREE_TIER_LIMIT",
        "CORS_ALLOWED_ORIGINS",
        "RATE_LIMIT_MAX_REQUESTS",
        "TRUST_PROXY",
    ];

    fn clear_env() {
        for var in VARS {
            std::env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_from_env_requires_jwt_secret() {
        clear_env();
        let err = Config::from_env().unwrap_err();
        assert!(err.to_string().contains("JWT_SECRET"));
    }

    #[test]
    #[serial]
    fn test_from_env_defaults_and_overrides() {
        clear_env();
        std::env::set_var("JWT_SECRET", "0123456789abcdef0123");
        std::env::set_var("STUDYBUDDY_PORT", "8081");
        std::env::set_var("FREE_TIER_LIMIT", "3");
        std::env::set_var("OPENAI_API_KEY", "   ");
        std::env::set_var("CORS_ALLOWED_ORIGINS", "http://a.test, ,http://b.test");

        let config = Config::from_env().unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8081);
        assert_eq!(config.mongodb_database, "studybuddy");
        assert_eq!(config.jwt_access_ttl_minutes, 60);
        assert_eq!(config.rate_limit_window_minutes, 15);
        assert_eq!(config.rate_limit_max_requests, 100);
        assert_eq!(config.openai_api_key, None);
        assert!(!config.trust_proxy);
        assert_eq!(config.study_config().free_tier_limit, 3);
        assert_eq!(config.cors_origins(), vec!["http://a.test", "http://b.test"]);
        clear_env();
    }

    #[test]
    #[serial]
    fn test_invalid_numbers_fall_back_to_defaults() {
        clear_env();
        std::env::set_var("JWT_SECRET", "0123456789abcdef0123");
        std::env::set_var("RATE_LIMIT_MAX_REQUESTS", "lots");
        std::env::set_var("TRUST_PROXY", "true");
        let config = Config::from_env().unwrap();
        assert_eq!(config.rate_limit_max_requests, 100);
        assert!(config.trust_proxy);
        clear_env();
    }

    #[test]
    fn test_from_toml() {
        let config: Config = toml::from_str(
            r#"
            jwt_secret = "0123456789abcdef0123"
            port = 9000
            stripe_price_id = "price_123"
            "#,
        )
        .unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.stripe_price_id.as_deref(), Some("price_123"));
        assert_eq!(config.openai_model, "gpt-4o-mini");
        assert!(config.validate().is_ok());

        assert!(toml::from_str::<Config>("port = 9000").is_err());
    }
}
