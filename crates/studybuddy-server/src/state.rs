//! Shared server state

use std::sync::Arc;
use std::time::Duration;

use studybuddy::ai::{build_http_client, Generator, OpenAiClient};
use studybuddy::MongoDb;

use crate::auth::JwtKeys;
use crate::billing::StripeClient;
use crate::config::Config;
use crate::notion::NotionClient;
use crate::rate_limit::RateLimiter;

/// State handed to every server handler
pub struct AppState {
    pub db: Arc<MongoDb>,
    pub config: Config,
    pub jwt: JwtKeys,
    pub rate_limiter: RateLimiter,
    /// `None` until STRIPE_SECRET_KEY is set
    pub stripe: Option<StripeClient>,
    /// `None` until the Notion OAuth client is configured
    pub notion: Option<NotionClient>,
    /// State of the study routes, sharing the same database handle
    pub study: Arc<studybuddy::routes::AppState>,
}

impl AppState {
    pub fn new(db: MongoDb, config: Config) -> anyhow::Result<Self> {
        let db = Arc::new(db);
        let http = build_http_client()?;

        let generator = config.openai_api_key.as_ref().map(|key| {
            let client = OpenAiClient::new(http.clone(), key.clone())
                .with_api_url(config.openai_api_url.clone())
                .with_model(config.openai_model.clone())
                .with_max_tokens(config.openai_max_tokens);
            Generator::new(Arc::new(client))
        });
        if generator.is_none() {
            tracing::warn!("OPENAI_API_KEY not set, generation endpoints will return 500");
        }

        let stripe = StripeClient::from_config(&config, http.clone());
        let notion = NotionClient::from_config(&config, http);

        let study = Arc::new(studybuddy::routes::AppState {
            db: db.clone(),
            generator,
            config: config.study_config(),
        });

        Ok(Self {
            db,
            jwt: JwtKeys::new(
                &config.jwt_secret,
                config.jwt_access_ttl_minutes,
                config.jwt_refresh_ttl_days,
            ),
            rate_limiter: RateLimiter::new(
                config.rate_limit_max_requests,
                Duration::from_secs(config.rate_limit_window_minutes * 60),
            ),
            stripe,
            notion,
            study,
            config,
        })
    }
}
