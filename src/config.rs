use std::env;

pub const DEFAULT_FOOD_API_URL: &str = "https://world.openfoodfacts.org";

/// Settings read from the environment (and `.env`, if present).
#[derive(Debug, Clone)]
pub struct Config {
    /// Firebase Web API key of the app's project
    pub firebase_api_key: String,
    /// Firebase / GCP project ID owning the Firestore database
    pub firebase_project_id: String,
    /// Base URL of the Open Food Facts instance used for search
    pub food_api_url: String,
    /// Sent with food search requests
    pub user_agent: String,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            firebase_api_key: "test_api_key".to_string(),
            firebase_project_id: "test-project".to_string(),
            food_api_url: DEFAULT_FOOD_API_URL.to_string(),
            user_agent: default_user_agent(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let food_api_url = env::var("EATWISE_FOOD_API_URL")
            .unwrap_or_else(|_| DEFAULT_FOOD_API_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        if !food_api_url.starts_with("http://") && !food_api_url.starts_with("https://") {
            return Err(ConfigError::Invalid("EATWISE_FOOD_API_URL", food_api_url));
        }

        Ok(Self {
            firebase_api_key: required("EATWISE_FIREBASE_API_KEY")?,
            firebase_project_id: required("EATWISE_FIREBASE_PROJECT_ID")?,
            food_api_url,
            user_agent: env::var("EATWISE_USER_AGENT").unwrap_or_else(|_| default_user_agent()),
        })
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name)
        .map(|v| v.trim().to_string())
        .ok()
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::Missing(name))
}

fn default_user_agent() -> String {
    format!("eatwise/{}", env!("CARGO_PKG_VERSION"))
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}
