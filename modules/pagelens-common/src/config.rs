use std::env;
use std::path::PathBuf;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Postgres
    pub database_url: String,

    // Browserless (headless Chrome service)
    pub browserless_url: String,
    pub browserless_token: Option<String>,

    // Source-platform session. Both optional: anonymous mode works without
    // credentials, a cookie artifact from a prior interactive login is enough.
    pub source_email: Option<String>,
    pub source_password: Option<String>,
    pub cookie_file: Option<PathBuf>,

    // Reasoning service. Absent key switches the insight endpoint to the
    // deterministic fallback.
    pub gemini_api_key: Option<String>,

    // Web server
    pub api_host: String,
    pub api_port: u16,
}

impl Config {
    /// Load configuration from environment variables.
    /// Panics with a clear message if required vars are missing.
    pub fn from_env() -> Self {
        Self {
            database_url: required_env("DATABASE_URL"),
            browserless_url: env::var("BROWSERLESS_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            browserless_token: env::var("BROWSERLESS_TOKEN").ok(),
            source_email: env::var("SOURCE_EMAIL").ok(),
            source_password: env::var("SOURCE_PASSWORD").ok(),
            cookie_file: env::var("COOKIE_FILE").ok().map(PathBuf::from),
            gemini_api_key: env::var("GEMINI_API_KEY").ok(),
            api_host: env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            api_port: env::var("API_PORT")
                .unwrap_or_else(|_| "8000".to_string())
                .parse()
                .expect("API_PORT must be a number"),
        }
    }
}

fn required_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} environment variable is required"))
}
