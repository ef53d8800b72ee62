use std::env;

/// Development-only signing secret. Acceptable for local runs and tests,
/// rejected outright when the application starts in production mode.
pub const DEV_SECRET_KEY: &str = "dev-only-blog-secret-do-not-deploy";

const DEFAULT_DB_URL: &str = "sqlite://blog.db";

/// AppConfig
///
/// Holds the application's entire configuration state. The struct is
/// immutable once loaded and shared across all services through the
/// application state.
#[derive(Clone)]
pub struct AppConfig {
    // Database connection string (SQLite).
    pub db_url: String,
    // Secret used to sign and verify session cookies.
    pub secret_key: String,
    // Runtime environment marker. Controls log format and secret policy.
    pub env: Env,
}

/// Env
///
/// Defines the runtime context, used to switch between development
/// conveniences (fallback secret, pretty logs) and hardened production
/// behavior (mandatory secret, JSON logs).
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

impl Default for AppConfig {
    /// Provides a safe, non-panicking AppConfig instance primarily used for
    /// test setup, without requiring any environment variables.
    fn default() -> Self {
        Self {
            db_url: "sqlite::memory:".to_string(),
            secret_key: DEV_SECRET_KEY.to_string(),
            env: Env::Local,
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// The canonical function for initializing the application configuration
    /// at startup. Reads all parameters from environment variables and
    /// implements the fail-fast principle.
    ///
    /// # Panics
    /// Panics in production when `SECRET_KEY` is missing or still set to the
    /// development fallback. A guessable signing secret would let anyone
    /// forge a session cookie.
    pub fn load() -> Self {
        let env_str = env::var("APP_ENV").unwrap_or_else(|_| "local".to_string());
        let env = match env_str.as_str() {
            "production" => Env::Production,
            _ => Env::Local,
        };

        let secret_key = match env {
            Env::Production => {
                let secret =
                    env::var("SECRET_KEY").expect("FATAL: SECRET_KEY must be set in production.");
                if secret == DEV_SECRET_KEY {
                    panic!("FATAL: SECRET_KEY is still the development fallback in production.");
                }
                secret
            }
            // Local runs may fall back to the development secret.
            _ => env::var("SECRET_KEY").unwrap_or_else(|_| DEV_SECRET_KEY.to_string()),
        };

        // The database keeps a local-file fallback in every environment; a
        // default deployment stores its data in a SQLite file next to the
        // binary.
        let db_url = env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DB_URL.to_string());

        Self {
            db_url,
            secret_key,
            env,
        }
    }
}
