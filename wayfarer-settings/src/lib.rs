#![warn(missing_docs, clippy::missing_docs_in_private_items)]

//! # Wayfarer Settings
//!
//! Configuration is specified in several ways, with later methods overriding
//! earlier ones.
//!
//! 1. A base configuration checked into the repository, in `config/base.yaml`.
//!    This provides the default values for most settings.
//! 2. Per-environment configuration files in the `config` directory. The
//!    environment is selected using the environment variable `WAYFARER_ENV`.
//!    The settings for that environment are then loaded from
//!    `config/${env}.yaml`, if it exists. The default environment is
//!    "development". A "production" environment is also provided.
//! 3. A local configuration file not checked into the repository, at
//!    `config/local.yaml`.
//! 4. Environment variables that begin with `WAYFARER_` and use `__` to
//!    separate levels. For example, `Settings::http::workers` can be controlled
//!    from the environment variable `WAYFARER_HTTP__WORKERS`.
//! 5. The database connection variables `DB_CONN_STR`, `DB_USERNAME` and
//!    `DB_PASSWORD`. These may also be placed in a `.env` file in the working
//!    directory.
//!
//! Tests should use `Settings::load_for_tests` which only reads from
//! `config/base.yaml`, `config/test.yaml`, and `config/local_test.yaml` (if it
//! exists). It does not read from environment variables.

mod database;
mod logging;

pub use database::{DatabaseSettings, StoreBackend};
pub use logging::{LogDirectives, LogFormat, LoggingSettings};

use config::{Config, ConfigBuilder, ConfigError, Environment, File};
use http::Uri;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr};
use std::net::SocketAddr;

/// Environment variables that are read as-is for the database connection, in
/// addition to the `WAYFARER_DATABASE__*` forms.
const DATABASE_ENV_OVERRIDES: [(&str, &str); 3] = [
    ("DB_CONN_STR", "database.connection_string"),
    ("DB_USERNAME", "database.username"),
    ("DB_PASSWORD", "database.password"),
];

/// Top level settings object for Wayfarer.
#[serde_as]
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Settings {
    /// The environment Wayfarer is running in. Should only be set with the
    /// `WAYFARER_ENV` environment variable.
    pub env: String,

    /// Enable additional features to debug the application. This should not be
    /// set to true in production environments.
    pub debug: bool,

    /// Settings for the HTTP server.
    pub http: HttpSettings,

    /// A URL to redirect to from the root of the service, usually the API
    /// documentation.
    #[serde_as(as = "Option<DisplayFromStr>")]
    #[serde(default)]
    pub public_documentation: Option<Uri>,

    /// Settings for the document store.
    pub database: DatabaseSettings,

    /// Logging settings.
    pub logging: LoggingSettings,

    /// Metrics settings.
    pub metrics: MetricsSettings,

    /// Error reporting settings.
    pub sentry: SentrySettings,
}

/// Settings for the HTTP server.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HttpSettings {
    /// The host and port to listen on, such as "127.0.0.1:8080" or "0.0.0.0:80".
    pub listen: SocketAddr,

    /// The number of workers to use. Optional. If no value is provided, the
    /// number of logical cores will be used.
    #[serde(default)]
    pub workers: Option<usize>,
}

/// Settings for the statsd metrics sink.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MetricsSettings {
    /// The host to send metrics to.
    pub sink_host: String,

    /// The UDP port to send metrics to.
    pub sink_port: u16,

    /// Metrics are buffered in memory and sent in batches. This bounds the size
    /// of that buffer, in kilobytes.
    pub max_queue_size_kb: usize,
}

/// Settings for Sentry error reporting.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SentrySettings {
    /// Whether, and how, errors are reported.
    pub mode: SentryMode,

    /// The Sentry DSN to report to. Required in `release` mode.
    #[serde(default)]
    pub dsn: Option<String>,
}

/// The ways Sentry can be configured.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SentryMode {
    /// Don't report errors.
    Disabled,
    /// Report errors to the configured DSN.
    Release,
    /// Report errors to the configured DSN, if any, and also log every event
    /// that would be sent.
    Debug,
}

impl SentrySettings {
    /// The DSN to report to, if reporting is enabled at all.
    pub fn dsn(&self) -> Option<&str> {
        match self.mode {
            SentryMode::Disabled => None,
            SentryMode::Release | SentryMode::Debug => self.dsn.as_deref(),
        }
    }

    /// If Sentry events should also be written to the logs.
    pub fn debug(&self) -> bool {
        self.mode == SentryMode::Debug
    }
}

impl Settings {
    /// Load settings from configuration files and environment variables.
    ///
    /// # Errors
    /// If any of the configured values are invalid, or if any of the required
    /// configuration files are missing.
    pub fn load() -> Result<Self, ConfigError> {
        // A missing `.env` file is the common case outside of local development.
        let _ = dotenvy::dotenv();

        let env = std::env::var("WAYFARER_ENV").unwrap_or_else(|_| "development".to_string());

        let mut builder = Config::builder()
            // Start off with the base config.
            .add_source(File::with_name("config/base"))
            .set_override("env", env.as_str())?
            // Merge in an environment specific config.
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            // Add a local configuration file that is `.gitignore`ed.
            .add_source(File::with_name("config/local").required(false))
            // Add environment variables that start with "WAYFARER_" and have "__"
            // to separate levels. For example, `WAYFARER_HTTP__LISTEN` maps to
            // `Settings::http::listen`.
            .add_source(
                Environment::with_prefix("WAYFARER")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        builder = apply_database_env_overrides(builder, |name| std::env::var(name).ok())?;

        builder.build()?.try_deserialize()
    }

    /// Load settings from configuration files for tests.
    ///
    /// `changer` is applied to the loaded settings before they are returned.
    ///
    /// # Panics
    /// If the test configuration files cannot be read or are invalid.
    pub fn load_for_tests<F: FnOnce(&mut Self)>(changer: F) -> Self {
        let mut settings: Self = Config::builder()
            .add_source(File::with_name("../config/base"))
            .set_override("env", "test")
            .expect("Could not set env for tests")
            .add_source(File::with_name("../config/test"))
            .add_source(File::with_name("../config/local_test").required(false))
            .build()
            .expect("Could not load settings for tests")
            .try_deserialize()
            .expect("Could not convert settings");

        changer(&mut settings);
        settings
    }
}

/// Apply the conventional database variables on top of all other sources.
/// `lookup` resolves a variable name to its value, if set.
fn apply_database_env_overrides<St, F>(
    mut builder: ConfigBuilder<St>,
    lookup: F,
) -> Result<ConfigBuilder<St>, ConfigError>
where
    St: config::builder::BuilderState,
    F: Fn(&str) -> Option<String>,
{
    for (var, key) in DATABASE_ENV_OVERRIDES {
        builder = builder.set_override_option(key, lookup(var))?;
    }
    Ok(builder)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_settings_load() {
        let settings = Settings::load_for_tests(|_| ());
        assert_eq!(settings.env, "test");
        assert_eq!(settings.database.bucket, "travel-sample");
        assert_eq!(settings.database.scope, "inventory");
        assert_eq!(settings.database.backend, StoreBackend::Memory);
    }

    #[test]
    fn test_settings_changer_is_applied() {
        let settings = Settings::load_for_tests(|settings| settings.debug = true);
        assert!(settings.debug);
    }

    #[test]
    fn database_env_vars_override_files() {
        let builder = Config::builder()
            .add_source(File::with_name("../config/base"))
            .add_source(File::with_name("../config/test"));
        let builder = apply_database_env_overrides(builder, |name| match name {
            "DB_CONN_STR" => Some("couchbase://db.example.com".to_string()),
            "DB_USERNAME" => Some("Administrator".to_string()),
            _ => None,
        })
        .expect("overrides should apply");

        let settings: Settings = builder
            .set_override("env", "test")
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(
            settings.database.connection_string.as_deref(),
            Some("couchbase://db.example.com")
        );
        assert_eq!(settings.database.username.as_deref(), Some("Administrator"));
        assert_eq!(settings.database.password, None);
    }

    #[test]
    fn sentry_dsn_respects_mode() {
        let mut sentry = SentrySettings {
            mode: SentryMode::Disabled,
            dsn: Some("https://key@sentry.example.com/1".to_string()),
        };
        assert_eq!(sentry.dsn(), None);

        sentry.mode = SentryMode::Release;
        assert_eq!(sentry.dsn(), Some("https://key@sentry.example.com/1"));
        assert!(!sentry.debug());

        sentry.mode = SentryMode::Debug;
        assert!(sentry.debug());
    }
}
