//! Satchel configuration loaded from environment variables and secret files.
//!
//! Every value is looked up through [`SecretSource`]: a file named after the
//! variable in `SATCHEL_SECRETS_DIR` (default `/run/secrets`) wins, otherwise
//! the process environment is used.
//!
//! # Environment Variables
//!
//! ## Storage
//! - `SATCHEL_STORAGE` - `postgres` (default), `yaml` or `memory`
//! - `SATCHEL_SEED_FILE` - Seed document for `yaml` mode (default: bundled roster)
//! - `SATCHEL_DB_HOST`, `SATCHEL_DB_PORT`, `SATCHEL_DB_USER`,
//!   `SATCHEL_DB_PASSWORD`, `SATCHEL_DB_NAME` - Required in `postgres` mode
//!
//! ## Server
//! - `SATCHEL_HOST` - Bind address (default: 127.0.0.1)
//! - `SATCHEL_PORT` - Listen port (default: 8080)
//! - `SATCHEL_BASE_URL` - Public URL (default: <http://localhost:8080>)
//!
//! ## Auth
//! - `SATCHEL_ALLOWED_DOMAINS` - Comma-separated sign-in domains (default: objectcomputing.com)
//! - `SATCHEL_STARTER_REFLECTIONS` - `key=value;key=value` given to new profiles (default: none)
//! - `GOOGLE_OAUTH_CLIENT_ID` - Enables Google sign-in when set
//! - `GOOGLE_OAUTH_CLIENT_SECRET` - Google OAuth client secret
//! - `GOOGLE_OAUTH_CALLBACK_URL` - Callback (default: `{base_url}/auth/google/callback`)
//!
//! ## Observability
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment tag

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use secrecy::{ExposeSecret, SecretString};
use sqlx::postgres::PgConnectOptions;
use thiserror::Error;

const DEFAULT_SECRETS_DIR: &str = "/run/secrets";
const DEFAULT_ALLOWED_DOMAIN: &str = "objectcomputing.com";
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Where the environment half of a [`SecretSource`] comes from.
#[derive(Debug, Clone, Default)]
pub enum Environment {
    /// The process environment.
    #[default]
    Process,
    /// A fixed set of variables.
    Fixed(HashMap<String, String>),
}

/// Resolves configuration values from secret files, then the environment.
#[derive(Debug, Clone, Default)]
pub struct SecretSource {
    /// Directory holding one file per secret, named after the variable.
    pub dir: Option<PathBuf>,
    pub environment: Environment,
}

impl SecretSource {
    /// Secret files from `SATCHEL_SECRETS_DIR` (or `/run/secrets`) over the
    /// process environment.
    #[must_use]
    pub fn from_process() -> Self {
        let dir = std::env::var("SATCHEL_SECRETS_DIR")
            .map_or_else(|_| PathBuf::from(DEFAULT_SECRETS_DIR), PathBuf::from);
        Self {
            dir: Some(dir),
            environment: Environment::Process,
        }
    }

    /// A fixed variable set with no secret directory.
    #[must_use]
    pub fn fixed<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            dir: None,
            environment: Environment::Fixed(
                vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
            ),
        }
    }

    /// Look up `key`, preferring the secret file.
    ///
    /// Secret file contents are trimmed of surrounding whitespace.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<String> {
        if let Some(dir) = &self.dir
            && let Ok(contents) = std::fs::read_to_string(dir.join(key))
        {
            tracing::debug!(key, "using secret file");
            return Some(contents.trim().to_owned());
        }

        let value = match &self.environment {
            Environment::Process => std::env::var(key).ok(),
            Environment::Fixed(vars) => vars.get(key).cloned(),
        };
        value.filter(|v| !v.is_empty())
    }

    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.get(key)
            .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
    }

    fn or_default(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }

    fn parsed<T>(&self, key: &str, default: &str) -> Result<T, ConfigError>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        self.or_default(key, default)
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    }
}

/// Satchel application configuration.
#[derive(Debug, Clone)]
pub struct SatchelConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL
    pub base_url: String,
    /// Employee storage backend
    pub storage: StorageConfig,
    /// Sign-in policy
    pub auth: AuthConfig,
    /// Google OAuth client, if configured
    pub google: Option<OAuthProviderConfig>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment tag
    pub sentry_environment: Option<String>,
}

/// Which backend holds the employee directory.
#[derive(Debug, Clone)]
pub enum StorageConfig {
    /// `PostgreSQL` tables, migrated at startup.
    Postgres(DatabaseConfig),
    /// Read-only roster from a YAML seed; `None` means the bundled roster.
    Yaml { seed_file: Option<PathBuf> },
    /// Empty in-process store.
    Memory,
}

/// `PostgreSQL` connection settings.
///
/// Implements `Debug` manually to redact the password.
#[derive(Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: SecretString,
    pub name: String,
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .field("name", &self.name)
            .finish()
    }
}

impl DatabaseConfig {
    /// Load only the database settings, whatever `SATCHEL_STORAGE` says.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a `SATCHEL_DB_*` variable is missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_source(&SecretSource::from_process())
    }

    fn from_source(source: &SecretSource) -> Result<Self, ConfigError> {
        let port = source.required("SATCHEL_DB_PORT")?;
        Ok(Self {
            host: source.required("SATCHEL_DB_HOST")?,
            port: port.parse().map_err(|e: std::num::ParseIntError| {
                ConfigError::InvalidEnvVar("SATCHEL_DB_PORT".to_string(), e.to_string())
            })?,
            user: source.required("SATCHEL_DB_USER")?,
            password: SecretString::from(source.required("SATCHEL_DB_PASSWORD")?),
            name: source.required("SATCHEL_DB_NAME")?,
        })
    }

    /// Connection options for sqlx.
    #[must_use]
    pub fn connect_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .password(self.password.expose_secret())
            .database(&self.name)
    }
}

/// Who may sign in and what a new profile starts with.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Email domains allowed to sign in (exact, case-sensitive match)
    pub allowed_domains: Vec<String>,
    /// Reflections added to auto-provisioned profiles
    pub starter_reflections: Vec<(String, String)>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            allowed_domains: vec![DEFAULT_ALLOWED_DOMAIN.to_string()],
            starter_reflections: Vec::new(),
        }
    }
}

impl AuthConfig {
    fn from_source(source: &SecretSource) -> Result<Self, ConfigError> {
        let allowed_domains = source.get("SATCHEL_ALLOWED_DOMAINS").map_or_else(
            || vec![DEFAULT_ALLOWED_DOMAIN.to_string()],
            |raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|d| !d.is_empty())
                    .map(str::to_string)
                    .collect()
            },
        );
        if allowed_domains.is_empty() {
            return Err(ConfigError::InvalidEnvVar(
                "SATCHEL_ALLOWED_DOMAINS".to_string(),
                "must name at least one domain".to_string(),
            ));
        }

        let starter_reflections = source
            .get("SATCHEL_STARTER_REFLECTIONS")
            .map(|raw| parse_starter_reflections(&raw))
            .transpose()?
            .unwrap_or_default();

        Ok(Self {
            allowed_domains,
            starter_reflections,
        })
    }
}

/// OAuth client registration for one identity provider.
///
/// Implements `Debug` manually to redact the client secret.
#[derive(Clone)]
pub struct OAuthProviderConfig {
    pub client_id: String,
    pub client_secret: SecretString,
    pub callback_url: String,
}

impl std::fmt::Debug for OAuthProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthProviderConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("callback_url", &self.callback_url)
            .finish()
    }
}

impl OAuthProviderConfig {
    /// Read `{PROVIDER}_OAUTH_*`; `None` when no client id is set.
    fn from_source(
        source: &SecretSource,
        provider: &str,
        base_url: &str,
    ) -> Result<Option<Self>, ConfigError> {
        let prefix = provider.to_uppercase();
        let Some(client_id) = source.get(&format!("{prefix}_OAUTH_CLIENT_ID")) else {
            return Ok(None);
        };

        let secret_key = format!("{prefix}_OAUTH_CLIENT_SECRET");
        let client_secret = source.required(&secret_key)?;
        validate_secret_strength(&client_secret, &secret_key)?;

        let callback_key = format!("{prefix}_OAUTH_CALLBACK_URL");
        let callback_url = source.get(&callback_key).unwrap_or_else(|| {
            format!("{}/auth/{}/callback", base_url.trim_end_matches('/'), provider.to_lowercase())
        });
        validate_http_url(&callback_url, &callback_key)?;

        Ok(Some(Self {
            client_id,
            client_secret: SecretString::from(client_secret),
            callback_url,
        }))
    }
}

impl SatchelConfig {
    /// Load configuration from secret files and environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_source(&SecretSource::from_process())
    }

    /// Load configuration from an explicit source.
    ///
    /// # Errors
    ///
    /// See [`SatchelConfig::from_env`].
    pub fn from_source(source: &SecretSource) -> Result<Self, ConfigError> {
        let host = source.parsed::<IpAddr>("SATCHEL_HOST", "127.0.0.1")?;
        let port = source.parsed::<u16>("SATCHEL_PORT", "8080")?;
        let base_url = source.or_default("SATCHEL_BASE_URL", "http://localhost:8080");
        validate_http_url(&base_url, "SATCHEL_BASE_URL")?;

        let storage = match source.or_default("SATCHEL_STORAGE", "postgres").as_str() {
            "postgres" => StorageConfig::Postgres(DatabaseConfig::from_source(source)?),
            "yaml" => StorageConfig::Yaml {
                seed_file: source.get("SATCHEL_SEED_FILE").map(PathBuf::from),
            },
            "memory" => StorageConfig::Memory,
            other => {
                return Err(ConfigError::InvalidEnvVar(
                    "SATCHEL_STORAGE".to_string(),
                    format!("unknown storage '{other}' (expected postgres, yaml or memory)"),
                ));
            }
        };

        let auth = AuthConfig::from_source(source)?;
        let google = OAuthProviderConfig::from_source(source, "google", &base_url)?;

        Ok(Self {
            host,
            port,
            base_url,
            storage,
            auth,
            google,
            sentry_dsn: source.get("SENTRY_DSN"),
            sentry_environment: source.get("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Require an absolute `http` or `https` URL.
fn validate_http_url(value: &str, var_name: &str) -> Result<(), ConfigError> {
    let url = url::Url::parse(value)
        .map_err(|e| ConfigError::InvalidEnvVar(var_name.to_string(), e.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(ConfigError::InvalidEnvVar(
            var_name.to_string(),
            format!("unsupported scheme '{scheme}'"),
        )),
    }
}

/// Parse `key=value;key=value`.
fn parse_starter_reflections(raw: &str) -> Result<Vec<(String, String)>, ConfigError> {
    raw.split(';')
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            pair.split_once('=')
                .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
                .filter(|(k, _)| !k.is_empty())
                .ok_or_else(|| {
                    ConfigError::InvalidEnvVar(
                        "SATCHEL_STARTER_REFLECTIONS".to_string(),
                        format!("expected key=value, got '{pair}'"),
                    )
                })
        })
        .collect()
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use the secret issued by the provider."
            ),
        ));
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const GOOD_SECRET: &str = "GOCSPX-aB3xY9mK2nL5pQ7rT0uW4zC6";

    fn memory_source(extra: &[(&str, &str)]) -> SecretSource {
        let mut vars = vec![("SATCHEL_STORAGE", "memory")];
        vars.extend_from_slice(extra);
        SecretSource::fixed(vars)
    }

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let err = validate_secret_strength("your-client-secret", "TEST_VAR").unwrap_err();
        assert!(matches!(err, ConfigError::InsecureSecret(_, _)));
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        assert!(validate_secret_strength("aaaaaaaaaaaaaaaaaaaaaaaa", "TEST_VAR").is_err());
    }

    #[test]
    fn test_base_url_must_be_http() {
        let err = SatchelConfig::from_source(&memory_source(&[("SATCHEL_BASE_URL", "localhost")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(key, _) if key == "SATCHEL_BASE_URL"));

        let err = SatchelConfig::from_source(&memory_source(&[(
            "SATCHEL_BASE_URL",
            "ftp://satchel.example.com",
        )]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(key, _) if key == "SATCHEL_BASE_URL"));
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        assert!(validate_secret_strength(GOOD_SECRET, "TEST_VAR").is_ok());
    }

    #[test]
    fn test_defaults() {
        let config = SatchelConfig::from_source(&memory_source(&[])).unwrap();

        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:8080");
        assert_eq!(config.base_url, "http://localhost:8080");
        assert!(matches!(config.storage, StorageConfig::Memory));
        assert_eq!(config.auth.allowed_domains, ["objectcomputing.com"]);
        assert!(config.auth.starter_reflections.is_empty());
        assert!(config.google.is_none());
        assert!(config.sentry_dsn.is_none());
    }

    #[test]
    fn test_postgres_requires_database_settings() {
        let err = SatchelConfig::from_source(&SecretSource::fixed([("SATCHEL_DB_HOST", "db")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(_)));
    }

    #[test]
    fn test_postgres_settings() {
        let source = SecretSource::fixed([
            ("SATCHEL_DB_HOST", "db"),
            ("SATCHEL_DB_PORT", "5433"),
            ("SATCHEL_DB_USER", "satchel"),
            ("SATCHEL_DB_PASSWORD", "hunter2"),
            ("SATCHEL_DB_NAME", "directory"),
        ]);
        let config = SatchelConfig::from_source(&source).unwrap();

        let StorageConfig::Postgres(db) = config.storage else {
            panic!("expected postgres storage");
        };
        assert_eq!(db.port, 5433);
        assert_eq!(db.connect_options().get_database(), Some("directory"));

        let debug = format!("{db:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn test_invalid_port() {
        let err = SatchelConfig::from_source(&memory_source(&[("SATCHEL_PORT", "eighty")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(key, _) if key == "SATCHEL_PORT"));
    }

    #[test]
    fn test_unknown_storage() {
        let err = SatchelConfig::from_source(&SecretSource::fixed([("SATCHEL_STORAGE", "mongo")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(_, _)));
    }

    #[test]
    fn test_yaml_storage_seed_file() {
        let source = SecretSource::fixed([
            ("SATCHEL_STORAGE", "yaml"),
            ("SATCHEL_SEED_FILE", "/srv/roster.yaml"),
        ]);
        let config = SatchelConfig::from_source(&source).unwrap();
        assert!(matches!(
            config.storage,
            StorageConfig::Yaml { seed_file: Some(ref p) } if p == &PathBuf::from("/srv/roster.yaml")
        ));
    }

    #[test]
    fn test_allowed_domains_and_starter_reflections() {
        let config = SatchelConfig::from_source(&memory_source(&[
            ("SATCHEL_ALLOWED_DOMAINS", "objectcomputing.com, unityfoundation.io"),
            ("SATCHEL_STARTER_REFLECTIONS", "Favorite Tool=vim; Team = Platform"),
        ]))
        .unwrap();

        assert_eq!(
            config.auth.allowed_domains,
            ["objectcomputing.com", "unityfoundation.io"]
        );
        assert_eq!(
            config.auth.starter_reflections,
            [
                ("Favorite Tool".to_string(), "vim".to_string()),
                ("Team".to_string(), "Platform".to_string()),
            ]
        );
    }

    #[test]
    fn test_malformed_starter_reflections() {
        let err = SatchelConfig::from_source(&memory_source(&[(
            "SATCHEL_STARTER_REFLECTIONS",
            "no-equals-sign",
        )]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(_, _)));
    }

    #[test]
    fn test_google_provider_defaults_callback() {
        let config = SatchelConfig::from_source(&memory_source(&[
            ("GOOGLE_OAUTH_CLIENT_ID", "1234.apps.googleusercontent.com"),
            ("GOOGLE_OAUTH_CLIENT_SECRET", GOOD_SECRET),
        ]))
        .unwrap();

        let google = config.google.unwrap();
        assert_eq!(google.callback_url, "http://localhost:8080/auth/google/callback");

        let debug = format!("{google:?}");
        assert!(debug.contains("1234.apps.googleusercontent.com"));
        assert!(!debug.contains(GOOD_SECRET));
    }

    #[test]
    fn test_google_provider_rejects_placeholder_secret() {
        let err = SatchelConfig::from_source(&memory_source(&[
            ("GOOGLE_OAUTH_CLIENT_ID", "1234.apps.googleusercontent.com"),
            ("GOOGLE_OAUTH_CLIENT_SECRET", "changeme"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InsecureSecret(_, _)));
    }

    #[test]
    fn test_secret_file_wins_over_environment() {
        let dir = std::env::temp_dir().join(format!("satchel-secrets-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("SATCHEL_PORT"), "9090\n").unwrap();

        let mut source = memory_source(&[("SATCHEL_PORT", "8081")]);
        source.dir = Some(dir.clone());
        let config = SatchelConfig::from_source(&source).unwrap();

        std::fs::remove_dir_all(&dir).unwrap();
        assert_eq!(config.port, 9090);
    }
}
