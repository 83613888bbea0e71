//! Service settings from environment variables and an optional `.env` file.
//!
//! Loaded once at startup, fails fast if a required variable is missing or
//! a value does not coerce to its field type. Credentials are wrapped in
//! `secrecy::SecretString` so the record can be logged with `{:?}`.

use std::collections::HashMap;
use std::fmt::Display;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use secrecy::SecretString;

/// Env file read by [`Settings::from_env`], relative to the working directory.
pub const ENV_FILE: &str = ".env";

const DEFAULT_CORS_ORIGINS: &str = "http://localhost:3000,http://localhost:5173";

#[derive(Debug)]
pub struct Settings {
    // Application
    pub app_name: String,
    pub app_env: String,
    pub debug: bool,
    pub api_host: String,
    pub api_port: u16,

    // Database
    pub database_url: SecretString,
    pub db_echo: bool,

    // Supabase
    pub supabase_url: String,
    pub supabase_key: SecretString,
    pub supabase_service_key: Option<SecretString>,

    // Integrations
    pub github_token: Option<SecretString>,
    pub anthropic_api_key: Option<SecretString>,

    /// Comma-separated allowed CORS origins, see [`Settings::cors_origins_list`].
    pub cors_origins: String,

    // JWT
    pub jwt_secret_key: SecretString,
    pub jwt_algorithm: String,
    pub access_token_expire_minutes: i64,

    pub log_level: String,
}

impl Settings {
    /// Load settings from `.env` (if present) and the process environment.
    ///
    /// Live environment variables override values from the file.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(Some(Path::new(ENV_FILE)), process_vars())
    }

    /// Load settings from an optional env file merged with `vars`.
    ///
    /// A missing file is skipped. Entries in `vars` take precedence over
    /// entries from the file.
    pub fn load<I, K, V>(env_file: Option<&Path>, vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut merged = match env_file {
            Some(path) => read_env_file(path)?,
            None => Vec::new(),
        };
        merged.extend(vars.into_iter().map(|(k, v)| (k.into(), v.into())));
        Self::from_vars(merged)
    }

    /// Build settings from key/value pairs.
    ///
    /// Keys are matched case-insensitively; when a key repeats, the later
    /// pair wins. Unrecognized keys are ignored.
    pub fn from_vars<I, K, V>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let source = Source::new(vars);

        Ok(Self {
            app_name: source.string("app_name", "DevJournal API"),
            app_env: source.string("app_env", "development"),
            debug: source.flag("debug", true)?,
            api_host: source.string("api_host", "0.0.0.0"),
            api_port: source.parse("api_port", 8000)?,

            database_url: source.secret("database_url")?,
            db_echo: source.flag("db_echo", false)?,

            supabase_url: source.required("supabase_url")?,
            supabase_key: source.secret("supabase_key")?,
            supabase_service_key: source.optional_secret("supabase_service_key"),

            github_token: source.optional_secret("github_token"),
            anthropic_api_key: source.optional_secret("anthropic_api_key"),

            cors_origins: source.string("cors_origins", DEFAULT_CORS_ORIGINS),

            jwt_secret_key: source.secret("jwt_secret_key")?,
            jwt_algorithm: source.string("jwt_algorithm", "HS256"),
            access_token_expire_minutes: source.parse("access_token_expire_minutes", 30)?,

            log_level: source.string("log_level", "INFO"),
        })
    }

    /// Allowed CORS origins, in configured order.
    ///
    /// Each comma-separated entry is trimmed; empty entries are kept, so an
    /// empty `cors_origins` yields a single empty string.
    pub fn cors_origins_list(&self) -> Vec<String> {
        self.cors_origins
            .split(',')
            .map(|origin| origin.trim().to_string())
            .collect()
    }

    /// Address the HTTP listener binds to.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.api_host, self.api_port)
    }

    /// `log_level` as a `tracing` filter directive.
    ///
    /// Python-style level names (`WARNING`, `CRITICAL`, ...) are mapped to
    /// their tracing equivalents; anything else passes through lower-cased.
    pub fn log_filter(&self) -> String {
        let level = self.log_level.trim().to_ascii_lowercase();
        match level.as_str() {
            "critical" | "fatal" => "error".to_string(),
            "warning" => "warn".to_string(),
            "notset" => "trace".to_string(),
            _ => level,
        }
    }

    pub fn is_production(&self) -> bool {
        self.app_env.eq_ignore_ascii_case("production")
    }
}

/// Configuration errors. All of them are fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Required environment variable is missing or empty.
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    /// Value could not be coerced to the field's type.
    #[error("invalid value for environment variable {name}: {reason}")]
    InvalidValue { name: String, reason: String },

    /// The env file exists but could not be read (I/O error, invalid UTF-8).
    #[error("failed to read env file {}: {source}", path.display())]
    EnvFile {
        path: PathBuf,
        source: dotenvy::Error,
    },
}

/// Process environment, skipping entries that are not valid UTF-8.
fn process_vars() -> impl Iterator<Item = (String, String)> {
    std::env::vars_os()
        .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)))
}

/// Read `path` without touching the process environment.
///
/// Only `${NAME}` references are expanded; a bare `$` is kept as written.
/// Lines that do not parse are skipped with a warning.
fn read_env_file(path: &Path) -> Result<Vec<(String, String)>, ConfigError> {
    let to_error = |source: dotenvy::Error| ConfigError::EnvFile {
        path: path.to_path_buf(),
        source,
    };

    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(to_error(dotenvy::Error::Io(err))),
    };
    let escaped = escape_bare_dollars(&text);

    let mut vars = Vec::new();
    for item in dotenvy::from_read_iter(escaped.as_bytes()) {
        match item {
            Ok(pair) => vars.push(pair),
            // The message carries the raw line, which may hold a secret.
            Err(dotenvy::Error::LineParse(..)) => {
                tracing::warn!("Skipping unparsable line in {}", path.display());
            }
            Err(err) => return Err(to_error(err)),
        }
    }
    Ok(vars)
}

/// Backslash-escape every `$` that does not open `${...}`, so dotenvy does
/// not expand `$NAME`. Single-quoted text and comments are copied as is.
fn escape_bare_dollars(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    let mut quote: Option<char> = None;
    let mut after_blank = true;

    while let Some(c) = chars.next() {
        match (quote, c) {
            (None, '#') if after_blank => {
                out.push(c);
                while let Some(&next) = chars.peek() {
                    if next == '\n' {
                        break;
                    }
                    out.push(next);
                    chars.next();
                }
            }
            (Some('\''), '\'') => {
                quote = None;
                out.push(c);
            }
            (Some('\''), _) => out.push(c),
            (_, '\\') => {
                out.push(c);
                if let Some(next) = chars.next() {
                    out.push(next);
                }
            }
            (None, '\'' | '"') => {
                quote = Some(c);
                out.push(c);
            }
            (Some('"'), '"') => {
                quote = None;
                out.push(c);
            }
            (_, '$') if chars.peek() != Some(&'{') => out.push_str("\\$"),
            _ => out.push(c),
        }
        after_blank = c.is_whitespace();
    }
    out
}

/// Merged variables keyed by lower-cased name.
struct Source {
    vars: HashMap<String, String>,
}

impl Source {
    fn new<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let vars = vars
            .into_iter()
            .map(|(k, v)| (k.into().to_lowercase(), v.into()))
            .collect();
        Self { vars }
    }

    fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    fn string(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or(default).to_string()
    }

    fn required(&self, key: &str) -> Result<String, ConfigError> {
        match self.get(key) {
            Some(value) if !value.is_empty() => Ok(value.to_string()),
            _ => Err(ConfigError::MissingEnvVar(key.to_uppercase())),
        }
    }

    fn secret(&self, key: &str) -> Result<SecretString, ConfigError> {
        self.required(key).map(SecretString::from)
    }

    fn optional_secret(&self, key: &str) -> Option<SecretString> {
        self.get(key)
            .filter(|value| !value.is_empty())
            .map(|value| SecretString::from(value.to_string()))
    }

    fn parse<T>(&self, key: &str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: Display,
    {
        match self.get(key) {
            None => Ok(default),
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|err: T::Err| invalid(key, format!("{raw:?}: {err}"))),
        }
    }

    fn flag(&self, key: &str, default: bool) -> Result<bool, ConfigError> {
        match self.get(key) {
            None => Ok(default),
            Some(raw) => parse_bool(raw)
                .ok_or_else(|| invalid(key, format!("{raw:?} is not a boolean"))),
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "t" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "f" | "no" | "n" | "off" => Some(false),
        _ => None,
    }
}

fn invalid(key: &str, reason: String) -> ConfigError {
    ConfigError::InvalidValue {
        name: key.to_uppercase(),
        reason,
    }
}
