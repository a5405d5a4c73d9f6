//! Environment-driven configuration for the embedding process.
//!
//! Missing live credentials are a normal, handled condition: the feed runs
//! its synthetic generator. Only malformed values (an unparseable port) are
//! rejected at this boundary.

use std::env;
use std::path::PathBuf;

use anyhow::{anyhow, Result};
use tracing::warn;

const ENV_API_KEY: &str = "API_KEY";
const ENV_API_SECRET_KEY: &str = "API_SECRET_KEY";
const ENV_ACCESS_TOKEN: &str = "ACCESS_TOKEN";
const ENV_ACCESS_TOKEN_SECRET: &str = "ACCESS_TOKEN_SECRET";
const ENV_BEARER_TOKEN: &str = "BEARER_TOKEN";
const ENV_KEYWORDS: &str = "TRACK_KEYWORDS";
const ENV_DATABASE_PATH: &str = "DATABASE_PATH";
const ENV_DEBUG: &str = "DEBUG";
const ENV_API_PORT: &str = "API_PORT";
const ENV_DASHBOARD_PORT: &str = "DASHBOARD_PORT";

/// Keywords tracked when `TRACK_KEYWORDS` is unset.
pub const DEFAULT_KEYWORDS: [&str; 5] = [
    "python",
    "data science",
    "AI",
    "machine learning",
    "artificial intelligence",
];

/// Opaque secrets for the live feed. Only the bearer token is required for
/// the streaming endpoint; the other four ride along for API parity.
#[derive(Clone)]
pub struct LiveCredentials {
    pub api_key: String,
    pub api_secret_key: String,
    pub access_token: String,
    pub access_token_secret: String,
    pub bearer_token: String,
}

impl LiveCredentials {
    pub fn is_usable(&self) -> bool {
        !self.bearer_token.trim().is_empty()
    }
}

impl std::fmt::Debug for LiveCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveCredentials")
            .field("bearer_token", &"<redacted>")
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub live: Option<LiveCredentials>,
    pub keywords: Vec<String>,
    pub database_path: PathBuf,
    pub api_port: u16,
    pub dashboard_port: u16,
    pub debug: bool,
}

impl Config {
    /// Read configuration from the environment (call `dotenvy::dotenv()`
    /// first if a `.env` file should participate).
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            live: load_live_credentials(),
            keywords: env::var(ENV_KEYWORDS)
                .ok()
                .map(|s| parse_keywords(&s))
                .filter(|v| !v.is_empty())
                .unwrap_or_else(default_keywords),
            database_path: env::var(ENV_DATABASE_PATH)
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("data/events.db")),
            api_port: parse_port(ENV_API_PORT, 5000)?,
            dashboard_port: parse_port(ENV_DASHBOARD_PORT, 8050)?,
            debug: env::var(ENV_DEBUG)
                .map(|v| v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
        })
    }
}

pub fn default_keywords() -> Vec<String> {
    DEFAULT_KEYWORDS.iter().map(|s| s.to_string()).collect()
}

/// `Some` only when all five secrets are present; anything missing yields
/// `None` with a warning listing what was absent.
fn load_live_credentials() -> Option<LiveCredentials> {
    let vars = [
        ENV_API_KEY,
        ENV_API_SECRET_KEY,
        ENV_ACCESS_TOKEN,
        ENV_ACCESS_TOKEN_SECRET,
        ENV_BEARER_TOKEN,
    ];
    let mut values = Vec::with_capacity(vars.len());
    let mut missing = Vec::new();
    for var in vars {
        match env::var(var) {
            Ok(v) if !v.trim().is_empty() => values.push(v),
            _ => missing.push(var),
        }
    }
    if !missing.is_empty() {
        warn!(missing = ?missing, "live credentials missing; the feed will run synthetic");
        return None;
    }
    let mut it = values.into_iter();
    Some(LiveCredentials {
        api_key: it.next().expect("five values collected"),
        api_secret_key: it.next().expect("five values collected"),
        access_token: it.next().expect("five values collected"),
        access_token_secret: it.next().expect("five values collected"),
        bearer_token: it.next().expect("five values collected"),
    })
}

/// Comma-separated list; entries trimmed, empties dropped, duplicates
/// removed with first-seen order preserved.
fn parse_keywords(raw: &str) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter(|s| seen.insert(s.to_lowercase()))
        .map(str::to_string)
        .collect()
}

fn parse_port(var: &str, default: u16) -> Result<u16> {
    match env::var(var) {
        Err(_) => Ok(default),
        Ok(raw) => raw
            .trim()
            .parse::<u16>()
            .map_err(|_| anyhow!("invalid {var}: {raw:?} is not a port number")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn keywords_are_trimmed_deduped_and_ordered() {
        let out = parse_keywords(" AI , rust,, ai ,data science ");
        assert_eq!(out, vec!["AI".to_string(), "rust".into(), "data science".into()]);
    }

    #[test]
    fn empty_keyword_list_parses_to_empty() {
        assert!(parse_keywords(" , ,").is_empty());
    }

    #[serial_test::serial]
    #[test]
    fn missing_credentials_yield_none() {
        for var in [
            ENV_API_KEY,
            ENV_API_SECRET_KEY,
            ENV_ACCESS_TOKEN,
            ENV_ACCESS_TOKEN_SECRET,
            ENV_BEARER_TOKEN,
        ] {
            env::remove_var(var);
        }
        assert!(load_live_credentials().is_none());

        // A partial set is still "missing".
        env::set_var(ENV_BEARER_TOKEN, "b");
        assert!(load_live_credentials().is_none());
        env::remove_var(ENV_BEARER_TOKEN);
    }

    #[serial_test::serial]
    #[test]
    fn full_credential_set_is_loaded() {
        env::set_var(ENV_API_KEY, "k");
        env::set_var(ENV_API_SECRET_KEY, "sk");
        env::set_var(ENV_ACCESS_TOKEN, "at");
        env::set_var(ENV_ACCESS_TOKEN_SECRET, "ats");
        env::set_var(ENV_BEARER_TOKEN, "bt");
        let creds = load_live_credentials().expect("all five present");
        assert_eq!(creds.bearer_token, "bt");
        assert!(creds.is_usable());
        for var in [
            ENV_API_KEY,
            ENV_API_SECRET_KEY,
            ENV_ACCESS_TOKEN,
            ENV_ACCESS_TOKEN_SECRET,
            ENV_BEARER_TOKEN,
        ] {
            env::remove_var(var);
        }
    }

    #[serial_test::serial]
    #[test]
    fn invalid_port_is_rejected_at_the_boundary() {
        env::set_var(ENV_API_PORT, "not-a-port");
        assert!(parse_port(ENV_API_PORT, 5000).is_err());
        env::remove_var(ENV_API_PORT);
        assert_eq!(parse_port(ENV_API_PORT, 5000).unwrap(), 5000);
    }
}
