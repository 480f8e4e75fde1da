use std::env;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use dotenvy::dotenv;
use url::Url;

use crate::invites::code::{DEFAULT_CODE_LENGTH, MAX_CODE_LENGTH};

/// Knobs for issuing invite codes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InviteSettings {
    pub code_length: usize,
    pub ttl: chrono::Duration,
    pub max_code_attempts: u32,
}

impl Default for InviteSettings {
    fn default() -> Self {
        Self {
            code_length: DEFAULT_CODE_LENGTH,
            ttl: chrono::Duration::days(7),
            max_code_attempts: 5,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    /// Front-end origin that share links point at; always ends with `/`.
    pub public_base_url: Url,
    pub secure_cookies: bool,
    pub database: DatabaseConfig,
    pub invites: InviteSettings,
}

impl AppConfig {
    /// Reads the process environment, after loading `.env` if there is one.
    pub fn from_env() -> Result<Self> {
        match dotenv() {
            Ok(_) => {}
            Err(e) if e.not_found() => {}
            Err(e) => return Err(e).context("Failed to load .env file"),
        }
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let database_url = lookup("DATABASE_URL").context("DATABASE_URL must be set")?;

        let raw_base_url =
            lookup("PUBLIC_BASE_URL").unwrap_or_else(|| "http://localhost:5173".to_string());
        let mut public_base_url = Url::parse(raw_base_url.trim())
            .with_context(|| format!("PUBLIC_BASE_URL is not a valid URL: {}", raw_base_url))?;
        if public_base_url.cannot_be_a_base() {
            bail!("PUBLIC_BASE_URL must be an absolute http(s) URL");
        }
        if !public_base_url.path().ends_with('/') {
            let path = format!("{}/", public_base_url.path());
            public_base_url.set_path(&path);
        }

        let code_length: usize = parse_var(&lookup, "INVITE_CODE_LENGTH", DEFAULT_CODE_LENGTH)?;
        if code_length == 0 || code_length > MAX_CODE_LENGTH {
            bail!("INVITE_CODE_LENGTH must be between 1 and {}", MAX_CODE_LENGTH);
        }
        let ttl_days: i64 = parse_var(&lookup, "INVITE_TTL_DAYS", 7)?;
        if ttl_days < 1 {
            bail!("INVITE_TTL_DAYS must be at least 1");
        }
        let max_code_attempts: u32 = parse_var(&lookup, "INVITE_MAX_CODE_ATTEMPTS", 5)?;
        if max_code_attempts == 0 {
            bail!("INVITE_MAX_CODE_ATTEMPTS must be at least 1");
        }

        Ok(Self {
            bind_addr: lookup("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:3000".to_string()),
            public_base_url,
            secure_cookies: parse_var(&lookup, "COOKIE_SECURE", true)?,
            database: DatabaseConfig {
                url: database_url,
                max_connections: parse_var(&lookup, "DB_MAX_CONNECTIONS", 20)?,
                acquire_timeout: Duration::from_secs(parse_var(
                    &lookup,
                    "DB_ACQUIRE_TIMEOUT_SECS",
                    5,
                )?),
            },
            invites: InviteSettings {
                code_length,
                ttl: chrono::Duration::days(ttl_days),
                max_code_attempts,
            },
        })
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow!("{} has an invalid value {:?}: {}", key, raw, e)),
    }
}
