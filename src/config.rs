use anyhow::Context;
use axum::http::HeaderName;
use serde::Deserialize;

/// One year.
const MAX_TTL_MINUTES: i64 = 525_600;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// `None` runs the service against the in-memory store.
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub jwt: JwtConfig,
    /// Header carrying the session token on authenticated calls.
    pub token_header: String,
    pub host: String,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").filter(|v| !v.trim().is_empty());
        let jwt = JwtConfig {
            secret: lookup("JWT_SECRET").context("JWT_SECRET is not set")?,
            issuer: lookup("JWT_ISSUER").unwrap_or_else(|| "accounts".into()),
            audience: lookup("JWT_AUDIENCE").unwrap_or_else(|| "accounts-users".into()),
            ttl_minutes: parse_or(&lookup, "JWT_TTL_MINUTES", 120)?,
        };
        anyhow::ensure!(!jwt.secret.is_empty(), "JWT_SECRET must not be empty");
        anyhow::ensure!(
            (0..=MAX_TTL_MINUTES).contains(&jwt.ttl_minutes),
            "JWT_TTL_MINUTES must be between 0 and {MAX_TTL_MINUTES}, got {}",
            jwt.ttl_minutes
        );

        let token_header = lookup("TOKEN_HEADER")
            .map(|v| v.trim().to_ascii_lowercase())
            .unwrap_or_else(|| "authorization".into());
        HeaderName::from_bytes(token_header.as_bytes())
            .with_context(|| format!("TOKEN_HEADER has invalid value {token_header:?}"))?;

        Ok(Self {
            database_url,
            db_max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", 10)?,
            jwt,
            token_header,
            host: lookup("APP_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: parse_or(&lookup, "APP_PORT", 8080)?,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> anyhow::Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} has invalid value {raw:?}")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_only_secret_is_set() {
        let cfg = AppConfig::from_lookup(lookup_from(&[("JWT_SECRET", "s3cret")])).unwrap();
        assert!(cfg.database_url.is_none());
        assert_eq!(cfg.db_max_connections, 10);
        assert_eq!(cfg.jwt.issuer, "accounts");
        assert_eq!(cfg.jwt.audience, "accounts-users");
        assert_eq!(cfg.jwt.ttl_minutes, 120);
        assert_eq!(cfg.token_header, "authorization");
        assert_eq!(cfg.port, 8080);
    }

    #[test]
    fn reads_overrides() {
        let cfg = AppConfig::from_lookup(lookup_from(&[
            ("JWT_SECRET", "s3cret"),
            ("DATABASE_URL", "postgres://u:p@db/accounts"),
            ("JWT_TTL_MINUTES", "5"),
            ("TOKEN_HEADER", "SaToken"),
            ("APP_PORT", "9000"),
        ]))
        .unwrap();
        assert_eq!(cfg.database_url.as_deref(), Some("postgres://u:p@db/accounts"));
        assert_eq!(cfg.jwt.ttl_minutes, 5);
        assert_eq!(cfg.token_header, "satoken");
        assert_eq!(cfg.port, 9000);
    }

    #[test]
    fn missing_secret_is_an_error() {
        let err = AppConfig::from_lookup(lookup_from(&[])).unwrap_err();
        assert!(err.to_string().contains("JWT_SECRET"));
    }

    #[test]
    fn unparsable_number_is_an_error() {
        let err = AppConfig::from_lookup(lookup_from(&[
            ("JWT_SECRET", "s3cret"),
            ("APP_PORT", "eighty"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("APP_PORT"));
    }

    #[test]
    fn ttl_outside_bounds_is_an_error() {
        for ttl in ["-1", "525601", "5000000000", "9223372036854775807"] {
            let err = AppConfig::from_lookup(lookup_from(&[
                ("JWT_SECRET", "s3cret"),
                ("JWT_TTL_MINUTES", ttl),
            ]))
            .unwrap_err();
            assert!(err.to_string().contains("JWT_TTL_MINUTES"), "ttl {ttl}: {err}");
        }
        let cfg = AppConfig::from_lookup(lookup_from(&[
            ("JWT_SECRET", "s3cret"),
            ("JWT_TTL_MINUTES", "525600"),
        ]))
        .unwrap();
        assert_eq!(cfg.jwt.ttl_minutes, MAX_TTL_MINUTES);
    }

    #[test]
    fn invalid_token_header_is_an_error() {
        for header in ["", "   ", "bad header", "x-token:"] {
            let err = AppConfig::from_lookup(lookup_from(&[
                ("JWT_SECRET", "s3cret"),
                ("TOKEN_HEADER", header),
            ]))
            .unwrap_err();
            assert!(err.to_string().contains("TOKEN_HEADER"), "header {header:?}: {err}");
        }
    }

    #[test]
    fn blank_database_url_selects_memory_store() {
        let cfg = AppConfig::from_lookup(lookup_from(&[
            ("JWT_SECRET", "s3cret"),
            ("DATABASE_URL", "  "),
        ]))
        .unwrap();
        assert!(cfg.database_url.is_none());
    }
}
