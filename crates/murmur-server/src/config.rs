use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &["change-me-to-a-random-string", "dev-secret-change-me"];

const DEFAULT_MAIL_FROM: &str = "onboarding@resend.dev";

pub struct Config {
    pub jwt_secret: String,
    pub db_path: PathBuf,
    pub addr: SocketAddr,
    /// `None` selects the log mailer.
    pub resend_api_key: Option<String>,
    pub mail_from: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let jwt_secret = var("MURMUR_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("MURMUR_JWT_SECRET is unset or still a placeholder");
        }

        let db_path = var("MURMUR_DB_PATH").unwrap_or_else(|| "murmur.db".into()).into();
        let host = var("MURMUR_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = var("MURMUR_PORT")
            .unwrap_or_else(|| "3000".into())
            .parse()
            .context("MURMUR_PORT must be a port number")?;
        let addr: SocketAddr = format!("{}:{}", host, port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", host, port))?;

        let resend_api_key = var("MURMUR_RESEND_API_KEY").filter(|k| !k.trim().is_empty());
        let mail_from = var("MURMUR_MAIL_FROM").unwrap_or_else(|| DEFAULT_MAIL_FROM.into());

        Ok(Self {
            jwt_secret,
            db_path,
            addr,
            resend_api_key,
            mail_from,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<Config> {
        let env: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let config = load(&[("MURMUR_JWT_SECRET", "a-real-secret")]).unwrap();
        assert_eq!(config.db_path, PathBuf::from("murmur.db"));
        assert_eq!(config.addr, "0.0.0.0:3000".parse().unwrap());
        assert!(config.resend_api_key.is_none());
        assert_eq!(config.mail_from, DEFAULT_MAIL_FROM);
    }

    #[test]
    fn placeholder_secret_is_refused() {
        assert!(load(&[]).is_err());
        assert!(load(&[("MURMUR_JWT_SECRET", "dev-secret-change-me")]).is_err());
    }

    #[test]
    fn overrides() {
        let config = load(&[
            ("MURMUR_JWT_SECRET", "a-real-secret"),
            ("MURMUR_HOST", "127.0.0.1"),
            ("MURMUR_PORT", "8080"),
            ("MURMUR_RESEND_API_KEY", "re_123"),
        ])
        .unwrap();
        assert_eq!(config.addr, "127.0.0.1:8080".parse().unwrap());
        assert_eq!(config.resend_api_key.as_deref(), Some("re_123"));
    }

    #[test]
    fn bad_port() {
        assert!(load(&[("MURMUR_JWT_SECRET", "s"), ("MURMUR_PORT", "http")]).is_err());
    }
}
