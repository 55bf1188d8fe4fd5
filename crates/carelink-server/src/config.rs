use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, bail};

const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
];

#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub db_path: PathBuf,
    pub upload_dir: PathBuf,
    pub jwt_secret: String,
    /// Empty means any origin is allowed.
    pub cors_origins: Vec<String>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let jwt_secret = get("CARELINK_JWT_SECRET").unwrap_or_default();
        if jwt_secret.trim().is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("CARELINK_JWT_SECRET is unset or still a placeholder");
        }

        let host = get("CARELINK_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = get("CARELINK_PORT")
            .unwrap_or_else(|| "8080".into())
            .parse()
            .context("CARELINK_PORT must be a port number")?;
        let addr: SocketAddr = format!("{}:{}", host, port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", host, port))?;

        let db_path: PathBuf = get("CARELINK_DB_PATH")
            .unwrap_or_else(|| "carelink.db".into())
            .into();
        let upload_dir: PathBuf = get("CARELINK_UPLOAD_DIR")
            .unwrap_or_else(|| "./uploads".into())
            .into();

        let cors_origins = get("CARELINK_CORS_ORIGINS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|o| !o.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            addr,
            db_path,
            upload_dir,
            jwt_secret,
            cors_origins,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> anyhow::Result<Config> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_only_secret_is_set() {
        let config = load(&[("CARELINK_JWT_SECRET", "s3cret-value")]).unwrap();
        assert_eq!(config.addr, "0.0.0.0:8080".parse::<SocketAddr>().unwrap());
        assert_eq!(config.db_path, PathBuf::from("carelink.db"));
        assert_eq!(config.upload_dir, PathBuf::from("./uploads"));
        assert!(config.cors_origins.is_empty());
    }

    #[test]
    fn missing_or_placeholder_secret_is_fatal() {
        assert!(load(&[]).is_err());
        assert!(load(&[("CARELINK_JWT_SECRET", "dev-secret-change-me")]).is_err());
        assert!(load(&[("CARELINK_JWT_SECRET", "   ")]).is_err());
    }

    #[test]
    fn overrides_are_read() {
        let config = load(&[
            ("CARELINK_JWT_SECRET", "s3cret-value"),
            ("CARELINK_HOST", "127.0.0.1"),
            ("CARELINK_PORT", "9000"),
            ("CARELINK_CORS_ORIGINS", "http://localhost:3000, https://app.example.com,"),
        ])
        .unwrap();
        assert_eq!(config.addr, "127.0.0.1:9000".parse::<SocketAddr>().unwrap());
        assert_eq!(
            config.cors_origins,
            vec!["http://localhost:3000", "https://app.example.com"]
        );
    }

    #[test]
    fn bad_port_is_rejected() {
        assert!(load(&[("CARELINK_JWT_SECRET", "x"), ("CARELINK_PORT", "eighty")]).is_err());
    }
}
