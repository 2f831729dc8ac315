use std::{env, str::FromStr, time::Duration};

use anyhow::Context;
use url::Url;

const DEFAULT_PORT: u16 = 5000;
const DEFAULT_UPSTREAM: &str = "https://animeapi.skin/";
const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 10;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub upstream_base: Url,
    pub upstream_timeout: Duration,
    pub connect_timeout: Duration,
}

impl Config {
    /// read the config from the process environment, loading `.env` first.
    ///
    /// # Errors
    ///
    /// if a variable is set but does not parse
    pub fn from_env() -> anyhow::Result<Self> {
        if let Err(err) = dotenvy::dotenv() {
            eprintln!("could not load .env: {err}");
        }

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// same as [`Config::from_env`], reading values through `lookup`.
    ///
    /// # Errors
    ///
    /// if a variable is set but does not parse
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let port = parse_or(&lookup, "PORT", DEFAULT_PORT)?;
        let upstream_base = match lookup("ANIME_API_URL") {
            Some(url) => Url::parse(&url).context("ANIME_API_URL is not a valid url")?,
            None => Url::parse(DEFAULT_UPSTREAM).context("default upstream should be valid")?,
        };
        let upstream_timeout = parse_or(&lookup, "UPSTREAM_TIMEOUT_SECS", DEFAULT_UPSTREAM_TIMEOUT_SECS)?;
        let connect_timeout = parse_or(&lookup, "CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS)?;

        Ok(Self {
            port,
            upstream_base,
            upstream_timeout: Duration::from_secs(upstream_timeout),
            connect_timeout: Duration::from_secs(connect_timeout),
        })
    }
}

fn parse_or<T>(lookup: impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    lookup(key)
        .map(|value| value.parse().with_context(|| format!("configured {key} is invalid")))
        .transpose()
        .map(|value| value.unwrap_or(default))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.port, 5000);
        assert_eq!(config.upstream_base.as_str(), "https://animeapi.skin/");
        assert_eq!(config.upstream_timeout, Duration::from_secs(10));
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
    }

    #[test]
    fn overrides() {
        let config = Config::from_lookup(lookup(&[
            ("PORT", "8080"),
            ("ANIME_API_URL", "http://localhost:9000/api/"),
            ("UPSTREAM_TIMEOUT_SECS", "60"),
        ]))
        .unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.upstream_base.as_str(), "http://localhost:9000/api/");
        assert_eq!(config.upstream_timeout, Duration::from_secs(60));
    }

    #[test]
    fn bad_port_is_an_error() {
        let err = Config::from_lookup(lookup(&[("PORT", "eighty")])).unwrap_err();
        assert!(err.to_string().contains("PORT"));
    }
}
