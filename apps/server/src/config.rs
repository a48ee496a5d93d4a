use std::{net::SocketAddr, str::FromStr, time::Duration};

use anyhow::{anyhow, Context};
use ledgerkeep_core::settings::LedgerSettings;
use rust_decimal::Decimal;

/// Output format of the tracing subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(anyhow!("expected 'text' or 'json', got '{}'", other)),
        }
    }
}

pub struct Config {
    pub listen_addr: SocketAddr,
    pub db_path: String,
    pub cors_allow: Vec<String>,
    pub request_timeout: Duration,
    pub log_format: LogFormat,
    pub ledger: LedgerSettings,
}

impl Config {
    /// Reads `LK_*` variables, loading a `.env` file first when present.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let listen_addr: SocketAddr = parse_or(&lookup, "LK_LISTEN_ADDR", "0.0.0.0:8080")?;
        let db_path = lookup("LK_DB_PATH").unwrap_or_else(|| "./db/ledgerkeep.db".into());
        let cors_allow = lookup("LK_CORS_ALLOW_ORIGINS")
            .unwrap_or_else(|| "*".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        let timeout_ms: u64 = parse_or(&lookup, "LK_REQUEST_TIMEOUT_MS", "30000")?;
        let log_format: LogFormat = parse_or(&lookup, "LK_LOG_FORMAT", "text")?;

        let mut ledger = LedgerSettings::default();
        if let Some(tolerance) = parse_opt::<Decimal, _>(&lookup, "LK_DECIMAL_TOLERANCE")? {
            ledger.balance_tolerance = tolerance;
        }
        if let Some(rows) = parse_opt::<usize, _>(&lookup, "LK_PREVIEW_ROWS")? {
            ledger.preview_rows = rows;
        }
        if let Some(rows) = parse_opt::<usize, _>(&lookup, "LK_MAX_IMPORT_ROWS")? {
            ledger.max_import_rows = rows;
        }
        ledger
            .validate()
            .map_err(|e| anyhow!("Invalid ledger settings: {}", e))?;

        Ok(Self {
            listen_addr,
            db_path,
            cors_allow,
            request_timeout: Duration::from_millis(timeout_ms),
            log_format,
            ledger,
        })
    }
}

fn parse_or<T, F>(lookup: &F, key: &str, default: &str) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key).unwrap_or_else(|| default.to_string());
    raw.trim()
        .parse()
        .map_err(|e| anyhow!("{}", e))
        .with_context(|| format!("Invalid {}: '{}'", key, raw))
}

fn parse_opt<T, F>(lookup: &F, key: &str) -> anyhow::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| anyhow!("{}", e))
            .with_context(|| format!("Invalid {}: '{}'", key, raw)),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> anyhow::Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.listen_addr.to_string(), "0.0.0.0:8080");
        assert_eq!(config.db_path, "./db/ledgerkeep.db");
        assert_eq!(config.cors_allow, vec!["*".to_string()]);
        assert_eq!(config.request_timeout, Duration::from_millis(30000));
        assert_eq!(config.log_format, LogFormat::Text);
        assert_eq!(config.ledger, LedgerSettings::default());
    }

    #[test]
    fn test_ledger_overrides() {
        let config = config_from(&[
            ("LK_DECIMAL_TOLERANCE", "0.005"),
            ("LK_PREVIEW_ROWS", "3"),
            ("LK_MAX_IMPORT_ROWS", "100"),
            ("LK_LOG_FORMAT", "JSON"),
            ("LK_CORS_ALLOW_ORIGINS", "http://a.test, http://b.test,"),
        ])
        .unwrap();
        assert_eq!(config.ledger.balance_tolerance, Decimal::new(5, 3));
        assert_eq!(config.ledger.preview_rows, 3);
        assert_eq!(config.ledger.max_import_rows, 100);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.cors_allow, vec!["http://a.test", "http://b.test"]);
    }

    #[test]
    fn test_invalid_values_fail_with_the_variable_name() {
        let err = config_from(&[("LK_REQUEST_TIMEOUT_MS", "soon")])
            .err()
            .unwrap();
        assert!(err.to_string().contains("LK_REQUEST_TIMEOUT_MS"));

        let err = config_from(&[("LK_PREVIEW_ROWS", "0")]).err().unwrap();
        assert!(err.to_string().contains("Preview row count"));

        assert!(config_from(&[("LK_LISTEN_ADDR", "nowhere")]).is_err());
        assert!(config_from(&[("LK_DECIMAL_TOLERANCE", "-0.01")]).is_err());
    }
}
