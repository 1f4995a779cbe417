use serde::Deserialize;
use std::{
    env, fs,
    net::{SocketAddr, ToSocketAddrs},
    time::Duration,
};

use crate::{duration, models::MetricDefinition, DwhExportError, Result};

pub const CONFIG_PATH_ENV: &str = "DWH_EXPORTER_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config/dwh-exporter.toml";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub listen_addr: SocketAddr,
    /// Token callers must present on `/dwh`, compared case-insensitively.
    pub token: String,
    /// Derive the database of queries without an explicit one from their FROM clause.
    pub derive_database_from_query: bool,
    pub influx: InfluxConfig,
    pub metrics: Vec<MetricDefinition>,
}

#[derive(Debug, Clone)]
pub struct InfluxConfig {
    pub url: String,
    pub token: String,
    pub timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default)]
    token: String,
    #[serde(default)]
    derive_database_from_query: bool,
    #[serde(default)]
    server: RawServer,
    #[serde(default)]
    influx: RawInflux,
    metrics: Option<Vec<MetricDefinition>>,
}

#[derive(Debug, Deserialize)]
struct RawServer {
    #[serde(default = "default_listen_addr")]
    listen_addr: String,
}

impl Default for RawServer {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawInflux {
    #[serde(default = "default_influx_url")]
    url: String,
    #[serde(default)]
    token: String,
    #[serde(default = "default_timeout")]
    timeout: String,
}

impl Default for RawInflux {
    fn default() -> Self {
        Self {
            url: default_influx_url(),
            token: String::new(),
            timeout: default_timeout(),
        }
    }
}

fn default_listen_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_influx_url() -> String {
    "http://localhost:8086".to_string()
}

fn default_timeout() -> String {
    "30s".to_string()
}

impl AppConfig {
    /// Loads the file named by `DWH_EXPORTER_CONFIG` and applies environment overrides.
    pub fn load() -> Result<Self> {
        let path = env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let contents = fs::read_to_string(&path)
            .map_err(|e| DwhExportError::Config(format!("failed to read {}: {}", path, e)))?;

        Self::parse(&contents, |key| env::var(key).ok())
    }

    /// Parses a TOML document. `lookup_env` supplies the `DWH_TOKEN`, `INFLUX_URL`,
    /// `INFLUX_TOKEN` and `PORT` overrides.
    pub fn parse<F>(contents: &str, lookup_env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut raw: RawConfig = toml::from_str(contents)?;

        if let Some(token) = lookup_env("DWH_TOKEN") {
            raw.token = token;
        }
        if let Some(url) = lookup_env("INFLUX_URL") {
            raw.influx.url = url;
        }
        if let Some(token) = lookup_env("INFLUX_TOKEN") {
            raw.influx.token = token;
        }

        let mut listen_addr = resolve_addr(&raw.server.listen_addr)?;
        if let Some(port) = lookup_env("PORT") {
            let port = port
                .trim()
                .parse::<u16>()
                .map_err(|_| DwhExportError::Config(format!("invalid PORT value '{}'", port)))?;
            listen_addr.set_port(port);
        }

        let metrics = raw
            .metrics
            .ok_or_else(|| DwhExportError::Config("'metrics' must be configured".to_string()))?;
        validate_metrics(&metrics)?;

        if raw.influx.url.trim().is_empty() {
            return Err(DwhExportError::Config("'influx.url' must not be blank".to_string()));
        }
        let timeout_millis = duration::parse_millis(&raw.influx.timeout)
            .map_err(|e| DwhExportError::Config(format!("influx.timeout: {}", e)))?;

        Ok(Self {
            listen_addr,
            token: raw.token,
            derive_database_from_query: raw.derive_database_from_query,
            influx: InfluxConfig {
                url: raw.influx.url,
                token: raw.influx.token,
                timeout: Duration::from_millis(timeout_millis.max(1) as u64),
            },
            metrics,
        })
    }
}

fn validate_metrics(metrics: &[MetricDefinition]) -> Result<()> {
    for (idx, metric) in metrics.iter().enumerate() {
        if metric.name.trim().is_empty() {
            return Err(DwhExportError::Config(format!("metrics[{}].name must not be blank", idx)));
        }
        if metric.query.trim().is_empty() {
            return Err(DwhExportError::Config(format!(
                "metrics[{}].query must not be blank ({})",
                idx, metric.name
            )));
        }
    }
    Ok(())
}

fn resolve_addr(addr: &str) -> Result<SocketAddr> {
    addr.to_socket_addrs()
        .map_err(|e| DwhExportError::Config(format!("invalid listen address '{}': {}", addr, e)))?
        .next()
        .ok_or_else(|| DwhExportError::Config(format!("listen address '{}' resolved to nothing", addr)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    const SAMPLE: &str = r#"
token = "Secret"
derive_database_from_query = true

[server]
listen_addr = "127.0.0.1:9090"

[influx]
url = "http://influx:8086"
token = "influx-token"
timeout = "10s"

[[metrics]]
name = "service.${service}.cpu"
database = "inspectit"
query = 'SELECT mean("value") FROM "inspectit"."autogen"."cpu" WHERE ${timeFilter} GROUP BY time(${interval}), "service"'

[[metrics]]
name = "jvm.heap"
query = 'SELECT max("used") FROM "telegraf"."autogen"."jvm" WHERE ${timeFilter} GROUP BY time(${interval})'
"#;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_parse_full_config() {
        let config = AppConfig::parse(SAMPLE, no_env).unwrap();

        assert_eq!(config.listen_addr, "127.0.0.1:9090".parse::<SocketAddr>().unwrap());
        assert_eq!(config.token, "Secret");
        assert!(config.derive_database_from_query);
        assert_eq!(config.influx.url, "http://influx:8086");
        assert_eq!(config.influx.token, "influx-token");
        assert_eq!(config.influx.timeout, Duration::from_secs(10));
        assert_eq!(config.metrics.len(), 2);
        assert_eq!(config.metrics[0].database, "inspectit");
        assert_eq!(config.metrics[1].database, "");
        assert_eq!(config.metrics[1].name, "jvm.heap");
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::parse(
            r#"
[[metrics]]
name = "a"
query = "SELECT 1"
"#,
            no_env,
        )
        .unwrap();

        assert_eq!(config.token, "");
        assert!(!config.derive_database_from_query);
        assert_eq!(config.listen_addr.port(), 8080);
        assert_eq!(config.influx.url, "http://localhost:8086");
        assert_eq!(config.influx.timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("DWH_TOKEN", "from-env"),
            ("INFLUX_URL", "http://other:8086"),
            ("INFLUX_TOKEN", "t"),
            ("PORT", "7070"),
        ]);
        let config = AppConfig::parse(SAMPLE, |key| env.get(key).map(|v| v.to_string())).unwrap();

        assert_eq!(config.token, "from-env");
        assert_eq!(config.influx.url, "http://other:8086");
        assert_eq!(config.influx.token, "t");
        assert_eq!(config.listen_addr, "127.0.0.1:7070".parse::<SocketAddr>().unwrap());
    }

    #[test]
    fn test_metrics_are_required() {
        assert!(matches!(
            AppConfig::parse("token = \"x\"", no_env),
            Err(DwhExportError::Config(_))
        ));
    }

    #[test]
    fn test_blank_name_or_query_rejected() {
        let blank_name = "[[metrics]]\nname = \" \"\nquery = \"SELECT 1\"\n";
        let blank_query = "[[metrics]]\nname = \"a\"\nquery = \"\"\n";
        assert!(matches!(AppConfig::parse(blank_name, no_env), Err(DwhExportError::Config(_))));
        assert!(matches!(AppConfig::parse(blank_query, no_env), Err(DwhExportError::Config(_))));
    }

    #[test]
    fn test_invalid_toml() {
        assert!(matches!(
            AppConfig::parse("metrics = [", no_env),
            Err(DwhExportError::Config(_))
        ));
    }
}
