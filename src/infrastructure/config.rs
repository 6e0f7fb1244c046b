use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub storage: StorageSettings,
    pub influx: Option<InfluxSettings>,
    #[serde(default)]
    pub sync: SyncSettings,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct StorageSettings {
    #[serde(default)]
    pub backend: StorageBackend,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Influx,
    Memory,
}

#[derive(Debug, Deserialize, Clone)]
pub struct InfluxSettings {
    pub host: String,
    pub token: String,
    pub database: String,
    #[serde(default = "default_retention_policy")]
    pub retention_policy: String,
    #[serde(default = "default_measurement")]
    pub measurement: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SyncSettings {
    /// First day published by the upstream feed
    #[serde(default = "default_epoch")]
    pub epoch: NaiveDate,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_ree_base_url")]
    pub ree_base_url: String,
    #[serde(default = "default_esios_base_url")]
    pub esios_base_url: String,
}

impl SyncSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            epoch: default_epoch(),
            request_timeout_secs: default_request_timeout_secs(),
            ree_base_url: default_ree_base_url(),
            esios_base_url: default_esios_base_url(),
        }
    }
}

fn default_retention_policy() -> String {
    "autogen".to_string()
}

fn default_measurement() -> String {
    "electricity_price".to_string()
}

fn default_epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(2021, 6, 1).unwrap_or(NaiveDate::MIN)
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_ree_base_url() -> String {
    "https://apidatos.ree.es".to_string()
}

fn default_esios_base_url() -> String {
    "https://api.esios.ree.es".to_string()
}

/// Load `config/prices.*` (optional) overlaid with `PRICES__SECTION__KEY` env vars.
pub fn load_config() -> anyhow::Result<AppConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/prices").required(false))
        .add_source(
            config::Environment::with_prefix("PRICES")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    Ok(settings.try_deserialize()?)
}

/// Replace template variables in a query string
pub fn prepare_query(query: &str, vars: &HashMap<String, String>) -> String {
    let mut result = query.to_string();
    for (key, value) in vars {
        let placeholder = format!("${{{}}}", key);
        result = result.replace(&placeholder, value);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml: &str) -> AppConfig {
        config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn test_prepare_query() {
        let mut vars = HashMap::new();
        vars.insert("measurement".to_string(), "electricity_price".to_string());
        vars.insert("start".to_string(), "2024-01-01T00:00:00Z".to_string());

        let query = "SELECT price FROM \"${measurement}\" WHERE time >= '${start}'";
        let result = prepare_query(query, &vars);

        assert_eq!(
            result,
            "SELECT price FROM \"electricity_price\" WHERE time >= '2024-01-01T00:00:00Z'"
        );
    }

    #[test]
    fn test_defaults() {
        let config = parse("");
        assert_eq!(config.storage.backend, StorageBackend::Influx);
        assert!(config.influx.is_none());
        assert_eq!(config.sync.epoch, NaiveDate::from_ymd_opt(2021, 6, 1).unwrap());
        assert_eq!(config.sync.request_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_full_config() {
        let config = parse(
            r#"
            [storage]
            backend = "memory"

            [influx]
            host = "http://localhost:8086"
            token = "secret"
            database = "prices"

            [sync]
            epoch = "2014-04-01"
            request_timeout_secs = 10
            "#,
        );

        assert_eq!(config.storage.backend, StorageBackend::Memory);
        let influx = config.influx.unwrap();
        assert_eq!(influx.retention_policy, "autogen");
        assert_eq!(influx.measurement, "electricity_price");
        assert_eq!(config.sync.epoch, NaiveDate::from_ymd_opt(2014, 4, 1).unwrap());
        assert_eq!(config.sync.request_timeout_secs, 10);
        assert_eq!(config.sync.esios_base_url, "https://api.esios.ree.es");
    }
}
