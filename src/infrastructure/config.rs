use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerSettings,
    pub aggregation: AggregationSettings,
    pub feed: FeedSettings,
    pub fleet: FleetSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub bind: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AggregationSettings {
    pub bucket_width_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FeedSettings {
    pub url: String,
    pub reconnect_delay_ms: u64,
}

impl FeedSettings {
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct FleetSettings {
    pub command_buffer: usize,
    pub event_buffer: usize,
}

fn builder() -> anyhow::Result<config::ConfigBuilder<config::builder::DefaultState>> {
    Ok(config::Config::builder()
        .set_default("server.bind", "0.0.0.0:8080")?
        .set_default("aggregation.bucket_width_ms", 5_000)?
        .set_default("feed.url", "http://127.0.0.1:8081/stream")?
        .set_default("feed.reconnect_delay_ms", 1_000)?
        .set_default("fleet.command_buffer", 1_024)?
        .set_default("fleet.event_buffer", 256)?)
}

fn finish(settings: config::Config) -> anyhow::Result<AppConfig> {
    let config: AppConfig = settings.try_deserialize()?;
    if config.aggregation.bucket_width_ms == 0 {
        anyhow::bail!("aggregation.bucket_width_ms must be greater than zero");
    }
    Ok(config)
}

/// Defaults, then `config/fleet.toml` if present, then `FLEET__*` variables.
pub fn load_app_config() -> anyhow::Result<AppConfig> {
    let settings = builder()?
        .add_source(config::File::with_name("config/fleet").required(false))
        .add_source(config::Environment::with_prefix("FLEET").separator("__"))
        .build()?;

    finish(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::{File, FileFormat};

    fn from_toml(toml: &str) -> anyhow::Result<AppConfig> {
        let settings = builder()?
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?;
        finish(settings)
    }

    #[test]
    fn test_defaults() {
        let config = from_toml("").unwrap();

        assert_eq!(config.server.bind, "0.0.0.0:8080");
        assert_eq!(config.aggregation.bucket_width_ms, 5_000);
        assert_eq!(config.feed.reconnect_delay(), Duration::from_secs(1));
        assert_eq!(config.fleet.command_buffer, 1_024);
    }

    #[test]
    fn test_file_overrides_defaults() {
        let config = from_toml(
            r#"
            [aggregation]
            bucket_width_ms = 10000

            [feed]
            url = "http://producer:9000/samples"
            "#,
        )
        .unwrap();

        assert_eq!(config.aggregation.bucket_width_ms, 10_000);
        assert_eq!(config.feed.url, "http://producer:9000/samples");
        assert_eq!(config.feed.reconnect_delay_ms, 1_000);
    }

    #[test]
    fn test_zero_bucket_width_is_rejected() {
        let err = from_toml("[aggregation]\nbucket_width_ms = 0").unwrap_err();
        assert!(err.to_string().contains("bucket_width_ms"));
    }
}
