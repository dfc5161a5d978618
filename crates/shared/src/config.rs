use serde::Deserialize;
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub nearby: NearbyConfig,
    pub demo: DemoConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NearbyConfig {
    /// Time-to-live for publications and subscriptions in seconds (default: 180)
    pub ttl_seconds: u64,
    /// Label shown to nearby devices
    pub device_label: String,
    /// File holding the per-install preferences
    pub preferences_path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DemoConfig {
    /// Number of simulated peers sharing the medium (default: 2)
    pub simulated_peers: usize,
    /// How long the demo keeps pumping events, in seconds (default: 5)
    pub run_seconds: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub format: LogFormat,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv::dotenv().ok();

        Ok(Config {
            nearby: NearbyConfig {
                ttl_seconds: env::var("NEARBY_TTL_SECONDS")
                    .unwrap_or_else(|_| "180".to_string())
                    .parse()?,
                device_label: env::var("NEARBY_DEVICE_LABEL")
                    .or_else(|_| env::var("HOSTNAME"))
                    .unwrap_or_else(|_| "unknown-device".to_string()),
                preferences_path: env::var("NEARBY_PREFERENCES_PATH")
                    .unwrap_or_else(|_| "./nearby-devices.prefs.json".to_string())
                    .into(),
            },
            demo: DemoConfig {
                simulated_peers: env::var("NEARBY_SIMULATED_PEERS")
                    .unwrap_or_else(|_| "2".to_string())
                    .parse()?,
                run_seconds: env::var("NEARBY_DEMO_SECONDS")
                    .unwrap_or_else(|_| "5".to_string())
                    .parse()?,
            },
            logging: LoggingConfig {
                format: parse_log_format(
                    &env::var("LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string()),
                )?,
            },
        })
    }
}

fn parse_log_format(value: &str) -> anyhow::Result<LogFormat> {
    match value.to_ascii_lowercase().as_str() {
        "pretty" => Ok(LogFormat::Pretty),
        "json" => Ok(LogFormat::Json),
        other => anyhow::bail!("Unsupported LOG_FORMAT: {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_log_format() {
        assert_eq!(parse_log_format("pretty").unwrap(), LogFormat::Pretty);
        assert_eq!(parse_log_format("JSON").unwrap(), LogFormat::Json);
        assert!(parse_log_format("xml").is_err());
    }
}
