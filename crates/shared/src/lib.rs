pub mod config;

pub use config::{Config, DemoConfig, LogFormat, LoggingConfig, NearbyConfig};
