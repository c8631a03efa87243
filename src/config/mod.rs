#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

pub use toml_config::{
    CacheBackend, CacheConfig, GatewayConfig, LogConfig, ProviderConfig, StoreConfig,
    TrackingConfig,
};
