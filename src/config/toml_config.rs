use crate::utils::error::{GatewayError, Result};
use crate::utils::validation::{
    validate_non_empty_string, validate_path, validate_range, validate_required_field,
    validate_url, Validate,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_TIMEOUT_SECONDS: u64 = 30;
const DEFAULT_ORIGIN_COUNTRY: &str = "ID";
const DEFAULT_DATA_DIR: &str = "./data";
const DEFAULT_REFRESH_WINDOW_MINUTES: i64 = 120;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    pub provider: ProviderConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub tracking: TrackingConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout_seconds: Option<u64>,
    pub origin_country: Option<String>,
}

impl ProviderConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECONDS))
    }

    pub fn origin_country(&self) -> &str {
        self.origin_country
            .as_deref()
            .unwrap_or(DEFAULT_ORIGIN_COUNTRY)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    #[default]
    Memory,
    Redis,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default)]
    pub backend: CacheBackend,
    pub redis_url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    pub data_dir: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrackingConfig {
    pub refresh_window_minutes: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogConfig {
    pub level: Option<String>,
    pub json: Option<bool>,
}

impl GatewayConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(GatewayError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| GatewayError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${BITESHIP_API_KEY})，未設定的變數保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| GatewayError::ConfigError {
            message: format!("invalid env substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn data_dir(&self) -> PathBuf {
        PathBuf::from(
            self.store
                .data_dir
                .as_deref()
                .unwrap_or(DEFAULT_DATA_DIR),
        )
    }

    pub fn refresh_window(&self) -> chrono::Duration {
        chrono::Duration::minutes(
            self.tracking
                .refresh_window_minutes
                .unwrap_or(DEFAULT_REFRESH_WINDOW_MINUTES),
        )
    }

    pub fn log_level(&self) -> &str {
        self.log.level.as_deref().unwrap_or("info")
    }

    pub fn json_logs(&self) -> bool {
        self.log.json.unwrap_or(false)
    }
}

impl Validate for GatewayConfig {
    fn validate(&self) -> Result<()> {
        validate_url("provider.base_url", &self.provider.base_url)?;
        if !self.provider.base_url.starts_with("http") {
            return Err(GatewayError::InvalidConfigValueError {
                field: "provider.base_url".to_string(),
                value: self.provider.base_url.clone(),
                reason: "Provider URL must be http or https".to_string(),
            });
        }

        // 未替換的 ${VAR} 代表環境變數沒有設定
        validate_non_empty_string("provider.api_key", &self.provider.api_key)?;
        if self.provider.api_key.starts_with("${") {
            return Err(GatewayError::MissingConfigError {
                field: format!("provider.api_key ({})", self.provider.api_key),
            });
        }

        if let Some(timeout) = self.provider.timeout_seconds {
            validate_range("provider.timeout_seconds", timeout, 1, 300)?;
        }
        if let Some(country) = &self.provider.origin_country {
            validate_non_empty_string("provider.origin_country", country)?;
        }

        if let Some(dir) = &self.store.data_dir {
            validate_path("store.data_dir", dir)?;
        }

        if let Some(minutes) = self.tracking.refresh_window_minutes {
            validate_range("tracking.refresh_window_minutes", minutes, 1, 7 * 24 * 60)?;
        }

        if self.cache.backend == CacheBackend::Redis {
            let redis_url = validate_required_field("cache.redis_url", &self.cache.redis_url)?;
            validate_url("cache.redis_url", redis_url)?;
        }

        Ok(())
    }
}
