use crate::adapters::{MemoryCache, SqliteStore};
use crate::config::{CacheBackend, GatewayConfig};
use crate::core::area::AreaResolver;
use crate::core::context::RequestContext;
use crate::core::rate_quote::ShippingService;
use crate::core::tracking::TrackingResolver;
use crate::domain::model::{ApiResponse, CourierRateRequest, CourierRateResponse, ShipmentTracking};
use crate::domain::ports::{AreaStore, Cache, ShippingProvider, TrackingStore};
use crate::provider::BiteshipClient;
use crate::utils::error::{GatewayError, Result};
use crate::utils::validation::Validate;
use std::sync::Arc;

/// The assembled gateway: both resolvers and the rate orchestrator sharing
/// one cache, one store and one provider client.
pub struct Gateway {
    areas: Arc<AreaResolver>,
    tracking: TrackingResolver,
    shipping: ShippingService,
}

impl Gateway {
    pub fn new(
        cache: Arc<dyn Cache>,
        area_store: Arc<dyn AreaStore>,
        tracking_store: Arc<dyn TrackingStore>,
        provider: Arc<dyn ShippingProvider>,
        refresh_window: chrono::Duration,
    ) -> Self {
        let areas = Arc::new(AreaResolver::new(
            cache.clone(),
            area_store,
            provider.clone(),
        ));
        let tracking = TrackingResolver::new(cache, tracking_store, provider.clone(), refresh_window);
        let shipping = ShippingService::new(areas.clone(), provider);

        Self {
            areas,
            tracking,
            shipping,
        }
    }

    /// Builds every tier from configuration.
    pub async fn bootstrap(config: &GatewayConfig) -> Result<Self> {
        config.validate()?;

        let provider: Arc<dyn ShippingProvider> = Arc::new(BiteshipClient::new(&config.provider)?);
        let cache = build_cache(config).await?;

        let data_dir = config.data_dir();
        let store = Arc::new(SqliteStore::open(&data_dir).await?);

        tracing::info!(
            "✅ Gateway ready (cache: {:?}, store: {}, refresh window: {} min)",
            config.cache.backend,
            data_dir.display(),
            config.refresh_window().num_minutes()
        );

        Ok(Self::new(
            cache,
            store.clone(),
            store,
            provider,
            config.refresh_window(),
        ))
    }

    pub fn areas(&self) -> &AreaResolver {
        &self.areas
    }

    pub fn tracking(&self) -> &TrackingResolver {
        &self.tracking
    }

    pub fn shipping(&self) -> &ShippingService {
        &self.shipping
    }

    pub async fn courier_rates(
        &self,
        ctx: &RequestContext,
        request: &CourierRateRequest,
    ) -> ApiResponse<CourierRateResponse> {
        let (outcome, data) = self.shipping.quote(ctx, request).await;
        ApiResponse::from_service(&outcome, data)
    }

    pub async fn track(
        &self,
        ctx: &RequestContext,
        waybill: &str,
        courier: &str,
    ) -> ApiResponse<ShipmentTracking> {
        let (outcome, data) = self.tracking.track(ctx, waybill, courier).await;
        ApiResponse::from_service(&outcome, data)
    }
}

async fn build_cache(config: &GatewayConfig) -> Result<Arc<dyn Cache>> {
    match config.cache.backend {
        CacheBackend::Memory => Ok(Arc::new(MemoryCache::new())),
        CacheBackend::Redis => connect_redis(config).await,
    }
}

#[cfg(feature = "redis")]
async fn connect_redis(config: &GatewayConfig) -> Result<Arc<dyn Cache>> {
    let redis_url = config
        .cache
        .redis_url
        .as_deref()
        .ok_or_else(|| GatewayError::MissingConfigError {
            field: "cache.redis_url".to_string(),
        })?;
    let cache = crate::adapters::RedisCache::connect(redis_url)
        .await
        .map_err(|e| GatewayError::ConfigError {
            message: format!("failed to connect to redis: {}", e),
        })?;
    Ok(Arc::new(cache))
}

#[cfg(not(feature = "redis"))]
async fn connect_redis(_config: &GatewayConfig) -> Result<Arc<dyn Cache>> {
    Err(GatewayError::ConfigError {
        message: "cache backend \"redis\" requires the `redis` feature".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config(data_dir: &str, backend: &str) -> GatewayConfig {
        GatewayConfig::from_toml_str(&format!(
            r#"
[provider]
base_url = "http://127.0.0.1:9"
api_key = "test-key"
timeout_seconds = 1

[cache]
backend = "{}"
redis_url = "redis://127.0.0.1:1"

[store]
data_dir = "{}"
"#,
            backend, data_dir
        ))
        .unwrap()
    }

    #[tokio::test]
    async fn test_bootstrap_creates_store_dir() {
        let temp_dir = TempDir::new().unwrap();
        let data_dir = temp_dir.path().join("store");
        let cfg = config(&data_dir.to_string_lossy(), "memory");

        let gateway = Gateway::bootstrap(&cfg).await.unwrap();
        assert!(data_dir.exists());

        let resp = gateway.track(&RequestContext::new(), "", "jne").await;
        assert_eq!(resp.status, "failed");
        assert_eq!(resp.code, 400);
    }

    #[cfg(not(feature = "redis"))]
    #[tokio::test]
    async fn test_redis_backend_without_feature_is_config_error() {
        let temp_dir = TempDir::new().unwrap();
        let cfg = config(&temp_dir.path().to_string_lossy(), "redis");
        let err = Gateway::bootstrap(&cfg).await.err().unwrap();
        assert!(matches!(err, GatewayError::ConfigError { .. }));
    }
}
