use crate::core::cascade::{Cascade, Resolution, ResolutionPolicy, StoreVerdict};
use crate::core::context::RequestContext;
use crate::core::staleness::{remaining_freshness, TrackingState};
use crate::domain::convert;
use crate::domain::model::{ServiceResponse, ShipmentTracking};
use crate::domain::ports::{Cache, ShippingProvider, TrackingStore, NO_EXPIRY};
use crate::utils::error::{GatewayError, Result, StoreError, StoreResult};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Default time a non-terminal snapshot stays fresh.
pub const DEFAULT_REFRESH_WINDOW_MINUTES: i64 = 120;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackingKey {
    pub waybill: String,
    pub courier: String,
}

impl TrackingKey {
    pub fn new(waybill: impl Into<String>, courier: impl Into<String>) -> Self {
        Self {
            waybill: waybill.into().trim().to_string(),
            courier: courier.into().trim().to_string(),
        }
    }

    pub fn cache_key(&self) -> String {
        format!("tracking::{}::{}", self.waybill, self.courier)
    }
}

pub struct TrackingPolicy {
    store: Arc<dyn TrackingStore>,
    provider: Arc<dyn ShippingProvider>,
    refresh_window: chrono::Duration,
}

impl TrackingPolicy {
    fn state(&self, ctx: &RequestContext, snapshot: &ShipmentTracking) -> TrackingState {
        TrackingState::of(Some(snapshot), ctx.now(), self.refresh_window)
    }
}

#[async_trait]
impl ResolutionPolicy for TrackingPolicy {
    type Key = TrackingKey;
    type Entity = ShipmentTracking;

    fn kind(&self) -> &'static str {
        "tracking"
    }

    fn validate(&self, key: &TrackingKey) -> Result<()> {
        let missing = match (key.waybill.is_empty(), key.courier.is_empty()) {
            (true, _) => "waybill",
            (false, true) => "courier",
            (false, false) => return Ok(()),
        };
        Err(GatewayError::client_input(
            missing,
            "Waybill and Courier are required",
        ))
    }

    fn cache_key(&self, key: &TrackingKey) -> Option<String> {
        Some(key.cache_key())
    }

    /// Terminal snapshots never expire; others only live until they would
    /// turn stale anyway.
    fn cache_ttl(&self, ctx: &RequestContext, snapshot: &ShipmentTracking) -> Duration {
        if snapshot.is_terminal() {
            return NO_EXPIRY;
        }
        let left = remaining_freshness(snapshot, ctx.now(), self.refresh_window)
            .to_std()
            .unwrap_or_default();
        left.max(Duration::from_secs(1))
    }

    fn usable_from_cache(&self, ctx: &RequestContext, snapshot: &ShipmentTracking) -> bool {
        !self.state(ctx, snapshot).needs_refresh()
    }

    async fn find_stored(
        &self,
        _ctx: &RequestContext,
        key: &TrackingKey,
    ) -> StoreResult<Option<ShipmentTracking>> {
        let Some(log) = self
            .store
            .find_by_waybill_and_courier(&key.waybill, &key.courier)
            .await?
        else {
            return Ok(None);
        };
        Ok(Some(convert::tracking_from_log(&log).map_err(|e| {
            StoreError::Query(diesel::result::Error::SerializationError(Box::new(e)))
        })?))
    }

    fn judge_stored(&self, ctx: &RequestContext, snapshot: &ShipmentTracking) -> StoreVerdict {
        match self.state(ctx, snapshot) {
            TrackingState::Fresh | TrackingState::Terminal => StoreVerdict::Serve,
            TrackingState::Stale => StoreVerdict::Fallback,
            TrackingState::Unknown => StoreVerdict::Skip,
        }
    }

    fn fetchable(&self, _key: &TrackingKey) -> Result<()> {
        Ok(())
    }

    async fn fetch(&self, ctx: &RequestContext, key: &TrackingKey) -> Result<ShipmentTracking> {
        let resp = self
            .provider
            .track_waybill(ctx, &key.waybill, &key.courier)
            .await?;
        Ok(convert::tracking_from_provider(
            &resp,
            &key.waybill,
            &key.courier,
            ctx.now(),
        ))
    }

    async fn persist(
        &self,
        ctx: &RequestContext,
        _key: &TrackingKey,
        snapshot: &ShipmentTracking,
    ) -> Result<ShipmentTracking> {
        let log = convert::tracking_to_log(snapshot, ctx.now())?;
        let saved = self.store.create_or_update(log).await?;
        Ok(convert::tracking_from_log(&saved)?)
    }
}

/// Tracking lookups with a bounded refresh rate toward the provider.
pub struct TrackingResolver {
    cascade: Cascade<TrackingPolicy>,
}

impl TrackingResolver {
    pub fn new(
        cache: Arc<dyn Cache>,
        store: Arc<dyn TrackingStore>,
        provider: Arc<dyn ShippingProvider>,
        refresh_window: chrono::Duration,
    ) -> Self {
        Self {
            cascade: Cascade::new(
                TrackingPolicy {
                    store,
                    provider,
                    refresh_window,
                },
                cache,
            ),
        }
    }

    pub async fn resolve(
        &self,
        ctx: &RequestContext,
        waybill: &str,
        courier: &str,
    ) -> Result<Resolution<ShipmentTracking>> {
        tracing::info!(
            trace_id = %ctx.trace_id(),
            "Tracking waybill: {}, courier: {}",
            waybill,
            courier
        );
        self.cascade
            .resolve(ctx, &TrackingKey::new(waybill, courier))
            .await
    }

    /// Caller-facing entry point: never fails, folds errors into the
    /// returned status.
    pub async fn track(
        &self,
        ctx: &RequestContext,
        waybill: &str,
        courier: &str,
    ) -> (ServiceResponse, Option<ShipmentTracking>) {
        match self.resolve(ctx, waybill, courier).await {
            Ok(res) => {
                tracing::info!(
                    trace_id = %ctx.trace_id(),
                    "✅ Tracking {} via {} answered from {:?}",
                    waybill,
                    courier,
                    res.tier
                );
                (ServiceResponse::success(), Some(res.entity))
            }
            Err(e) => {
                tracing::warn!(trace_id = %ctx.trace_id(), "❌ Tracking failed: {}", e);
                (ServiceResponse::from(&e), None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite_store::SqliteStore;
    use crate::adapters::memory_cache::MemoryCache;
    use crate::core::cascade::Tier;
    use crate::provider::model::{
        AreaSearchResponse, RateRequest, RateResponse, TrackingHistoryItem, TrackingResponse,
    };
    use crate::provider::{codes, ProviderError};
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Mutex;

    struct ScriptedProvider {
        status: Mutex<Option<String>>,
        calls: AtomicUsize,
    }

    impl ScriptedProvider {
        fn new(status: Option<&str>) -> Self {
            Self {
                status: Mutex::new(status.map(str::to_string)),
                calls: AtomicUsize::new(0),
            }
        }

        async fn set(&self, status: Option<&str>) {
            *self.status.lock().await = status.map(str::to_string);
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ShippingProvider for ScriptedProvider {
        fn source(&self) -> &str {
            "scripted"
        }

        async fn search_areas(
            &self,
            _ctx: &RequestContext,
            _query: &str,
        ) -> std::result::Result<AreaSearchResponse, ProviderError> {
            Ok(AreaSearchResponse::default())
        }

        async fn courier_rates(
            &self,
            _ctx: &RequestContext,
            _request: &RateRequest,
        ) -> std::result::Result<RateResponse, ProviderError> {
            Ok(RateResponse::default())
        }

        async fn track_waybill(
            &self,
            _ctx: &RequestContext,
            _waybill: &str,
            _courier: &str,
        ) -> std::result::Result<TrackingResponse, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.status.lock().await.clone() {
                Some(status) => Ok(TrackingResponse {
                    success: true,
                    status: status.clone(),
                    history: vec![TrackingHistoryItem {
                        note: "scan".to_string(),
                        updated_at: "2024-03-15T10:30:00+07:00".to_string(),
                        status,
                    }],
                    ..Default::default()
                }),
                None => Err(ProviderError::unreachable("connection reset")),
            }
        }
    }

    fn resolver(provider: Arc<ScriptedProvider>) -> TrackingResolver {
        TrackingResolver::new(
            Arc::new(MemoryCache::new()),
            Arc::new(SqliteStore::in_memory().unwrap()),
            provider,
            chrono::Duration::minutes(DEFAULT_REFRESH_WINDOW_MINUTES),
        )
    }

    #[tokio::test]
    async fn test_missing_waybill_or_courier() {
        let provider = Arc::new(ScriptedProvider::new(Some("picked")));
        let resolver = resolver(provider.clone());

        let (outcome, data) = resolver.track(&RequestContext::new(), "", "jne").await;
        assert_eq!(outcome.status_code, 400);
        assert_eq!(outcome.message, "Waybill and Courier are required");
        assert!(data.is_none());

        let (outcome, _) = resolver.track(&RequestContext::new(), "WB1", "  ").await;
        assert_eq!(outcome.status_code, 400);
        assert_eq!(provider.calls(), 0);
    }

    #[test]
    fn test_missing_key_part_is_named() {
        let policy = TrackingPolicy {
            store: Arc::new(SqliteStore::in_memory().unwrap()),
            provider: Arc::new(ScriptedProvider::new(None)),
            refresh_window: chrono::Duration::hours(2),
        };

        let no_waybill = policy.validate(&TrackingKey::new("", "jne"));
        assert!(matches!(no_waybill, Err(GatewayError::ClientInput { ref field, .. }) if field == "waybill"));

        let no_courier = policy.validate(&TrackingKey::new("WB1", " "));
        assert!(matches!(no_courier, Err(GatewayError::ClientInput { ref field, .. }) if field == "courier"));

        assert!(policy.validate(&TrackingKey::new("WB1", "jne")).is_ok());
    }

    #[tokio::test]
    async fn test_fresh_snapshot_is_not_refetched() {
        let provider = Arc::new(ScriptedProvider::new(Some("picked")));
        let resolver = resolver(provider.clone());
        let t0 = Utc::now();

        let first = resolver
            .resolve(&RequestContext::new().at(t0), "WB1", "jne")
            .await
            .unwrap();
        assert_eq!(first.tier, Tier::Provider);
        assert_eq!(first.entity.last_tracked_at, t0);

        let later = RequestContext::new().at(t0 + chrono::Duration::minutes(119));
        let second = resolver.resolve(&later, "WB1", "jne").await.unwrap();
        assert_eq!(second.tier, Tier::Cache);
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_stale_snapshot_is_refetched() {
        let provider = Arc::new(ScriptedProvider::new(Some("picked")));
        let resolver = resolver(provider.clone());
        let t0 = Utc::now();

        resolver
            .resolve(&RequestContext::new().at(t0), "WB1", "jne")
            .await
            .unwrap();
        provider.set(Some("inTransit")).await;

        let later = RequestContext::new().at(t0 + chrono::Duration::minutes(121));
        let res = resolver.resolve(&later, "WB1", "jne").await.unwrap();
        assert_eq!(res.tier, Tier::Provider);
        assert_eq!(res.entity.status, "inTransit");
        assert_eq!(res.entity.last_tracked_at, later.now());
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn test_stale_snapshot_served_when_provider_down() {
        let provider = Arc::new(ScriptedProvider::new(Some("picked")));
        let resolver = resolver(provider.clone());
        let t0 = Utc::now();

        resolver
            .resolve(&RequestContext::new().at(t0), "WB1", "jne")
            .await
            .unwrap();
        provider.set(None).await;

        let later = RequestContext::new().at(t0 + chrono::Duration::hours(3));
        let res = resolver.resolve(&later, "WB1", "jne").await.unwrap();
        assert_eq!(res.tier, Tier::StaleStore);
        assert_eq!(res.entity.status, "picked");
    }

    #[tokio::test]
    async fn test_terminal_snapshot_is_never_refetched() {
        let provider = Arc::new(ScriptedProvider::new(Some("delivered")));
        let resolver = resolver(provider.clone());
        let t0 = Utc::now();

        resolver
            .resolve(&RequestContext::new().at(t0), "WB9", "sicepat")
            .await
            .unwrap();

        let much_later = RequestContext::new().at(t0 + chrono::Duration::days(30));
        let (outcome, data) = resolver.track(&much_later, "WB9", "sicepat").await;
        assert!(outcome.is_success());
        assert_eq!(data.unwrap().status, "delivered");
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_provider_failure_without_history_maps_status() {
        let provider = Arc::new(ScriptedProvider::new(None));
        let resolver = resolver(provider);

        let (outcome, data) = resolver.track(&RequestContext::new(), "WB1", "jne").await;
        assert_eq!(outcome.status_code, 503);
        assert_eq!(outcome.message, codes::classify(codes::ERR_PROVIDER_UNREACHABLE).message);
        assert!(data.is_none());
    }

    #[test]
    fn test_cache_ttl_tracks_remaining_freshness() {
        let policy = TrackingPolicy {
            store: Arc::new(SqliteStore::in_memory().unwrap()),
            provider: Arc::new(ScriptedProvider::new(None)),
            refresh_window: chrono::Duration::hours(2),
        };
        let now = Utc::now();
        let ctx = RequestContext::new().at(now);
        let mut snapshot = ShipmentTracking {
            courier_code: "jne".to_string(),
            waybill: "WB1".to_string(),
            tracking_url: String::new(),
            origin_info: Default::default(),
            destination_info: Default::default(),
            status: "picked".to_string(),
            history: vec![],
            last_tracked_at: now - chrono::Duration::minutes(30),
        };

        assert_eq!(policy.cache_ttl(&ctx, &snapshot), Duration::from_secs(90 * 60));

        snapshot.last_tracked_at = now - chrono::Duration::hours(4);
        assert_eq!(policy.cache_ttl(&ctx, &snapshot), Duration::from_secs(1));

        snapshot.status = "delivered".to_string();
        assert_eq!(policy.cache_ttl(&ctx, &snapshot), NO_EXPIRY);
    }
}
