use crate::core::cascade::{Cascade, Resolution, ResolutionPolicy, StoreVerdict};
use crate::core::context::RequestContext;
use crate::domain::convert;
use crate::domain::model::{Area, AreaKey, AreaLocator};
use crate::domain::ports::{AreaStore, Cache, ShippingProvider, NO_EXPIRY};
use crate::utils::error::{GatewayError, Result, StoreError, StoreResult};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// A parsed [`AreaLocator`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AreaLookup {
    pub key: AreaKey,
    pub query: Option<String>,
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

impl AreaLookup {
    pub fn parse(locator: &AreaLocator) -> Result<Self> {
        let subdistrict_id = match non_empty(&locator.subdistrict_id) {
            Some(raw) => Some(raw.parse::<u64>().map_err(|_| {
                GatewayError::client_input(
                    "subdistrict_id",
                    format!("invalid subdistrict ID: {}", raw),
                )
            })?),
            None => None,
        };

        Ok(Self {
            key: AreaKey {
                subdistrict_id,
                postal_code: non_empty(&locator.postal_code),
            },
            query: non_empty(&locator.query),
        })
    }

    pub fn cache_key(&self) -> String {
        if self.key.is_empty() {
            let query = self.query.as_deref().unwrap_or_default().to_lowercase();
            return format!("area::query::{}", query);
        }
        format!(
            "area::{}::{}",
            self.key
                .subdistrict_id
                .map(|id| id.to_string())
                .unwrap_or_default(),
            self.key.postal_code.as_deref().unwrap_or_default()
        )
    }
}

/// Insert-or-update by external id. A concurrent insert of the same external
/// id surfaces as [`StoreError::Conflict`] and is turned into an update.
///
/// `supplied` is the natural key the caller looked up with. Parts of it the
/// caller left out never overwrite what the stored row already has, so a
/// query-only lookup cannot detach a row from its subdistrict.
pub async fn save_or_create(
    store: &dyn AreaStore,
    mut area: Area,
    supplied: &AreaKey,
) -> StoreResult<Area> {
    if let Some(existing) = store.find_by_external_id(&area.external_id).await? {
        keep_stored_key(&existing, &mut area, supplied);
        return store.update(area).await;
    }

    match store.create(area.clone()).await {
        Err(StoreError::Conflict { .. }) => {
            let existing = store
                .find_by_external_id(&area.external_id)
                .await?
                .ok_or_else(|| StoreError::MissingRecord {
                    id: area.external_id.clone(),
                })?;
            keep_stored_key(&existing, &mut area, supplied);
            store.update(area).await
        }
        other => other,
    }
}

fn keep_stored_key(existing: &Area, area: &mut Area, supplied: &AreaKey) {
    area.id = existing.id;
    if supplied.subdistrict_id.is_none() && existing.original_subdistrict_id != 0 {
        area.original_subdistrict_id = existing.original_subdistrict_id;
    }
    if supplied.postal_code.is_none() && !existing.original_postal_code.is_empty() {
        area.original_postal_code = existing.original_postal_code.clone();
    }
}

pub struct AreaPolicy {
    store: Arc<dyn AreaStore>,
    provider: Arc<dyn ShippingProvider>,
}

#[async_trait]
impl ResolutionPolicy for AreaPolicy {
    type Key = AreaLookup;
    type Entity = Area;

    fn kind(&self) -> &'static str {
        "area"
    }

    fn validate(&self, key: &AreaLookup) -> Result<()> {
        if key.key.is_empty() && key.query.is_none() {
            return Err(GatewayError::client_input(
                "area",
                "subdistrict ID, postal code or query is required",
            ));
        }
        Ok(())
    }

    fn cache_key(&self, key: &AreaLookup) -> Option<String> {
        Some(key.cache_key())
    }

    fn cache_ttl(&self, _ctx: &RequestContext, _area: &Area) -> Duration {
        NO_EXPIRY
    }

    fn usable_from_cache(&self, _ctx: &RequestContext, area: &Area) -> bool {
        area.is_resolved()
    }

    async fn find_stored(
        &self,
        _ctx: &RequestContext,
        key: &AreaLookup,
    ) -> StoreResult<Option<Area>> {
        if key.key.is_empty() {
            return Ok(None);
        }
        self.store.find_by_natural_key(&key.key).await
    }

    fn judge_stored(&self, _ctx: &RequestContext, area: &Area) -> StoreVerdict {
        if area.is_resolved() {
            StoreVerdict::Serve
        } else {
            StoreVerdict::Skip
        }
    }

    fn fetchable(&self, key: &AreaLookup) -> Result<()> {
        match key.query {
            Some(_) => Ok(()),
            None => Err(GatewayError::client_input(
                "query",
                "area query is empty, cannot search area",
            )),
        }
    }

    async fn fetch(&self, ctx: &RequestContext, key: &AreaLookup) -> Result<Area> {
        let query = key.query.as_deref().unwrap_or_default();
        let found = self.provider.search_areas(ctx, query).await?;

        let Some(first) = found.areas.first() else {
            tracing::info!(trace_id = %ctx.trace_id(), "No area found from provider for query: {}", query);
            return Err(GatewayError::not_found(format!(
                "no area found for query: {}",
                query
            )));
        };

        Ok(convert::area_from_provider(
            first,
            &key.key,
            self.provider.source(),
        )?)
    }

    async fn persist(&self, _ctx: &RequestContext, key: &AreaLookup, area: &Area) -> Result<Area> {
        Ok(save_or_create(self.store.as_ref(), area.clone(), &key.key).await?)
    }
}

/// Resolves caller locators to provider areas.
pub struct AreaResolver {
    cascade: Cascade<AreaPolicy>,
}

impl AreaResolver {
    pub fn new(
        cache: Arc<dyn Cache>,
        store: Arc<dyn AreaStore>,
        provider: Arc<dyn ShippingProvider>,
    ) -> Self {
        Self {
            cascade: Cascade::new(AreaPolicy { store, provider }, cache),
        }
    }

    pub async fn resolve(&self, ctx: &RequestContext, locator: &AreaLocator) -> Result<Area> {
        Ok(self.resolve_traced(ctx, locator).await?.entity)
    }

    /// Like [`resolve`](Self::resolve) but also reports the answering tier.
    pub async fn resolve_traced(
        &self,
        ctx: &RequestContext,
        locator: &AreaLocator,
    ) -> Result<Resolution<Area>> {
        tracing::info!(
            trace_id = %ctx.trace_id(),
            "Finding area with subdistrictID: {}, postalCode: {}, query: {}",
            locator.subdistrict_id,
            locator.postal_code,
            locator.query
        );
        let lookup = AreaLookup::parse(locator)?;
        self.cascade.resolve(ctx, &lookup).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite_store::SqliteStore;
    use crate::adapters::memory_cache::MemoryCache;
    use crate::core::cascade::Tier;
    use crate::provider::model::{AreaSearchResponse, RateRequest, RateResponse, TrackingResponse};
    use crate::provider::{codes, model as wire, ProviderError};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubProvider {
        areas: Vec<wire::Area>,
        error: Option<ProviderError>,
        searches: AtomicUsize,
    }

    impl StubProvider {
        fn with_area(id: &str, postal_code: u32) -> Self {
            Self {
                areas: vec![wire::Area {
                    id: id.to_string(),
                    name: "Jakarta Selatan".to_string(),
                    postal_code,
                    ..Default::default()
                }],
                error: None,
                searches: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ShippingProvider for StubProvider {
        fn source(&self) -> &str {
            "stub"
        }

        async fn search_areas(
            &self,
            _ctx: &RequestContext,
            _query: &str,
        ) -> std::result::Result<AreaSearchResponse, ProviderError> {
            self.searches.fetch_add(1, Ordering::SeqCst);
            if let Some(err) = &self.error {
                return Err(err.clone());
            }
            Ok(AreaSearchResponse {
                success: true,
                areas: self.areas.clone(),
                ..Default::default()
            })
        }

        async fn courier_rates(
            &self,
            _ctx: &RequestContext,
            _request: &RateRequest,
        ) -> std::result::Result<RateResponse, ProviderError> {
            Err(ProviderError::new(codes::ERR_RATE_INVALID_PARAMETER, "unused"))
        }

        async fn track_waybill(
            &self,
            _ctx: &RequestContext,
            _waybill: &str,
            _courier: &str,
        ) -> std::result::Result<TrackingResponse, ProviderError> {
            Err(ProviderError::new(codes::ERR_RATE_INVALID_PARAMETER, "unused"))
        }
    }

    fn ctx() -> RequestContext {
        RequestContext::with_trace_id("area-test")
    }

    #[test]
    fn test_lookup_parsing_and_cache_keys() {
        let lookup = AreaLookup::parse(&AreaLocator::new("3171", " 12440 ", "")).unwrap();
        assert_eq!(lookup.key.subdistrict_id, Some(3171));
        assert_eq!(lookup.key.postal_code.as_deref(), Some("12440"));
        assert_eq!(lookup.query, None);
        assert_eq!(lookup.cache_key(), "area::3171::12440");

        let query_only = AreaLookup::parse(&AreaLocator::new("", "", "Jakarta Selatan")).unwrap();
        assert_eq!(query_only.cache_key(), "area::query::jakarta selatan");

        let err = AreaLookup::parse(&AreaLocator::new("abc", "", "")).unwrap_err();
        assert!(matches!(err, GatewayError::ClientInput { ref field, .. } if field == "subdistrict_id"));
    }

    #[tokio::test]
    async fn test_nothing_to_go_on_is_client_input() {
        let provider = Arc::new(StubProvider::with_area("IDNJAKA", 12440));
        let resolver = AreaResolver::new(
            Arc::new(MemoryCache::new()),
            Arc::new(SqliteStore::in_memory().unwrap()),
            provider.clone(),
        );

        let err = resolver
            .resolve(&ctx(), &AreaLocator::default())
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::ClientInput { .. }));
        assert_eq!(provider.searches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_store_hit_without_query_skips_provider() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        store
            .create(Area {
                original_subdistrict_id: 3171,
                original_postal_code: "12440".to_string(),
                external_id: "IDNJAKA".to_string(),
                external_source: "stub".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();
        let provider = Arc::new(StubProvider::with_area("IDNJAKA", 12440));
        let cache = Arc::new(MemoryCache::new());
        let resolver = AreaResolver::new(cache.clone(), store, provider.clone());

        let res = resolver
            .resolve_traced(&ctx(), &AreaLocator::new("3171", "12440", ""))
            .await
            .unwrap();
        assert_eq!(res.tier, Tier::Store);
        assert_eq!(res.entity.external_id, "IDNJAKA");
        assert_eq!(provider.searches.load(Ordering::SeqCst), 0);

        // the store hit was written back to the cache
        assert!(cache.get("area::3171::12440").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_unresolved_store_row_without_query_is_client_input() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        store
            .create(Area {
                original_subdistrict_id: 5,
                original_postal_code: "10110".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();
        let resolver = AreaResolver::new(
            Arc::new(MemoryCache::new()),
            store,
            Arc::new(StubProvider::with_area("IDNX", 10110)),
        );

        let err = resolver
            .resolve(&ctx(), &AreaLocator::new("5", "10110", ""))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::ClientInput { ref field, .. } if field == "query"));
    }

    #[tokio::test]
    async fn test_empty_search_result_is_not_found() {
        let provider = Arc::new(StubProvider {
            areas: vec![],
            error: None,
            searches: AtomicUsize::new(0),
        });
        let resolver = AreaResolver::new(
            Arc::new(MemoryCache::new()),
            Arc::new(SqliteStore::in_memory().unwrap()),
            provider,
        );

        let err = resolver
            .resolve(&ctx(), &AreaLocator::new("", "", "Atlantis"))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_provider_error_is_classified_and_returned() {
        let provider = Arc::new(StubProvider {
            areas: vec![],
            error: Some(ProviderError::new(codes::ERR_INVALID_AUTHENTICATION, "bad key")),
            searches: AtomicUsize::new(0),
        });
        let resolver = AreaResolver::new(
            Arc::new(MemoryCache::new()),
            Arc::new(SqliteStore::in_memory().unwrap()),
            provider,
        );

        let err = resolver
            .resolve(&ctx(), &AreaLocator::new("", "", "Bandung"))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 401);
    }

    fn full_key() -> AreaKey {
        AreaKey {
            subdistrict_id: Some(3171),
            postal_code: Some("12440".to_string()),
        }
    }

    #[tokio::test]
    async fn test_save_or_create_updates_existing_external_id() {
        let store = SqliteStore::in_memory().unwrap();
        let first = save_or_create(
            &store,
            Area {
                original_subdistrict_id: 1,
                external_id: "IDNJAKA".to_string(),
                description: "old".to_string(),
                ..Default::default()
            },
            &AreaKey {
                subdistrict_id: Some(1),
                postal_code: None,
            },
        )
        .await
        .unwrap();

        let second = save_or_create(
            &store,
            Area {
                original_subdistrict_id: 2,
                external_id: "IDNJAKA".to_string(),
                description: "new".to_string(),
                ..Default::default()
            },
            &AreaKey {
                subdistrict_id: Some(2),
                postal_code: None,
            },
        )
        .await
        .unwrap();

        assert_eq!(first.id, second.id);
        let stored = store.find_by_external_id("IDNJAKA").await.unwrap().unwrap();
        assert_eq!(stored.description, "new");
        assert_eq!(stored.original_subdistrict_id, 2);
    }

    #[tokio::test]
    async fn test_keyless_save_keeps_stored_natural_key() {
        let store = SqliteStore::in_memory().unwrap();
        save_or_create(
            &store,
            Area {
                original_subdistrict_id: 3171,
                original_postal_code: "12440".to_string(),
                external_id: "IDNJAKA".to_string(),
                ..Default::default()
            },
            &full_key(),
        )
        .await
        .unwrap();

        let saved = save_or_create(
            &store,
            Area {
                original_subdistrict_id: 0,
                original_postal_code: "12430".to_string(),
                external_id: "IDNJAKA".to_string(),
                description: "Kebayoran Lama".to_string(),
                ..Default::default()
            },
            &AreaKey::default(),
        )
        .await
        .unwrap();

        assert_eq!(saved.original_subdistrict_id, 3171);
        assert_eq!(saved.original_postal_code, "12440");
        assert_eq!(saved.description, "Kebayoran Lama");
        assert!(store.find_by_natural_key(&full_key()).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_query_only_lookup_does_not_break_keyed_lookup() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let provider = Arc::new(StubProvider::with_area("IDNJAKA", 12440));
        let keyed = AreaLocator::new("3171", "12440", "Jakarta Selatan");

        let warm = AreaResolver::new(Arc::new(MemoryCache::new()), store.clone(), provider.clone());
        let first = warm.resolve_traced(&ctx(), &keyed).await.unwrap();
        assert_eq!(first.tier, Tier::Provider);

        let by_query = warm
            .resolve_traced(&ctx(), &AreaLocator::new("", "", "Jakarta Selatan"))
            .await
            .unwrap();
        assert_eq!(by_query.tier, Tier::Provider);
        assert_eq!(provider.searches.load(Ordering::SeqCst), 2);

        let stored = store.find_by_external_id("IDNJAKA").await.unwrap().unwrap();
        assert_eq!(stored.original_subdistrict_id, 3171);

        let cold = AreaResolver::new(Arc::new(MemoryCache::new()), store, provider.clone());
        let again = cold.resolve_traced(&ctx(), &keyed).await.unwrap();
        assert_eq!(again.tier, Tier::Store);
        assert_eq!(again.entity.external_id, "IDNJAKA");
        assert_eq!(provider.searches.load(Ordering::SeqCst), 2);
    }
}
