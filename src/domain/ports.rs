use crate::core::context::RequestContext;
use crate::domain::model::{Area, AreaKey, ShipmentTrackingLog};
use crate::provider::model::{AreaSearchResponse, RateRequest, RateResponse, TrackingResponse};
use crate::provider::ProviderError;
use crate::utils::error::StoreResult;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// `ttl` value meaning "keep until evicted".
pub const NO_EXPIRY: Duration = Duration::ZERO;

#[derive(Error, Debug)]
#[error("cache backend error: {0}")]
pub struct CacheError(pub String);

pub type CacheResult<T> = std::result::Result<T, CacheError>;

/// Ephemeral key/value tier with per-entry expiry.
#[async_trait]
pub trait Cache: Send + Sync {
    /// `Ok(None)` is a miss.
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>>;
    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> CacheResult<()>;
}

#[async_trait]
pub trait AreaStore: Send + Sync {
    /// Inserts a new row and assigns its id. Fails with
    /// [`StoreError::Conflict`](crate::utils::error::StoreError::Conflict) when
    /// the external id is already taken.
    async fn create(&self, area: Area) -> StoreResult<Area>;
    async fn update(&self, area: Area) -> StoreResult<Area>;
    async fn find_by_natural_key(&self, key: &AreaKey) -> StoreResult<Option<Area>>;
    async fn find_by_external_id(&self, external_id: &str) -> StoreResult<Option<Area>>;
}

#[async_trait]
pub trait TrackingStore: Send + Sync {
    async fn find_by_waybill_and_courier(
        &self,
        waybill: &str,
        courier_code: &str,
    ) -> StoreResult<Option<ShipmentTrackingLog>>;

    /// Upsert keyed by (waybill, courier). An existing row keeps its id and
    /// creation time.
    async fn create_or_update(&self, log: ShipmentTrackingLog) -> StoreResult<ShipmentTrackingLog>;
}

/// The third-party logistics provider.
#[async_trait]
pub trait ShippingProvider: Send + Sync {
    /// Name recorded as an area's external source.
    fn source(&self) -> &str;

    async fn search_areas(
        &self,
        ctx: &RequestContext,
        query: &str,
    ) -> Result<AreaSearchResponse, ProviderError>;

    async fn courier_rates(
        &self,
        ctx: &RequestContext,
        request: &RateRequest,
    ) -> Result<RateResponse, ProviderError>;

    async fn track_waybill(
        &self,
        ctx: &RequestContext,
        waybill: &str,
        courier: &str,
    ) -> Result<TrackingResponse, ProviderError>;
}
