//! The resolution cascade: cache → durable store → provider.
//!
//! Both resolvers run the same control flow; what differs between them
//! (usability predicates, cache keys, write-back targets) lives in a
//! [`ResolutionPolicy`]. The tiers are evaluated strictly in order and the
//! first one yielding a usable entity wins:
//!
//! 1. **Cache.** Read errors and undecodable entries are logged and treated
//!    as a miss.
//! 2. **Store.** A stored entity is either served (and written back to the
//!    cache), kept as a last-resort fallback, or ignored. Store read errors
//!    never fail the request; the provider is tried instead.
//! 3. **Provider.** The result is persisted, cached and returned. Write-back
//!    failures are warnings only. Provider errors are returned as-is unless a
//!    fallback entity was kept from the store.

use crate::core::context::RequestContext;
use crate::domain::ports::Cache;
use crate::utils::error::{Result, StoreResult};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// The tier that answered a resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Cache,
    Store,
    Provider,
    /// A store entity kept as fallback because the provider failed.
    StaleStore,
}

#[derive(Debug, Clone)]
pub struct Resolution<E> {
    pub entity: E,
    pub tier: Tier,
}

/// What to do with an entity found in the durable store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreVerdict {
    /// Return it now and refresh the cache with it.
    Serve,
    /// Try the provider, but answer with this if the provider fails.
    Fallback,
    /// Treat as a miss.
    Skip,
}

#[async_trait]
pub trait ResolutionPolicy: Send + Sync {
    type Key: Send + Sync;
    type Entity: Serialize + DeserializeOwned + Clone + Send + Sync;

    /// Short name used in log lines.
    fn kind(&self) -> &'static str;

    /// Rejects keys with no identifying information at all.
    fn validate(&self, key: &Self::Key) -> Result<()>;

    /// `None` skips the cache tier entirely.
    fn cache_key(&self, key: &Self::Key) -> Option<String>;

    fn cache_ttl(&self, ctx: &RequestContext, entity: &Self::Entity) -> Duration;

    fn usable_from_cache(&self, ctx: &RequestContext, entity: &Self::Entity) -> bool;

    async fn find_stored(
        &self,
        ctx: &RequestContext,
        key: &Self::Key,
    ) -> StoreResult<Option<Self::Entity>>;

    fn judge_stored(&self, ctx: &RequestContext, entity: &Self::Entity) -> StoreVerdict;

    /// Whether the key carries enough to ask the provider.
    fn fetchable(&self, key: &Self::Key) -> Result<()>;

    async fn fetch(&self, ctx: &RequestContext, key: &Self::Key) -> Result<Self::Entity>;

    /// Writes a freshly fetched entity to the durable store, returning the
    /// stored form.
    async fn persist(
        &self,
        ctx: &RequestContext,
        key: &Self::Key,
        entity: &Self::Entity,
    ) -> Result<Self::Entity>;
}

pub struct Cascade<P: ResolutionPolicy> {
    policy: P,
    cache: Arc<dyn Cache>,
}

impl<P: ResolutionPolicy> Cascade<P> {
    pub fn new(policy: P, cache: Arc<dyn Cache>) -> Self {
        Self { policy, cache }
    }

    pub fn policy(&self) -> &P {
        &self.policy
    }

    pub async fn resolve(
        &self,
        ctx: &RequestContext,
        key: &P::Key,
    ) -> Result<Resolution<P::Entity>> {
        let kind = self.policy.kind();
        self.policy.validate(key)?;

        let cache_key = self.policy.cache_key(key);

        // 1. cache
        if let Some(cache_key) = cache_key.as_deref() {
            if let Some(entity) = self.probe_cache(ctx, cache_key).await {
                tracing::info!(trace_id = %ctx.trace_id(), "Cache hit for {} with key: {}", kind, cache_key);
                return Ok(Resolution {
                    entity,
                    tier: Tier::Cache,
                });
            }
        }

        // 2. durable store
        let mut fallback = None;
        match self.policy.find_stored(ctx, key).await {
            Ok(Some(entity)) => match self.policy.judge_stored(ctx, &entity) {
                StoreVerdict::Serve => {
                    tracing::info!(trace_id = %ctx.trace_id(), "Serving {} from store", kind);
                    if let Some(cache_key) = cache_key.as_deref() {
                        self.write_cache(ctx, cache_key, &entity).await;
                    }
                    return Ok(Resolution {
                        entity,
                        tier: Tier::Store,
                    });
                }
                StoreVerdict::Fallback => {
                    tracing::debug!(trace_id = %ctx.trace_id(), "Stored {} is stale, refreshing from provider", kind);
                    fallback = Some(entity);
                }
                StoreVerdict::Skip => {
                    tracing::debug!(trace_id = %ctx.trace_id(), "Stored {} is not usable", kind);
                }
            },
            Ok(None) => {
                tracing::debug!(trace_id = %ctx.trace_id(), "Store miss for {}", kind);
            }
            Err(e) => {
                tracing::error!(trace_id = %ctx.trace_id(), "Error finding {} in store: {}", kind, e);
            }
        }

        // 3. provider
        if let Err(e) = self.policy.fetchable(key) {
            tracing::info!(trace_id = %ctx.trace_id(), "Skipping provider lookup for {}: {}", kind, e);
            return match fallback {
                Some(entity) => Ok(Resolution {
                    entity,
                    tier: Tier::StaleStore,
                }),
                None => Err(e),
            };
        }

        let fetched = match self.policy.fetch(ctx, key).await {
            Ok(entity) => entity,
            Err(e) => {
                return match fallback {
                    Some(entity) => {
                        tracing::warn!(
                            trace_id = %ctx.trace_id(),
                            "Provider lookup for {} failed, serving stored copy: {}",
                            kind,
                            e
                        );
                        Ok(Resolution {
                            entity,
                            tier: Tier::StaleStore,
                        })
                    }
                    None => {
                        tracing::error!(trace_id = %ctx.trace_id(), "Provider lookup for {} failed: {}", kind, e);
                        Err(e)
                    }
                };
            }
        };

        let entity = match self.policy.persist(ctx, key, &fetched).await {
            Ok(stored) => stored,
            Err(e) => {
                tracing::warn!(trace_id = %ctx.trace_id(), "Failed to save {} to store: {}", kind, e);
                fetched
            }
        };

        if let Some(cache_key) = cache_key.as_deref() {
            self.write_cache(ctx, cache_key, &entity).await;
        }

        Ok(Resolution {
            entity,
            tier: Tier::Provider,
        })
    }

    async fn probe_cache(&self, ctx: &RequestContext, cache_key: &str) -> Option<P::Entity> {
        let kind = self.policy.kind();
        let bytes = match self.cache.get(cache_key).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                tracing::debug!(trace_id = %ctx.trace_id(), "Cache miss for {} with key: {}", kind, cache_key);
                return None;
            }
            Err(e) => {
                tracing::error!(trace_id = %ctx.trace_id(), "Error getting {} from cache: {}", kind, e);
                return None;
            }
        };

        match serde_json::from_slice::<P::Entity>(&bytes) {
            Ok(entity) if self.policy.usable_from_cache(ctx, &entity) => Some(entity),
            Ok(_) => {
                tracing::debug!(trace_id = %ctx.trace_id(), "Cached {} is not usable: {}", kind, cache_key);
                None
            }
            Err(e) => {
                tracing::warn!(trace_id = %ctx.trace_id(), "Error decoding cached {}: {}", kind, e);
                None
            }
        }
    }

    async fn write_cache(&self, ctx: &RequestContext, cache_key: &str, entity: &P::Entity) {
        let kind = self.policy.kind();
        let bytes = match serde_json::to_vec(entity) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(trace_id = %ctx.trace_id(), "Error encoding {} for cache: {}", kind, e);
                return;
            }
        };

        let ttl = self.policy.cache_ttl(ctx, entity);
        if let Err(e) = self.cache.set(cache_key, &bytes, ttl).await {
            tracing::warn!(trace_id = %ctx.trace_id(), "Error setting {} in cache: {}", kind, e);
        }
    }
}
