use crate::config::ProviderConfig;
use crate::core::context::RequestContext;
use crate::domain::ports::ShippingProvider;
use crate::provider::model::{AreaSearchResponse, RateRequest, RateResponse, TrackingResponse};
use crate::provider::ProviderError;
use crate::utils::error::{GatewayError, Result};
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use url::Url;

type ProviderResult<T> = std::result::Result<T, ProviderError>;

/// HTTP client for the Biteship logistics API.
pub struct BiteshipClient {
    base_url: Url,
    api_key: String,
    origin_country: String,
    client: Client,
}

impl BiteshipClient {
    pub const SOURCE: &'static str = "biteship";

    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let base_url =
            Url::parse(&config.base_url).map_err(|e| GatewayError::InvalidConfigValueError {
                field: "provider.base_url".to_string(),
                value: config.base_url.clone(),
                reason: format!("Invalid URL format: {}", e),
            })?;
        if base_url.cannot_be_a_base() {
            return Err(GatewayError::InvalidConfigValueError {
                field: "provider.base_url".to_string(),
                value: config.base_url.clone(),
                reason: "URL cannot be used as a base".to_string(),
            });
        }

        // 每個請求都套用設定的逾時
        let client = Client::builder().timeout(config.timeout()).build()?;

        Ok(Self {
            base_url,
            api_key: config.api_key.clone(),
            origin_country: config.origin_country().to_string(),
            client,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header(AUTHORIZATION, &self.api_key)
            .header(CONTENT_TYPE, "application/json")
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        ctx: &RequestContext,
        request: RequestBuilder,
        description: &str,
    ) -> ProviderResult<T> {
        let response = request.send().await.map_err(|e| {
            tracing::error!(
                trace_id = %ctx.trace_id(),
                "❌ Provider request failed ({}): {}",
                description,
                e
            );
            ProviderError::unreachable(e.to_string())
        })?;

        let status = response.status();
        let body = response.bytes().await.map_err(|e| {
            tracing::error!(
                trace_id = %ctx.trace_id(),
                "❌ Failed to read provider response ({}): {}",
                description,
                e
            );
            ProviderError::unreachable(e.to_string())
        })?;

        if !status.is_success() {
            tracing::error!(
                trace_id = %ctx.trace_id(),
                request = %description,
                response = %String::from_utf8_lossy(&body),
                "Unexpected status code from provider: {}",
                status
            );
            return Err(ProviderError::from_body(&body));
        }

        serde_json::from_slice(&body).map_err(|e| {
            tracing::error!(
                trace_id = %ctx.trace_id(),
                response = %String::from_utf8_lossy(&body),
                "Error decoding provider response ({}): {}",
                description,
                e
            );
            ProviderError::invalid_response(e.to_string())
        })
    }
}

#[async_trait]
impl ShippingProvider for BiteshipClient {
    fn source(&self) -> &str {
        Self::SOURCE
    }

    async fn search_areas(
        &self,
        ctx: &RequestContext,
        query: &str,
    ) -> ProviderResult<AreaSearchResponse> {
        tracing::debug!(trace_id = %ctx.trace_id(), "Searching provider areas for '{}'", query);
        let request = self
            .authorized(self.client.get(self.endpoint(&["v1", "maps", "areas"])))
            .query(&[
                ("countries", self.origin_country.as_str()),
                ("input", query),
                ("type", "single"),
            ]);

        self.execute(ctx, request, &format!("area search input={}", query))
            .await
    }

    async fn courier_rates(
        &self,
        ctx: &RequestContext,
        rate_request: &RateRequest,
    ) -> ProviderResult<RateResponse> {
        let payload = serde_json::to_string(rate_request).unwrap_or_default();
        tracing::debug!(trace_id = %ctx.trace_id(), "Requesting courier rates: {}", payload);

        let request = self
            .authorized(self.client.post(self.endpoint(&["v1", "rates", "couriers"])))
            .json(rate_request);

        self.execute(ctx, request, &payload).await
    }

    async fn track_waybill(
        &self,
        ctx: &RequestContext,
        waybill: &str,
        courier: &str,
    ) -> ProviderResult<TrackingResponse> {
        tracing::debug!(
            trace_id = %ctx.trace_id(),
            "Requesting tracking for waybill {} via {}",
            waybill,
            courier
        );
        let url = self.endpoint(&["v1", "tracking", waybill, "couriers", courier]);
        let request = self.authorized(self.client.get(url));

        self.execute(
            ctx,
            request,
            &format!("tracking waybill={} courier={}", waybill, courier),
        )
        .await
    }
}
