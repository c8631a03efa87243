use crate::core::area::AreaResolver;
use crate::core::context::RequestContext;
use crate::domain::convert;
use crate::domain::model::{
    AreaLocator, CourierRateRequest, CourierRateResponse, ServiceResponse,
};
use crate::domain::ports::ShippingProvider;
use crate::provider::model::RateRequest;
use crate::utils::error::{GatewayError, Result};
use crate::utils::validation::Validate;
use std::sync::Arc;

impl Validate for CourierRateRequest {
    fn validate(&self) -> Result<()> {
        for (side, locator) in [("origin", self.origin()), ("destination", self.destination())] {
            if locator.subdistrict_id.trim().is_empty()
                && locator.postal_code.trim().is_empty()
                && locator.query.trim().is_empty()
            {
                return Err(GatewayError::client_input(
                    side,
                    format!(
                        "invalid request : field '{0}_subdistrict_id', '{0}_postal_code', or '{0}_query' must be provided",
                        side
                    ),
                ));
            }
        }

        if self.courier_code.trim().is_empty() {
            return Err(GatewayError::client_input(
                "courier_code",
                "invalid request : field 'courier_code' must be provided",
            ));
        }

        if self.items.is_empty() {
            return Err(GatewayError::client_input(
                "items",
                "invalid request : field 'items' must contain at least one item",
            ));
        }

        if let Some(pos) = self.items.iter().position(|item| item.quantity <= 0) {
            return Err(GatewayError::client_input(
                "items",
                format!("invalid request : item {} must have a positive quantity", pos),
            ));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Origin,
    Destination,
}

impl Side {
    fn field(self) -> &'static str {
        match self {
            Side::Origin => "origin",
            Side::Destination => "destination",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Side::Origin => "Origin",
            Side::Destination => "Destination",
        }
    }
}

/// How one side of a quote is identified to the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Placement {
    AreaId(String),
    PostalCode(u32),
}

/// Courier rate quotes between two caller-described locations.
pub struct ShippingService {
    areas: Arc<AreaResolver>,
    provider: Arc<dyn ShippingProvider>,
}

impl ShippingService {
    pub fn new(areas: Arc<AreaResolver>, provider: Arc<dyn ShippingProvider>) -> Self {
        Self { areas, provider }
    }

    pub async fn quote(
        &self,
        ctx: &RequestContext,
        req: &CourierRateRequest,
    ) -> (ServiceResponse, Option<CourierRateResponse>) {
        match self.try_quote(ctx, req).await {
            Ok(resp) => (ServiceResponse::success(), Some(resp)),
            Err(e) => {
                match &e {
                    GatewayError::NotFound { .. } => {
                        tracing::info!(trace_id = %ctx.trace_id(), "{}", e)
                    }
                    _ => tracing::error!(trace_id = %ctx.trace_id(), "❌ Courier rate quote failed: {}", e),
                }
                (ServiceResponse::from(&e), None)
            }
        }
    }

    pub async fn try_quote(
        &self,
        ctx: &RequestContext,
        req: &CourierRateRequest,
    ) -> Result<CourierRateResponse> {
        tracing::info!(trace_id = %ctx.trace_id(), "GetCourierRates request: {:?}", req);
        req.validate()?;

        let origin = self.locate(ctx, Side::Origin, &req.origin()).await?;
        let destination = self.locate(ctx, Side::Destination, &req.destination()).await?;

        let mut rate_request = RateRequest {
            couriers: req.courier_code.trim().to_string(),
            items: convert::items_to_provider(&req.items),
            ..Default::default()
        };
        match origin {
            Placement::AreaId(id) => rate_request.origin_area_id = id,
            Placement::PostalCode(code) => rate_request.origin_postal_code = code,
        }
        match destination {
            Placement::AreaId(id) => rate_request.destination_area_id = id,
            Placement::PostalCode(code) => rate_request.destination_postal_code = code,
        }

        match self.provider.courier_rates(ctx, &rate_request).await {
            Ok(resp) => {
                let out = convert::rate_response_from_provider(&resp);
                tracing::info!(
                    trace_id = %ctx.trace_id(),
                    "✅ Got {} courier rates for {}",
                    out.prices.len(),
                    rate_request.couriers
                );
                Ok(out)
            }
            Err(e) if e.is_empty_result() => {
                Err(GatewayError::not_found("No courier rates found"))
            }
            Err(e) => Err(GatewayError::upstream("Failed to get courier rates", e)),
        }
    }

    /// Resolves one side to a provider area, falling back to the raw postal
    /// code when no usable area can be found.
    async fn locate(
        &self,
        ctx: &RequestContext,
        side: Side,
        locator: &AreaLocator,
    ) -> Result<Placement> {
        match self.areas.resolve(ctx, locator).await {
            Ok(area) if area.is_resolved() => return Ok(Placement::AreaId(area.external_id)),
            Ok(_) => {
                tracing::warn!(trace_id = %ctx.trace_id(), "{} area resolved without external id", side.label());
            }
            Err(e) => {
                tracing::warn!(trace_id = %ctx.trace_id(), "{} area not found: {}", side.label(), e);
            }
        }

        let postal_code = locator.postal_code.trim();
        if postal_code.is_empty() {
            return Err(GatewayError::client_input(
                side.field(),
                format!("{} postal code is required", side.label()),
            ));
        }

        postal_code
            .parse::<u32>()
            .map(Placement::PostalCode)
            .map_err(|_| {
                GatewayError::client_input(
                    side.field(),
                    format!("{} postal code is invalid: {}", side.label(), postal_code),
                )
            })
    }
}
