// Conversions between provider payloads, cached snapshots and stored rows.

use crate::domain::model::{
    Area, AreaKey, CourierPrice, CourierRateResponse, ItemRequest, LocationSummary,
    ShipmentAddressInfo, ShipmentHistoryItem, ShipmentTracking, ShipmentTrackingLog,
    TrackingStatus,
};
use crate::provider::model as wire;
use chrono::{DateTime, Utc};
use uuid::Uuid;

pub fn area_from_provider(
    found: &wire::Area,
    key: &AreaKey,
    source: &str,
) -> serde_json::Result<Area> {
    let external_info = serde_json::to_string(found)?;

    // 呼叫端給的郵遞區號優先，否則使用供應商回傳的
    let original_postal_code = match &key.postal_code {
        Some(code) => code.clone(),
        None if found.postal_code > 0 => found.postal_code.to_string(),
        None => String::new(),
    };

    Ok(Area {
        id: 0,
        original_subdistrict_id: key.subdistrict_id.unwrap_or_default(),
        original_postal_code,
        description: found.name.clone(),
        external_source: source.to_string(),
        external_id: found.id.clone(),
        external_info,
    })
}

fn address_from_provider(address: &wire::TrackingAddress) -> ShipmentAddressInfo {
    ShipmentAddressInfo {
        contact_name: address.contact_name.clone(),
        address: address.address.clone(),
    }
}

/// Orders history oldest to newest. The sort only happens when every
/// timestamp parses; otherwise provider order is kept.
fn order_history(history: &mut [ShipmentHistoryItem]) {
    let parsed: Option<Vec<DateTime<chrono::FixedOffset>>> = history
        .iter()
        .map(|item| DateTime::parse_from_rfc3339(&item.updated_at).ok())
        .collect();

    if let Some(stamps) = parsed {
        let mut indexed: Vec<(DateTime<chrono::FixedOffset>, ShipmentHistoryItem)> =
            stamps.into_iter().zip(history.iter().cloned()).collect();
        indexed.sort_by_key(|(stamp, _)| *stamp);
        for (slot, (_, item)) in history.iter_mut().zip(indexed) {
            *slot = item;
        }
    }
}

/// Normalizes a provider tracking payload. The natural key always comes from
/// the request so the stored row can be found again by it.
pub fn tracking_from_provider(
    resp: &wire::TrackingResponse,
    waybill: &str,
    courier: &str,
    tracked_at: DateTime<Utc>,
) -> ShipmentTracking {
    let mut history: Vec<ShipmentHistoryItem> = resp
        .history
        .iter()
        .map(|item| {
            let status = TrackingStatus::parse(&item.status);
            ShipmentHistoryItem {
                note: item.note.clone(),
                message: status.message().to_string(),
                updated_at: item.updated_at.clone(),
                status: status.as_str().to_string(),
            }
        })
        .collect();
    order_history(&mut history);

    let status = history
        .last()
        .map(|item| item.status.clone())
        .unwrap_or_else(|| resp.status.clone());

    ShipmentTracking {
        courier_code: courier.to_string(),
        waybill: waybill.to_string(),
        tracking_url: resp.link.clone(),
        origin_info: address_from_provider(&resp.origin),
        destination_info: address_from_provider(&resp.destination),
        status,
        history,
        last_tracked_at: tracked_at,
    }
}

pub fn tracking_to_log(
    snapshot: &ShipmentTracking,
    now: DateTime<Utc>,
) -> serde_json::Result<ShipmentTrackingLog> {
    Ok(ShipmentTrackingLog {
        id: Uuid::now_v7().to_string(),
        courier_code: snapshot.courier_code.clone(),
        waybill: snapshot.waybill.clone(),
        origin_info: serde_json::to_string(&snapshot.origin_info)?,
        destination_info: serde_json::to_string(&snapshot.destination_info)?,
        tracking_url: snapshot.tracking_url.clone(),
        tracking_status: snapshot.status.clone(),
        shipment_history: serde_json::to_string(&snapshot.history)?,
        last_tracked_at: snapshot.last_tracked_at,
        created_at: now,
        updated_at: now,
    })
}

pub fn tracking_from_log(log: &ShipmentTrackingLog) -> serde_json::Result<ShipmentTracking> {
    Ok(ShipmentTracking {
        courier_code: log.courier_code.clone(),
        waybill: log.waybill.clone(),
        tracking_url: log.tracking_url.clone(),
        origin_info: serde_json::from_str(&log.origin_info)?,
        destination_info: serde_json::from_str(&log.destination_info)?,
        status: log.tracking_status.clone(),
        history: serde_json::from_str(&log.shipment_history)?,
        last_tracked_at: log.last_tracked_at,
    })
}

pub fn items_to_provider(items: &[ItemRequest]) -> Vec<wire::Item> {
    items
        .iter()
        .map(|item| wire::Item {
            name: item.name.clone(),
            description: item.description.clone(),
            value: item.price,
            weight: item.metrics.weight,
            length: item.metrics.length,
            width: item.metrics.width,
            height: item.metrics.height,
            quantity: item.quantity,
        })
        .collect()
}

fn location_from_provider(location: &wire::PricingLocation) -> LocationSummary {
    LocationSummary {
        country: location.country_name.clone(),
        country_code: location.country_code.clone(),
        province: location.administrative_division_level_1_name.clone(),
        city: location.administrative_division_level_2_name.clone(),
        district: location.administrative_division_level_3_name.clone(),
        address: location.address.clone(),
        postal_code: location.postal_code.to_string(),
    }
}

/// Flattens the provider price list, keeping provider ordering.
pub fn rate_response_from_provider(resp: &wire::RateResponse) -> CourierRateResponse {
    CourierRateResponse {
        origin: location_from_provider(&resp.origin),
        destination: location_from_provider(&resp.destination),
        prices: resp
            .pricing
            .iter()
            .map(|pricing| CourierPrice {
                courier_code: pricing.courier_code.clone(),
                courier_name: pricing.courier_name.clone(),
                service_type: pricing.service_type.clone(),
                service_name: pricing.courier_service_name.clone(),
                service_code: pricing.courier_service_code.clone(),
                price: pricing.price,
                etd: pricing.duration.clone(),
            })
            .collect(),
    }
}
