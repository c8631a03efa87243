// Wire shapes of the logistics provider API. Fields the gateway never reads
// are still kept so the raw payload can be stored for audit.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Item {
    pub name: String,
    pub description: String,
    pub value: i64,
    pub weight: i64,
    pub length: i64,
    pub width: i64,
    pub height: i64,
    pub quantity: i64,
}

fn is_zero(v: &u32) -> bool {
    *v == 0
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RateRequest {
    #[serde(default, skip_serializing_if = "is_zero")]
    pub origin_postal_code: u32,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub origin_area_id: String,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub destination_postal_code: u32,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub destination_area_id: String,
    pub couriers: String,
    pub items: Vec<Item>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Area {
    pub id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub postal_code: u32,
    pub country_name: String,
    pub country_code: String,
    pub administrative_division_level_1_name: String,
    pub administrative_division_level_1_type: String,
    pub administrative_division_level_2_name: String,
    pub administrative_division_level_2_type: String,
    pub administrative_division_level_3_name: String,
    pub administrative_division_level_3_type: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub address: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AreaSearchResponse {
    pub success: bool,
    pub message: String,
    pub object: String,
    pub areas: Vec<Area>,
}

/// Origin/destination echo in a rate response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingLocation {
    pub location_id: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub postal_code: u32,
    pub country_name: String,
    pub country_code: String,
    pub administrative_division_level_1_name: String,
    pub administrative_division_level_1_type: String,
    pub administrative_division_level_2_name: String,
    pub administrative_division_level_2_type: String,
    pub administrative_division_level_3_name: String,
    pub administrative_division_level_3_type: String,
    pub administrative_division_level_4_name: String,
    pub administrative_division_level_4_type: String,
    pub address: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Pricing {
    pub available_collection_method: Vec<String>,
    pub available_for_cash_on_delivery: bool,
    pub available_for_proof_of_delivery: bool,
    pub available_for_instant_waybill_id: bool,
    pub available_for_insurance: bool,
    pub company: String,
    pub courier_name: String,
    pub courier_code: String,
    pub courier_service_name: String,
    pub courier_service_code: String,
    pub currency: String,
    pub description: String,
    pub duration: String,
    pub shipment_duration_range: String,
    pub shipment_duration_unit: String,
    pub price: i64,
    #[serde(rename = "type")]
    pub service_type: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RateResponse {
    pub success: bool,
    pub message: String,
    pub object: String,
    pub origin: PricingLocation,
    pub destination: PricingLocation,
    pub pricing: Vec<Pricing>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CourierTracking {
    pub company: String,
    pub driver_name: String,
    pub driver_phone: String,
    pub driver_photo_url: String,
    pub driver_plate_number: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingAddress {
    pub contact_name: String,
    pub address: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingHistoryItem {
    pub note: String,
    pub updated_at: String,
    pub status: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingResponse {
    pub success: bool,
    pub message: String,
    pub object: String,
    pub id: String,
    pub waybill_id: String,
    pub courier: CourierTracking,
    pub origin: TrackingAddress,
    pub destination: TrackingAddress,
    pub history: Vec<TrackingHistoryItem>,
    pub link: String,
    pub order_id: Option<String>,
    pub status: String,
}
