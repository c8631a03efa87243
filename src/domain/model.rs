use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A normalized geographic unit resolved through the logistics provider.
///
/// An area whose `external_id` is empty is *unresolved*: it can never be
/// quoted against and is never treated as a cache or store hit.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Area {
    pub id: u64,
    pub original_subdistrict_id: u64,
    pub original_postal_code: String,
    pub description: String,
    pub external_source: String,
    pub external_id: String,
    /// Raw provider payload, kept for audit.
    pub external_info: String,
}

impl Area {
    pub fn is_resolved(&self) -> bool {
        !self.external_id.is_empty()
    }
}

/// What a caller knows about a location. Any subset may be empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AreaLocator {
    pub subdistrict_id: String,
    pub postal_code: String,
    pub query: String,
}

impl AreaLocator {
    pub fn new(
        subdistrict_id: impl Into<String>,
        postal_code: impl Into<String>,
        query: impl Into<String>,
    ) -> Self {
        Self {
            subdistrict_id: subdistrict_id.into(),
            postal_code: postal_code.into(),
            query: query.into(),
        }
    }
}

/// Natural key of a stored area.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AreaKey {
    pub subdistrict_id: Option<u64>,
    pub postal_code: Option<String>,
}

impl AreaKey {
    pub fn is_empty(&self) -> bool {
        self.subdistrict_id.is_none() && self.postal_code.is_none()
    }

    pub fn matches(&self, area: &Area) -> bool {
        if self.is_empty() {
            return false;
        }
        let subdistrict_ok = self
            .subdistrict_id
            .map_or(true, |id| area.original_subdistrict_id == id);
        let postal_ok = self
            .postal_code
            .as_deref()
            .map_or(true, |code| area.original_postal_code == code);
        subdistrict_ok && postal_ok
    }
}

/// Shipment status codes reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackingStatus {
    Confirmed,
    Allocated,
    PickingUp,
    Picked,
    DroppingOff,
    InTransit,
    OnHold,
    Delivered,
    Rejected,
    CourierNotFound,
    Returned,
    Cancelled,
    Disposed,
    Other(String),
}

const STATUS_TABLE: &[(TrackingStatus, &str, &str)] = &[
    (TrackingStatus::Confirmed, "confirmed", "Pesanan telah dikonfirmasi. Segera mencari kurir terdekat."),
    (TrackingStatus::Allocated, "allocated", "Kurir telah dialokasikan untuk mengambil pesanan Anda."),
    (TrackingStatus::PickingUp, "pickingUp", "Kurir sedang dalam perjalanan untuk mengambil pesanan Anda."),
    (TrackingStatus::Picked, "picked", "Pesanan Anda telah diambil oleh kurir."),
    (TrackingStatus::DroppingOff, "droppingOff", "Kurir sedang dalam perjalanan untuk mengantarkan pesanan Anda"),
    (TrackingStatus::InTransit, "inTransit", "Pesanan Anda sedang diproses di lokasi transit."),
    (TrackingStatus::OnHold, "onHold", "Pesanan Anda sedang ditahan karena alasan tertentu."),
    (TrackingStatus::Delivered, "delivered", "Pesanan Anda telah berhasil diantarkan."),
    (TrackingStatus::Rejected, "rejected", "Pesanan Anda telah ditolak oleh kurir."),
    (TrackingStatus::CourierNotFound, "courierNotFound", "Kurir tidak ditemukan untuk pesanan ini."),
    (TrackingStatus::Returned, "returned", "Pesanan Anda telah dikembalikan."),
    (TrackingStatus::Cancelled, "cancelled", "Pesanan Anda telah dibatalkan."),
    (TrackingStatus::Disposed, "disposed", "Pesanan Anda telah dibuang."),
];

const UNKNOWN_STATUS_MESSAGE: &str = "Status tidak dikenal";

impl TrackingStatus {
    pub fn parse(code: &str) -> Self {
        STATUS_TABLE
            .iter()
            .find(|(_, known, _)| known.eq_ignore_ascii_case(code))
            .map(|(status, _, _)| status.clone())
            .unwrap_or_else(|| TrackingStatus::Other(code.to_string()))
    }

    pub fn as_str(&self) -> &str {
        match self {
            TrackingStatus::Other(code) => code,
            known => STATUS_TABLE
                .iter()
                .find(|(status, _, _)| status == known)
                .map(|(_, code, _)| *code)
                .unwrap_or_default(),
        }
    }

    pub fn message(&self) -> &'static str {
        STATUS_TABLE
            .iter()
            .find(|(status, _, _)| status == self)
            .map(|(_, _, message)| *message)
            .unwrap_or(UNKNOWN_STATUS_MESSAGE)
    }

    /// Delivered and cancelled shipments never change again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TrackingStatus::Delivered | TrackingStatus::Cancelled)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ShipmentAddressInfo {
    pub contact_name: String,
    pub address: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ShipmentHistoryItem {
    pub note: String,
    pub message: String,
    pub updated_at: String,
    pub status: String,
}

/// The latest tracking snapshot for one (waybill, courier) pair, as cached
/// and as returned to callers. `history` is ordered oldest to newest and
/// `status` equals the status of its last entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ShipmentTracking {
    pub courier_code: String,
    pub waybill: String,
    pub tracking_url: String,
    pub origin_info: ShipmentAddressInfo,
    pub destination_info: ShipmentAddressInfo,
    pub status: String,
    pub history: Vec<ShipmentHistoryItem>,
    pub last_tracked_at: DateTime<Utc>,
}

impl ShipmentTracking {
    pub fn current_status(&self) -> TrackingStatus {
        TrackingStatus::parse(&self.status)
    }

    pub fn is_terminal(&self) -> bool {
        self.current_status().is_terminal()
    }
}

/// Durable row for a tracking snapshot. Address info and history are stored
/// as serialized JSON.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ShipmentTrackingLog {
    pub id: String,
    pub courier_code: String,
    pub waybill: String,
    pub origin_info: String,
    pub destination_info: String,
    pub tracking_url: String,
    pub tracking_status: String,
    pub shipment_history: String,
    pub last_tracked_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Metrics {
    /// cm
    pub length: i64,
    pub width: i64,
    pub height: i64,
    /// grams
    pub weight: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ItemRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub price: i64,
    #[serde(flatten)]
    pub metrics: Metrics,
    #[serde(default)]
    pub quantity: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CourierRateRequest {
    pub origin_subdistrict_id: String,
    pub destination_subdistrict_id: String,
    pub origin_query: String,
    pub destination_query: String,
    pub origin_postal_code: String,
    pub destination_postal_code: String,
    pub courier_code: String,
    pub items: Vec<ItemRequest>,
}

impl CourierRateRequest {
    pub fn origin(&self) -> AreaLocator {
        AreaLocator::new(
            self.origin_subdistrict_id.clone(),
            self.origin_postal_code.clone(),
            self.origin_query.clone(),
        )
    }

    pub fn destination(&self) -> AreaLocator {
        AreaLocator::new(
            self.destination_subdistrict_id.clone(),
            self.destination_postal_code.clone(),
            self.destination_query.clone(),
        )
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LocationSummary {
    pub country: String,
    pub country_code: String,
    pub province: String,
    pub city: String,
    pub district: String,
    pub address: String,
    pub postal_code: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CourierPrice {
    pub courier_code: String,
    pub courier_name: String,
    pub service_type: String,
    pub service_name: String,
    pub service_code: String,
    pub price: i64,
    pub etd: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CourierRateResponse {
    pub origin: LocationSummary,
    pub destination: LocationSummary,
    pub prices: Vec<CourierPrice>,
}

/// Outcome of a gateway operation: an HTTP-equivalent status and a message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServiceResponse {
    pub status_code: u16,
    pub message: String,
}

impl ServiceResponse {
    pub fn success() -> Self {
        Self {
            status_code: 200,
            message: "Success".to_string(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status_code: 400,
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }
}

impl From<&crate::utils::error::GatewayError> for ServiceResponse {
    fn from(err: &crate::utils::error::GatewayError) -> Self {
        Self {
            status_code: err.status_code(),
            message: err.user_friendly_message(),
        }
    }
}

/// Response envelope handed back to callers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiResponse<T> {
    pub status: String,
    pub code: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn from_service(outcome: &ServiceResponse, data: Option<T>) -> Self {
        let status = if outcome.is_success() { "success" } else { "failed" };
        Self {
            status: status.to_string(),
            code: outcome.status_code,
            message: outcome.message.clone(),
            data: if outcome.is_success() { data } else { None },
        }
    }
}
