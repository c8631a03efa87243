// Table definitions matching `migrations/`.

diesel::table! {
    areas (id) {
        id -> BigInt,
        original_subdistrict_id -> BigInt,
        original_postal_code -> Text,
        description -> Text,
        external_source -> Text,
        external_id -> Text,
        external_info -> Text,
    }
}

diesel::table! {
    shipment_tracking_logs (id) {
        id -> Text,
        courier_code -> Text,
        waybill -> Text,
        origin_info -> Text,
        destination_info -> Text,
        tracking_url -> Text,
        tracking_status -> Text,
        shipment_history -> Text,
        last_tracked_at -> Timestamp,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

diesel::allow_tables_to_appear_in_same_query!(areas, shipment_tracking_logs);
