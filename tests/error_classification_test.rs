use shipping_gateway::domain::model::ServiceResponse;
use shipping_gateway::provider::{classify, codes, ProviderError};
use shipping_gateway::utils::error::ErrorCategory;
use shipping_gateway::GatewayError;

const DOCUMENTED: &[i64] = &[
    codes::ERR_INVALID_PARSING_RESPONSE,
    codes::ERR_PROVIDER_UNREACHABLE,
    codes::ERR_INVALID_AUTHENTICATION,
    codes::ERR_RATE_INVALID_POSTAL_CODE,
    codes::ERR_RATE_INVALID_PARAMETER,
    codes::ERR_RATE_NO_COURIER_AVAILABLE,
];

#[test]
fn test_every_documented_code_has_a_distinct_entry() {
    let unknown = classify(-1);
    for code in DOCUMENTED {
        let c = classify(*code);
        assert_ne!(c, unknown, "code {} falls back to the generic entry", code);
        assert!((400..600).contains(&c.http_status));
    }

    let empty: Vec<i64> = DOCUMENTED
        .iter()
        .copied()
        .filter(|code| classify(*code).empty_result)
        .collect();
    assert_eq!(empty, vec![codes::ERR_RATE_NO_COURIER_AVAILABLE]);
}

#[test]
fn test_unknown_codes_map_to_generic_internal_error() {
    for code in [0, 1, 42, 50000000, i64::MAX, i64::MIN] {
        let c = classify(code);
        assert_eq!(c.http_status, 500);
        assert!(!c.empty_result);
        assert_eq!(c.message, "Unexpected error from Provider");
    }
}

#[test]
fn test_provider_errors_surface_through_service_response() {
    let not_found = GatewayError::from(ProviderError::new(codes::ERR_RATE_NO_COURIER_AVAILABLE, "none"));
    assert_eq!(not_found.category(), ErrorCategory::NotFound);
    assert_eq!(ServiceResponse::from(&not_found).status_code, 404);

    let garbage = GatewayError::from(ProviderError::from_body(b"<html>oops</html>"));
    assert_eq!(garbage.category(), ErrorCategory::UpstreamFailure);
    let outcome = ServiceResponse::from(&garbage);
    assert_eq!(outcome.status_code, 500);
    assert_eq!(outcome.message, "Failed to parse response from Provider");
}
