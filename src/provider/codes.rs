//! Static classification of the logistics provider's numeric error codes.
//!
//! Every code the gateway knows about maps to exactly one
//! [`Classification`]; anything else falls back to [`UNKNOWN`]. The table is
//! part of the gateway's contract with its callers, so additions here must be
//! mirrored in the tests below.

pub const ERR_INVALID_PARSING_RESPONSE: i64 = 50009001;
/// Gateway-local code for timeouts and connection failures.
pub const ERR_PROVIDER_UNREACHABLE: i64 = 50309001;

pub const ERR_INVALID_AUTHENTICATION: i64 = 40101001;

pub const ERR_RATE_INVALID_POSTAL_CODE: i64 = 40001001;
pub const ERR_RATE_INVALID_PARAMETER: i64 = 40001002;
pub const ERR_RATE_NO_COURIER_AVAILABLE: i64 = 40001010;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub message: &'static str,
    pub http_status: u16,
    /// The request was valid but the provider has nothing to return.
    pub empty_result: bool,
}

pub static CLASSIFICATIONS: &[(i64, Classification)] = &[
    (
        ERR_INVALID_PARSING_RESPONSE,
        Classification {
            message: "Failed to parse response from Provider",
            http_status: 500,
            empty_result: false,
        },
    ),
    (
        ERR_PROVIDER_UNREACHABLE,
        Classification {
            message: "Failed to reach Provider",
            http_status: 503,
            empty_result: false,
        },
    ),
    (
        ERR_INVALID_AUTHENTICATION,
        Classification {
            message: "Invalid third party authentication credentials",
            http_status: 401,
            empty_result: false,
        },
    ),
    (
        ERR_RATE_INVALID_POSTAL_CODE,
        Classification {
            message: "Invalid postal code provided",
            http_status: 400,
            empty_result: false,
        },
    ),
    (
        ERR_RATE_INVALID_PARAMETER,
        Classification {
            message: "Invalid parameter provided",
            http_status: 400,
            empty_result: false,
        },
    ),
    (
        ERR_RATE_NO_COURIER_AVAILABLE,
        Classification {
            message: "No courier available for the given postal code or area",
            http_status: 404,
            empty_result: true,
        },
    ),
];

pub const UNKNOWN: Classification = Classification {
    message: "Unexpected error from Provider",
    http_status: 500,
    empty_result: false,
};

pub fn classify(code: i64) -> Classification {
    CLASSIFICATIONS
        .iter()
        .find(|(known, _)| *known == code)
        .map(|(_, classification)| *classification)
        .unwrap_or(UNKNOWN)
}
