use chrono::{DateTime, Utc};

/// Per-request values threaded through every tier call: the trace id stamped
/// on each log line and the instant the request was received, which is the
/// clock all staleness decisions are made against.
#[derive(Debug, Clone)]
pub struct RequestContext {
    trace_id: String,
    now: DateTime<Utc>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::with_trace_id(generate_trace_id())
    }

    pub fn with_trace_id(trace_id: impl Into<String>) -> Self {
        Self {
            trace_id: trace_id.into(),
            now: Utc::now(),
        }
    }

    /// Pin the request clock.
    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Upper-hex nanosecond timestamp, the same shape callers see in the
/// `X-Trace-ID` header.
pub fn generate_trace_id() -> String {
    format!("{:X}", Utc::now().timestamp_nanos_opt().unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_trace_id_is_hex() {
        let id = generate_trace_id();
        assert!(!id.is_empty());
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_pinned_clock() {
        let now = DateTime::parse_from_rfc3339("2024-05-01T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let ctx = RequestContext::with_trace_id("abc").at(now);
        assert_eq!(ctx.trace_id(), "abc");
        assert_eq!(ctx.now(), now);
    }
}
