pub mod area;
pub mod cascade;
pub mod context;
pub mod rate_quote;
pub mod staleness;
pub mod tracking;

pub use area::AreaResolver;
pub use cascade::{Cascade, Resolution, ResolutionPolicy, StoreVerdict, Tier};
pub use context::RequestContext;
pub use rate_quote::ShippingService;
pub use staleness::TrackingState;
pub use tracking::TrackingResolver;
pub use crate::utils::error::Result;
