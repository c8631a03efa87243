pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod provider;
pub mod utils;

pub use app::Gateway;
pub use config::GatewayConfig;
pub use crate::core::{AreaResolver, RequestContext, ShippingService, TrackingResolver};
pub use utils::error::{GatewayError, Result};
