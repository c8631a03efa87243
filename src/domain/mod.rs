// Domain layer: entities, tier ports and the conversion glue between them.

pub mod convert;
pub mod model;
pub mod ports;
