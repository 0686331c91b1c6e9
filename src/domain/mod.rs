// Domain layer: records, addresses and the ports the adapters implement.

pub mod model;
pub mod ports;
