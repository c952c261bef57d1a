// Domain layer: core models, ports (interfaces) and the pure classification rules.

pub mod model;
pub mod ports;

pub mod services;
