// Frameworks layer: environment config, runtime bootstrap and session wiring.

pub mod config;
pub mod runtime;
pub mod session;
