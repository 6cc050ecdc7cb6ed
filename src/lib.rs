pub mod cli;
pub mod config;
pub mod defaults;
pub mod dispatch;
pub mod error;
pub mod forward;
pub mod framed;
pub mod metrics;
pub mod mux;
pub mod session;
pub mod wire;
