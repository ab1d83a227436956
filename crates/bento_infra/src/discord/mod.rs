//! Discord adapters: REST operations and the gateway event stream.

pub mod gateway;
pub mod model;
pub mod rest;

pub use gateway::GatewayClient;
pub use rest::DiscordRest;
