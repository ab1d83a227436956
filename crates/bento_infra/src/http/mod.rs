pub mod keepalive;

pub use keepalive::{KEEPALIVE_BODY, KeepAliveState};
