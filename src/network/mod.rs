//! TCP/TLS accept loop and per-connection tasks.

pub mod connection;
mod gateway;

pub use gateway::{Gateway, GatewayError};
