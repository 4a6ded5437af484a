/// Backend submodules for the WebSocket connection
///
/// - `connection`: WebSocket establishment and frame decoding
/// - `framing`: inbound frames to protocol lines
/// - `manager`: connection lifecycle and reconnect policy
/// - `main_loop`: the event loop driving the client core
pub mod connection;
pub mod framing;
pub mod main_loop;
pub mod manager;

pub use main_loop::{run_backend, ConnectionState};
