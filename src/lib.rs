//! Web IRC client library.
//!
//! A sans-IO client core ([`client::Client`]) driven by a tokio WebSocket
//! backend loop ([`backend::run_backend`]). The UI talks to the backend over
//! crossbeam channels using [`protocol::BackendAction`] and
//! [`protocol::GuiEvent`].

pub mod backend;
pub mod buffer;
pub mod client;
pub mod commands;
pub mod config;
pub mod error;
pub mod events;
pub mod input_state;
pub mod logging;
pub mod notify;
pub mod parser;
pub mod protocol;
pub mod state;
pub mod validation;
