//! HTTP surface of the report viewer.

mod error;
mod handlers;
pub mod server;

pub use server::{serve, AppState, ServerConfig};
