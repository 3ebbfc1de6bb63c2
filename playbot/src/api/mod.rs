//! HTTP command surface
//!
//! REST endpoints for session and playlist commands, plus an SSE stream of
//! playbot events.

pub mod handlers;
pub mod server;
pub mod sse;

pub use server::{create_router, run, AppContext};
