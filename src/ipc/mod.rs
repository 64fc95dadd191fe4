//! IPC module for the presentation layer
//!
//! Frontends render mission state and forward clicks, resets and
//! transcripts over a local Unix socket.

mod protocol;
mod server;

pub use server::Server;
