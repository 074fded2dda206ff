//! Worker transport (WebSocket).
//!
//! Workers connect to `/v1/workers?app=<name>`, receive snapshot requests on
//! that socket, and answer on the same socket.

pub mod codec;
pub mod ws;
