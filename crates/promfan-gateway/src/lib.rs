//! promfan gateway library entry.
//!
//! Wires the worker transport, the request correlator, and the HTTP surface
//! into one gateway. It is consumed by the binary (`main.rs`) and by
//! integration tests.

pub mod app_state;
pub mod config;
pub mod correlator;
pub mod obs;
pub mod ops;
pub mod router;
pub mod scrape;
pub mod transport;
pub mod workers;
