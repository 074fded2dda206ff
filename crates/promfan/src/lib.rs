//! Top-level facade crate for promfan.
//!
//! Re-exports core types and the gateway library so users can depend on a single crate.

pub mod core {
    pub use promfan_core::*;
}

pub mod gateway {
    pub use promfan_gateway::*;
}
