//! Services layer (ports + adapters).
//!
//! - `ports`: collaborator contracts and the data they exchange (kernel-facing).
//! - `adapters`: OS/runtime specific implementations (IO/async).

pub mod adapters;
pub mod ports;
