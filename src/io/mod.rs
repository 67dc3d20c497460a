//! Input/output helpers.
//!
//! - storage root, atomic CSV writes and validated reads (`store`)

pub mod store;

pub use store::*;
