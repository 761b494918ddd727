//! Tracking store: one row per tracked external id and media kind.
//!
//! - `model`: table layouts and listing options.
//! - `repo`: SQL-only functions that map rows into [`crate::model::TrackedRecord`].

pub mod model;
pub mod repo;

pub use model::{ListOrder, OrderColumn};
pub use repo::*;
