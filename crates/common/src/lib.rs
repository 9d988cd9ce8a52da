//! Shared types used by every glade crate.

mod types;

pub use types::{Aabb, EntityId, Transform};
