//! Physics bridge: rapier rigid bodies stepped at a fixed sub-step, with a
//! pose mirror the frame loop reads.
//!
//! # Invariants
//! - Collision half-extents are computed once at registration and never change.
//! - Colliders are world-axis boxes; orientation belongs to the owning entity.
//! - `step` never touches render transforms; syncing is the caller's job.

mod body;
mod world;

pub use body::{BodyHandle, BodyKind, BodyParams, RigidBody};
pub use world::{PhysicsConfig, PhysicsError, PhysicsWorld};
