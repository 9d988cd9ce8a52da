//! Input: held movement keys and the channel that feeds them to the frame loop.
//!
//! # Invariants
//! - `InputState` is only mutated by draining the channel, never during the
//!   update pass, so every entity sees the same snapshot within a frame.
//! - Listeners are scoped: dropping a `Subscription` unregisters it.

pub mod channel;
pub mod keys;

pub use channel::{InputChannel, InputSender, InputSnapshot, Subscription};
pub use keys::{InputEvent, InputState, KeyBindings, MoveKey};
