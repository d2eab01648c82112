//! # Memory Management
//!
//! Pre-allocated storage for registry objects.
//!
//! The registry hands out typed handles instead of references so that
//! objects can be registered or removed while other code holds on to
//! identities collected earlier in the frame.

mod pool;

pub use pool::{Arena, Handle};
