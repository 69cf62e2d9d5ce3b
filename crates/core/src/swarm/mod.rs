//! Peer-to-peer swarm engine abstraction.
//!
//! Provides the `SwarmEngine` / `SwarmHandle` traits the playback layer is
//! written against, with an embedded librqbit implementation.

mod librqbit;
mod types;

pub use self::librqbit::LibrqbitEngine;
pub use types::*;
