//! Playback sessions: from a swarm descriptor to a stream URL.
//!
//! A `PlaybackManager` drives each request through a `SwarmSession`
//! (join, metadata wait under a deadline, file selection, endpoint bind)
//! and tears the session down on every failure path.

mod manager;
mod selection;
mod session;
mod types;

pub use manager::PlaybackManager;
pub use selection::{select_playable_file, FileSelector, VideoFirst, VIDEO_EXTENSIONS};
pub use session::{EndpointBinding, SwarmSession};
pub use types::*;
