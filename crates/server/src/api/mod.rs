pub mod error;
pub mod handlers;
pub mod middleware;
pub mod playback;
pub mod routes;
pub mod search;

pub use error::{ApiError, ErrorResponse};
pub use routes::create_router;
