//! Health and status endpoints

mod handlers;
mod router;
mod state;

pub use router::create_router;
pub use state::AppState;
