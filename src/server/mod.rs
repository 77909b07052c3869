pub mod dto;
mod projects;
pub mod public;
pub mod response;
mod router;
mod tokens;

pub use public::PUBLIC_ROW_CAP;
pub use router::{AppState, create_router};
