mod admin;
pub mod dto;
mod passes;
pub mod response;
mod router;

pub use admin::admin_router;
pub use passes::pass_router;
pub use router::{AppState, create_router};
