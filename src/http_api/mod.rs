pub mod auth;
pub mod server;

pub use server::{build_router, ApiState};
