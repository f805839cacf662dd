pub mod auth_handlers;
pub mod cookies;
pub mod editor_handlers;
pub mod json;
pub mod pages;
pub mod render;
pub mod server;

pub use server::{AppState, build_app_router, run_api};
