//! # parlance-server
//!
//! axum host for `parlance_core::LanguageService`. The binary (`parlance`)
//! reads settings from the environment and serves [`build_router`].

pub mod routes;
pub mod settings;
pub mod state;

pub use settings::ServerSettings;
pub use state::AppState;

pub fn build_router(state: AppState) -> axum::Router {
    routes::router(state)
}
