pub mod answers;
pub mod auth;
pub mod cancel;
pub mod client;
pub mod community;
pub mod config;
pub mod editor;
pub mod error;
pub mod grading;
pub mod handlers;
pub mod question;
pub mod quiz;
pub mod routes;
pub mod state;

pub use error::{Result, SharpError};

use config::ServerConfig;

pub fn build_state(config: &ServerConfig) -> state::AppState {
    state::AppState::new(config.local_state_path.clone())
}
