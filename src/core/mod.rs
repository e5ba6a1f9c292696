//! Core module - configuration, state and the HTTP server

pub mod config;
pub mod server;
pub mod state;

pub use config::Config;
pub use server::Server;
pub use state::ServerState;

use crate::utils::logger;

/// Set up the process environment: load `.env`, then initialize logging
/// from the resulting environment variables.
pub fn setup_environment() {
    dotenv::dotenv().ok();

    let log_level = std::env::var("LOG_LEVEL").ok();
    let log_dir = std::env::var("LOG_DIR").ok();
    logger::init_logger_with_file(log_level.as_deref(), log_dir.as_deref());
}
