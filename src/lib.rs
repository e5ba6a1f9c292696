//! Tillbook Server - bookkeeping backend for small shops
//!
//! # Architecture overview
//!
//! - **HTTP API** (`api`): axum routes for products, sales and health
//! - **Database** (`db`): embedded SurrealDB storage and repositories
//! - **Auth** (`auth`): JWT bearer validation, owner identity
//!
//! The heart of the system is the sale transaction in
//! [`db::repository::SaleRepository`]: stock reservation, line costing and
//! the sale record commit happen in one atomic unit of work.
//!
//! # Module structure
//!
//! ```text
//! src/
//! ├── core/          # config, state, server
//! ├── auth/          # JWT validation, current user
//! ├── api/           # HTTP routes and handlers
//! ├── db/            # models and repositories
//! └── utils/         # errors, logging
//! ```

pub mod api;
pub mod auth;
pub mod core;
pub mod db;
pub mod utils;

// Re-export common types
pub use auth::{CurrentUser, JwtService};
pub use core::{Config, Server, ServerState, setup_environment};
pub use utils::{AppError, AppResult};

// Re-export logger functions
pub use utils::logger::init_logger_with_file;
