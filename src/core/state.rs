//! Server State
//!
//! [`ServerState`] holds the shared handles every handler needs: the
//! configuration, the embedded database and the JWT service. It is cloned
//! into each request; all fields are cheap shared handles.

use std::sync::Arc;

use surrealdb::Surreal;
use surrealdb::engine::local::Db;

use crate::auth::JwtService;
use crate::core::Config;
use crate::db;
use crate::utils::AppError;

/// Shared application state
#[derive(Clone)]
pub struct ServerState {
    /// Server configuration (immutable)
    pub config: Config,
    /// Embedded database (SurrealDB)
    pub db: Surreal<Db>,
    /// JWT validation service
    pub jwt_service: Arc<JwtService>,
}

impl ServerState {
    /// Initialize the server state: work directory, database and services.
    pub async fn initialize(config: &Config) -> Result<Self, AppError> {
        config
            .ensure_work_dir_structure()
            .map_err(|e| AppError::internal(format!("Failed to create work directory: {e}")))?;

        let db_path = config.database_dir().join("tillbook.db");
        let db = db::connect_rocksdb(&db_path).await?;

        let jwt_service = Arc::new(JwtService::with_config(config.jwt.clone()));

        Ok(Self {
            config: config.clone(),
            db,
            jwt_service,
        })
    }

    /// State backed by an in-memory database, for tests.
    pub async fn for_tests() -> Result<Self, AppError> {
        let db = db::connect_memory().await?;
        Ok(Self {
            config: Config::with_overrides(std::env::temp_dir().display().to_string(), 0),
            db,
            jwt_service: Arc::new(JwtService::default()),
        })
    }

    pub fn get_db(&self) -> Surreal<Db> {
        self.db.clone()
    }

    pub fn get_jwt_service(&self) -> Arc<JwtService> {
        self.jwt_service.clone()
    }
}
