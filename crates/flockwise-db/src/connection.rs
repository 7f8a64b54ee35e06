//! Opening the Flockwise store.
//!
//! The server talks to a standalone SurrealDB over WebSocket and signs in
//! as root. [`DbManager::open`] also brings the schema up to date, so a
//! handle obtained from it is always safe to hand to the repositories.

use surrealdb::Surreal;
use surrealdb::engine::remote::ws::{Client, Ws};
use surrealdb::opt::auth::Root;
use tracing::info;

use crate::error::DbError;
use crate::schema::run_migrations;

#[derive(Debug, Clone)]
pub struct DbConfig {
    /// `host:port` of the SurrealDB WebSocket endpoint.
    pub url: String,
    pub namespace: String,
    pub database: String,
    pub username: String,
    pub password: String,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: "127.0.0.1:8000".into(),
            namespace: "flockwise".into(),
            database: "farm".into(),
            username: "root".into(),
            password: "root".into(),
        }
    }
}

impl DbConfig {
    /// `namespace/database`, for log lines.
    pub fn target(&self) -> String {
        format!("{}/{}", self.namespace, self.database)
    }
}

#[derive(Clone)]
pub struct DbManager {
    db: Surreal<Client>,
}

impl DbManager {
    /// Sign in and select the configured namespace and database.
    pub async fn connect(config: &DbConfig) -> Result<Self, DbError> {
        let unreachable = |source| DbError::Connection {
            url: config.url.clone(),
            source,
        };

        let db = Surreal::new::<Ws>(&config.url).await.map_err(unreachable)?;
        db.signin(Root {
            username: config.username.clone(),
            password: config.password.clone(),
        })
        .await
        .map_err(unreachable)?;
        db.use_ns(&config.namespace)
            .use_db(&config.database)
            .await
            .map_err(unreachable)?;

        info!(url = %config.url, target = %config.target(), "Connected to SurrealDB");
        Ok(Self { db })
    }

    /// [`connect`](Self::connect), then apply pending migrations.
    pub async fn open(config: &DbConfig) -> Result<Self, DbError> {
        let manager = Self::connect(config).await?;
        run_migrations(&manager.db).await?;
        Ok(manager)
    }

    pub fn client(&self) -> &Surreal<Client> {
        &self.db
    }
}
