//! Shared fixtures for integration tests: an in-memory SQLite database with
//! every migration applied, and services wired over it.

#![allow(dead_code)]

use std::sync::Arc;

use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;

use auth_service_lib::config::AuthServiceConfig;
use auth_service_lib::infra::{Migrator, Persistence, UnitOfWork};
use auth_service_lib::service::{IdentityManager, IdentityService, TokenIssuer};
use common::{DatabaseConfig, JwtConfig};
use domain::{ClientMetadata, WorkFactor};

pub const SECRET: &str = "integration-test-secret-with-32-plus-chars";

pub fn config() -> AuthServiceConfig {
    AuthServiceConfig {
        jwt: JwtConfig {
            secret: SECRET.to_string(),
            ..JwtConfig::default()
        },
        database: DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            min_connections: 1,
        },
        work_factor: WorkFactor::new(1024, 1, 1),
        host: "127.0.0.1".to_string(),
        port: 0,
    }
}

/// One pooled connection: every handle sees the same in-memory database.
pub async fn setup_db() -> DatabaseConnection {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);

    let db = Database::connect(options).await.expect("connect sqlite");
    Migrator::up(&db, None).await.expect("apply migrations");
    db
}

pub struct Harness {
    pub db: DatabaseConnection,
    pub uow: Arc<Persistence>,
    pub tokens: Arc<TokenIssuer>,
    pub service: IdentityManager<Persistence>,
}

pub async fn harness() -> Harness {
    let db = setup_db().await;
    let config = config();
    let uow = Arc::new(Persistence::new(db.clone()));
    let tokens = Arc::new(TokenIssuer::new(config.jwt.clone(), uow.sessions()));
    let service = IdentityManager::new(uow.clone(), tokens.clone(), config.work_factor)
        .expect("valid work factor");

    Harness {
        db,
        uow,
        tokens,
        service,
    }
}

impl Harness {
    /// Register and activate an account, returning its id.
    pub async fn active_account(&self, username: &str, password: &str, role: &str) -> uuid::Uuid {
        let account = self
            .service
            .register(username.to_string(), password.to_string(), role.to_string())
            .await
            .expect("register");
        self.service.activate(account.id).await.expect("activate");
        account.id
    }
}

pub fn client() -> ClientMetadata {
    ClientMetadata {
        ip_address: Some("203.0.113.9".to_string()),
        user_agent: Some("integration-test".to_string()),
    }
}

/// Make every credential insert fail inside SQLite.
pub async fn fail_credential_inserts(db: &DatabaseConnection) {
    db.execute_unprepared(
        "CREATE TRIGGER fail_credential_insert BEFORE INSERT ON credentials \
         BEGIN SELECT RAISE(ABORT, 'injected credential failure'); END;",
    )
    .await
    .expect("create trigger");
}
