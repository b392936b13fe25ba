//! Auth Service Library
//!
//! Account registration and activation, credential verification, dual-token
//! issuance and refresh-session revocation over gRPC. Every call passes an
//! authentication and authorization pipeline before reaching its handler.

pub mod config;
pub mod gate;
pub mod grpc;
pub mod infra;
pub mod repository;
pub mod service;

use std::net::SocketAddr;
use std::sync::Arc;

use tonic::transport::Server;
use tracing::info;

use crate::config::AuthServiceConfig;
use crate::gate::{AuthenticationGate, AuthorizationGate, Pipeline, RolePolicy};
use crate::grpc::AuthGrpcService;
use crate::infra::{Database, Persistence, UnitOfWork};
use crate::service::{IdentityManager, TokenIssuer};

/// Run the auth service with configuration from the environment.
///
/// `host` and `port` override the configured listen address when given.
pub async fn run_embedded(
    host: Option<String>,
    port: Option<u16>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AuthServiceConfig::from_env()?;
    if let Some(host) = host {
        config.host = host;
    }
    if let Some(port) = port {
        config.port = port;
    }
    run_server_with_config(config).await
}

/// Run migrations (for CLI commands).
pub async fn run_migrations(action: MigrateAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = AuthServiceConfig::from_env()?;
    let db = Database::connect_without_migrations(&config.database).await?;

    match action {
        MigrateAction::Up => {
            db.run_migrations().await?;
            info!("Migrations applied successfully");
        }
        MigrateAction::Down => {
            db.rollback_migration().await?;
            info!("Rolled back last migration");
        }
        MigrateAction::Status => {
            let status = db.migration_status().await?;
            for (name, applied) in status {
                let marker = if applied { "[x]" } else { "[ ]" };
                println!("{} {}", marker, name);
            }
        }
        MigrateAction::Fresh => {
            db.fresh_migrations().await?;
            info!("Database reset and migrations applied");
        }
    }

    Ok(())
}

/// Migration action type.
#[derive(Debug, Clone, Copy)]
pub enum MigrateAction {
    Up,
    Down,
    Status,
    Fresh,
}

/// Wire persistence, services and gates into a gRPC service.
pub fn build_grpc_service(
    db: sea_orm::DatabaseConnection,
    config: &AuthServiceConfig,
    policy: RolePolicy,
) -> Result<AuthGrpcService, common::AppError> {
    let uow = Arc::new(Persistence::new(db));
    let tokens = Arc::new(TokenIssuer::new(config.jwt.clone(), uow.sessions()));
    let identity = Arc::new(IdentityManager::new(uow, tokens.clone(), config.work_factor)?);

    let pipeline = Pipeline::new()
        .stage(AuthenticationGate::new(tokens))
        .stage(AuthorizationGate::new(policy));

    Ok(AuthGrpcService::new(identity, pipeline))
}

/// Run the gRPC server with the given configuration.
pub async fn run_server_with_config(
    config: AuthServiceConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::connect(&config.database).await?;
    db.ping().await?;

    let grpc_service = build_grpc_service(db.get_connection(), &config, RolePolicy::new())?;

    let addr: SocketAddr = config.server_addr().parse()?;
    info!("Auth service listening on {}", addr);

    Server::builder()
        .add_service(proto::AuthServiceServer::new(grpc_service))
        .serve_with_shutdown(addr, shutdown_signal())
        .await?;

    info!("Auth service stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
