//! gRPC implementation for AuthService.

use std::sync::Arc;

use chrono::Utc;
use tonic::{Request, Response, Status};
use tracing::warn;
use uuid::Uuid;

use super::cookies::{
    append_set_cookies, call_metadata, clear_cookie, expiring_token_cookie, token_cookie,
};
use crate::gate::{CallMetadata, Operation, Pipeline, RequestContext};
use crate::service::IdentityService;
use common::AppError;
use domain::{
    ACCESS_TOKEN_COOKIE, ACCESS_TOKEN_COOKIE_PATH, REFRESH_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE_PATH,
};
use proto::auth::{
    auth_service_server::AuthService as AuthServiceProto, ActivateRequest, ActivateResponse,
    ChangePasswordRequest, ChangePasswordResponse, LoginRequest, LoginResponse, LogoutRequest,
    LogoutResponse, RefreshRequest, RefreshResponse, RegisterRequest, RegisterResponse,
};

/// gRPC service wrapper for IdentityService.
///
/// Every call is admitted through the pipeline before its handler runs.
pub struct AuthGrpcService {
    service: Arc<dyn IdentityService>,
    pipeline: Pipeline,
}

impl AuthGrpcService {
    pub fn new(service: Arc<dyn IdentityService>, pipeline: Pipeline) -> Self {
        Self { service, pipeline }
    }

    fn admit<T>(&self, method: &str, request: &Request<T>) -> Result<(RequestContext, CallMetadata), Status> {
        let metadata = call_metadata(request.metadata(), request.remote_addr());
        let ctx = self.pipeline.admit(Operation::auth(method), &metadata)?;
        Ok((ctx, metadata))
    }

    async fn revoke_session(&self, request: Request<LogoutRequest>) -> Result<(), Status> {
        let (_ctx, metadata) = self.admit("Logout", &request)?;
        let body = request.into_inner();

        let token = if body.refresh_token.is_empty() {
            metadata.cookie(REFRESH_TOKEN_COOKIE).unwrap_or_default().to_string()
        } else {
            body.refresh_token
        };

        self.service.logout(token).await.map_err(Status::from)
    }
}

fn parse_account_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::validation("account_id must be a UUID"))
}

fn clearing_cookies() -> [String; 2] {
    [
        clear_cookie(ACCESS_TOKEN_COOKIE, ACCESS_TOKEN_COOKIE_PATH),
        clear_cookie(REFRESH_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE_PATH),
    ]
}

#[tonic::async_trait]
impl AuthServiceProto for AuthGrpcService {
    async fn register(
        &self,
        request: Request<RegisterRequest>,
    ) -> Result<Response<RegisterResponse>, Status> {
        self.admit("Register", &request)?;
        let req = request.into_inner();

        let account = self
            .service
            .register(req.username, req.password, req.role)
            .await
            .map_err(Status::from)?;

        Ok(Response::new(RegisterResponse {
            account_id: account.id.to_string(),
        }))
    }

    async fn activate(
        &self,
        request: Request<ActivateRequest>,
    ) -> Result<Response<ActivateResponse>, Status> {
        self.admit("Activate", &request)?;
        let account_id = parse_account_id(&request.into_inner().account_id)?;

        self.service
            .activate(account_id)
            .await
            .map_err(Status::from)?;

        Ok(Response::new(ActivateResponse {}))
    }

    async fn login(
        &self,
        request: Request<LoginRequest>,
    ) -> Result<Response<LoginResponse>, Status> {
        let (ctx, _) = self.admit("Login", &request)?;
        let req = request.into_inner();

        let outcome = self
            .service
            .login(req.username, req.password, ctx.client().clone())
            .await
            .map_err(Status::from)?;

        let mut response = Response::new(LoginResponse {
            account_id: outcome.account.id.to_string(),
        });
        append_set_cookies(
            response.metadata_mut(),
            [
                token_cookie(
                    ACCESS_TOKEN_COOKIE,
                    &outcome.tokens.access_token,
                    ACCESS_TOKEN_COOKIE_PATH,
                ),
                expiring_token_cookie(
                    REFRESH_TOKEN_COOKIE,
                    &outcome.tokens.refresh_token,
                    REFRESH_TOKEN_COOKIE_PATH,
                    outcome.tokens.refresh_expires_at - Utc::now(),
                ),
            ],
        )?;

        Ok(response)
    }

    async fn refresh(
        &self,
        request: Request<RefreshRequest>,
    ) -> Result<Response<RefreshResponse>, Status> {
        let (_, metadata) = self.admit("Refresh", &request)?;
        let body = request.into_inner();

        let token = if body.refresh_token.is_empty() {
            metadata.cookie(REFRESH_TOKEN_COOKIE).unwrap_or_default().to_string()
        } else {
            body.refresh_token
        };

        let outcome = self.service.refresh(token).await.map_err(Status::from)?;

        let mut response = Response::new(RefreshResponse {
            account_id: outcome.account.id.to_string(),
        });
        append_set_cookies(
            response.metadata_mut(),
            [token_cookie(
                ACCESS_TOKEN_COOKIE,
                &outcome.access_token,
                ACCESS_TOKEN_COOKIE_PATH,
            )],
        )?;

        Ok(response)
    }

    async fn logout(
        &self,
        request: Request<LogoutRequest>,
    ) -> Result<Response<LogoutResponse>, Status> {
        // Cookies are cleared whatever the outcome
        match self.revoke_session(request).await {
            Ok(()) => {
                let mut response = Response::new(LogoutResponse {});
                append_set_cookies(response.metadata_mut(), clearing_cookies())?;
                Ok(response)
            }
            Err(mut status) => {
                if let Err(e) = append_set_cookies(status.metadata_mut(), clearing_cookies()) {
                    warn!("Failed to attach clearing cookies: {}", e);
                }
                Err(status)
            }
        }
    }

    async fn change_password(
        &self,
        request: Request<ChangePasswordRequest>,
    ) -> Result<Response<ChangePasswordResponse>, Status> {
        let (ctx, _) = self.admit("ChangePassword", &request)?;
        let account_id = ctx
            .identity()
            .map(|identity| identity.account_id)
            .ok_or(AppError::Unauthenticated)?;
        let req = request.into_inner();

        self.service
            .change_password(account_id, req.current_password, req.new_password)
            .await
            .map_err(Status::from)?;

        Ok(Response::new(ChangePasswordResponse {}))
    }
}
