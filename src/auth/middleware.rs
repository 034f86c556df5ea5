use actix_web::middleware::Next;
use actix_web::{
    Error, HttpMessage, ResponseError,
    body::BoxBody,
    dev::{ServiceRequest, ServiceResponse},
    web::Data,
};
use tracing::debug;

use crate::auth::jwt::{TokenType, verify_token};
use crate::config::Config;
use crate::error::AppError;
use crate::policy::Caller;
use crate::state::AppState;

fn reject(req: ServiceRequest, err: AppError) -> ServiceResponse<BoxBody> {
    req.into_response(err.error_response())
}

/// Verifies the bearer token and loads the caller's current role,
/// department and active flag, so changes apply without re-issuing tokens.
pub async fn auth_middleware(
    req: ServiceRequest,
    next: Next<BoxBody>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    let config = req
        .app_data::<Data<Config>>()
        .cloned()
        .ok_or_else(|| AppError::Internal("app config missing".into()))?;
    let state = req
        .app_data::<Data<AppState>>()
        .cloned()
        .ok_or_else(|| AppError::Internal("app state missing".into()))?;

    let header_value = match req.headers().get("Authorization") {
        Some(h) => match h.to_str() {
            Ok(value) => value.to_owned(),
            Err(_) => {
                let err = AppError::Unauthenticated("invalid Authorization header encoding".into());
                return Ok(reject(req, err));
            }
        },
        None => {
            let err = AppError::Unauthenticated("missing Authorization header".into());
            return Ok(reject(req, err));
        }
    };

    let Some(token) = header_value.strip_prefix("Bearer ") else {
        let err = AppError::Unauthenticated("Authorization header must start with Bearer".into());
        return Ok(reject(req, err));
    };

    let claims = match verify_token(token, &config.jwt_secret) {
        Ok(c) if c.token_type == TokenType::Access => c,
        Ok(_) => {
            let err = AppError::Unauthenticated("access token required".into());
            return Ok(reject(req, err));
        }
        Err(e) => {
            debug!(error = %e, "Token rejected");
            let err = AppError::Unauthenticated("invalid or expired token".into());
            return Ok(reject(req, err));
        }
    };

    let user = match state.identities.get_user(claims.user_id).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            let err = AppError::Unauthenticated("unknown user".into());
            return Ok(reject(req, err));
        }
        Err(e) => return Ok(reject(req, e.into())),
    };

    req.extensions_mut().insert(Caller::from(&user));

    next.call(req).await
}
