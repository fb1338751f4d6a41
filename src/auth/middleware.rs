use crate::auth::jwt::verify_access_token;
use crate::config::Config;
use crate::model::role::{Actor, Role};
use actix_web::http::header::{AUTHORIZATION, HeaderMap};
use actix_web::middleware::Next;
use actix_web::{
    Error, HttpMessage, HttpResponse,
    body::BoxBody,
    dev::{ServiceRequest, ServiceResponse},
    web::Data,
};
use serde_json::json;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum AuthRejection {
    #[error("Missing Authorization header")]
    MissingHeader,
    #[error("Invalid Authorization header encoding")]
    BadEncoding,
    #[error("Authorization header must start with Bearer")]
    NotBearer,
    #[error("Invalid or expired token: {0}")]
    InvalidToken(String),
    #[error("Token carries unknown role {0}")]
    UnknownRole(u8),
}

impl AuthRejection {
    fn response(&self) -> HttpResponse {
        HttpResponse::Unauthorized().json(json!({
            "error": "unauthorized",
            "message": self.to_string(),
        }))
    }
}

/// Turns the bearer token into the payroll caller. The approval tier comes
/// from the verified role claim, nothing else in the request can raise it.
pub fn authenticate(headers: &HeaderMap, secret: &str) -> Result<Actor, AuthRejection> {
    let header = headers
        .get(AUTHORIZATION)
        .ok_or(AuthRejection::MissingHeader)?
        .to_str()
        .map_err(|_| AuthRejection::BadEncoding)?;
    let token = header
        .strip_prefix("Bearer ")
        .ok_or(AuthRejection::NotBearer)?;

    let claims = verify_access_token(token, secret).map_err(AuthRejection::InvalidToken)?;
    let role = Role::from_id(claims.role).ok_or(AuthRejection::UnknownRole(claims.role))?;

    Ok(Actor::new(claims.user_id, claims.sub, role.approval_tier()))
}

pub async fn auth_middleware(
    req: ServiceRequest,
    next: Next<BoxBody>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    let config = req
        .app_data::<Data<Config>>()
        .ok_or_else(|| actix_web::error::ErrorInternalServerError("App config missing"))?;

    match authenticate(req.headers(), &config.jwt_secret) {
        Ok(actor) => {
            tracing::debug!(
                user_id = actor.user_id,
                username = %actor.username,
                tier = ?actor.tier,
                path = req.path(),
                "Payroll caller authenticated"
            );
            req.extensions_mut().insert(actor);
            next.call(req).await
        }
        Err(rejection) => {
            tracing::debug!(reason = %rejection, path = req.path(), "Request refused at authentication");
            let resp = rejection.response();
            Ok(req.into_response(resp.map_into_boxed_body()))
        }
    }
}
