use crate::model::role::Actor;
use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload, error::ErrorUnauthorized};
use futures::future::{Ready, ready};

/// Handlers take the caller as an `Actor`; `auth_middleware` puts it in the
/// request extensions after the token checks out.
impl FromRequest for Actor {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        match req.extensions().get::<Actor>() {
            Some(actor) => ready(Ok(actor.clone())),
            None => ready(Err(ErrorUnauthorized("Missing token"))),
        }
    }
}
