use std::future::{ready, Ready};

use actix_web::{dev::Payload, http::header, web, FromRequest, HttpRequest};
use log::{debug, error};

use crate::auth::{IdentityClaim, SessionAuthenticator};
use crate::errors::ApiError;

/// A verified caller. Taking this as a handler argument makes the route protected.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub IdentityClaim);

impl FromRequest for AuthenticatedUser {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let authenticator = match req.app_data::<web::Data<SessionAuthenticator>>() {
            Some(authenticator) => authenticator,
            None => {
                error!("SessionAuthenticator is not registered as app data");
                return ready(Err(ApiError::Internal));
            }
        };

        let header = req
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok());

        let result = match authenticator.authenticate(header) {
            Some(identity) => Ok(AuthenticatedUser(identity)),
            None => {
                debug!("Unauthenticated request to {}", req.path());
                Err(ApiError::Unauthorized)
            }
        };
        ready(result)
    }
}
