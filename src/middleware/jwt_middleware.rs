/// JWT Authentication Middleware
///
/// Validates the bearer access token from the Authorization header and
/// injects its claims into request extensions for the route handlers.

use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error, HttpMessage, ResponseError,
};
use futures::future::LocalBoxFuture;
use std::rc::Rc;

use crate::auth::validate_access_token;
use crate::configuration::JwtSettings;
use crate::error::{AppError, AuthError};

/// JWT middleware for protecting routes
pub struct JwtMiddleware {
    jwt_config: JwtSettings,
}

impl JwtMiddleware {
    pub fn new(jwt_config: JwtSettings) -> Self {
        Self { jwt_config }
    }
}

impl<S, B> Transform<S, ServiceRequest> for JwtMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = JwtMiddlewareService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(JwtMiddlewareService {
            service: Rc::new(service),
            jwt_config: self.jwt_config.clone(),
        }))
    }
}

pub struct JwtMiddlewareService<S> {
    service: Rc<S>,
    jwt_config: JwtSettings,
}

fn bearer_token(req: &ServiceRequest) -> Option<String> {
    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
}

impl<S, B> Service<ServiceRequest> for JwtMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let claims = match bearer_token(&req) {
            None => Err(AppError::Auth(AuthError::MissingToken)),
            Some(token) => validate_access_token(&token, &self.jwt_config),
        };

        match claims {
            Ok(claims) => {
                tracing::debug!(user_id = %claims.sub, "JWT validated successfully");
                req.extensions_mut().insert(claims);

                let service = self.service.clone();
                Box::pin(async move {
                    let res = service.call(req).await?;
                    Ok(res.map_into_left_body())
                })
            }
            Err(e) => {
                let response = e.error_response();
                Box::pin(async move { Ok(req.into_response(response).map_into_right_body()) })
            }
        }
    }
}
