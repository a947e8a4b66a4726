/// Middleware module
///
/// Custom middleware for authentication on the `/api` scope.

mod jwt_middleware;

pub use jwt_middleware::JwtMiddleware;
