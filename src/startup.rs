use actix_web::dev::Server;
use actix_web::{middleware::Logger, web, App, HttpServer};
use sqlx::PgPool;
use std::net::TcpListener;
use std::sync::Arc;

use crate::auth::JwtIssuer;
use crate::configuration::JwtSettings;
use crate::logger::LoggerMiddleware;
use crate::middleware::JwtMiddleware;
use crate::routes::{
    get_current_user, health_check, login, logout, logout_all, refresh, refresh_payload_error,
};
use crate::tokens::{OsRngTokenGenerator, PgTokenStore, TokenGenerator, TokenRecordStore, TokenService};
use crate::users::{PgUserDirectory, UserDirectory};

/// Storage-facing collaborators of the session service
#[derive(Clone)]
pub struct Collaborators {
    pub tokens: Arc<dyn TokenRecordStore>,
    pub users: Arc<dyn UserDirectory>,
    pub generator: Arc<dyn TokenGenerator>,
}

impl Collaborators {
    /// Postgres-backed stores and OS randomness.
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            tokens: Arc::new(PgTokenStore::new(pool.clone())),
            users: Arc::new(PgUserDirectory::new(pool)),
            generator: Arc::new(OsRngTokenGenerator),
        }
    }
}

pub fn run(
    listener: TcpListener,
    collaborators: Collaborators,
    jwt_config: JwtSettings,
) -> Result<Server, std::io::Error> {
    let token_service = web::Data::new(TokenService::new(
        collaborators.tokens,
        collaborators.users.clone(),
        Arc::new(JwtIssuer::new(jwt_config.clone())),
        collaborators.generator,
        jwt_config.refresh_lifetime(),
    ));
    let users = web::Data::from(collaborators.users);

    let server = HttpServer::new(move || {
        App::new()
            // Global middleware
            .wrap(Logger::default())
            .wrap(LoggerMiddleware)

            // Shared state
            .app_data(token_service.clone())
            .app_data(users.clone())

            // Public routes
            .route("/health_check", web::get().to(health_check))
            .route("/login", web::post().to(login))
            .service(
                web::resource("/refresh")
                    .app_data(web::JsonConfig::default().error_handler(refresh_payload_error))
                    .route(web::post().to(refresh)),
            )
            .route("/logout", web::post().to(logout))

            // Protected routes (require JWT authentication)
            .service(
                web::scope("/api")
                    .wrap(JwtMiddleware::new(jwt_config.clone()))
                    .route("/me", web::get().to(get_current_user))
                    .route("/logout-all", web::post().to(logout_all)),
            )
    })
    .listen(listener)?
    .run();

    Ok(server)
}
