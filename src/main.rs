use sqlx::postgres::PgPoolOptions;
use std::net::TcpListener;

use campus_share::configuration::get_configuration;
use campus_share::startup::{run, Collaborators};
use campus_share::telemetry::init_telemetry;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    // 구조화된 로깅 초기화
    init_telemetry("info");

    tracing::info!("Starting application");

    // 설정 로드
    let configuration = match get_configuration() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to read configuration: {}", e);
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "Configuration error",
            ));
        }
    };
    if let Err(e) = configuration.validate() {
        tracing::error!("Invalid configuration: {}", e);
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "Configuration error",
        ));
    }
    tracing::info!("Configuration loaded successfully");

    // 데이터베이스 연결 풀 생성
    let pool = PgPoolOptions::new()
        .max_connections(configuration.database.max_connections)
        .acquire_timeout(configuration.database.acquire_timeout())
        .connect(&configuration.database.connection_string())
        .await
        .map_err(|e| {
            tracing::error!("Failed to create connection pool: {}", e);
            std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "Database connection error",
            )
        })?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to run migrations: {}", e);
            std::io::Error::new(std::io::ErrorKind::Other, "Migration error")
        })?;

    tracing::info!("Database ready");

    // 서버 주소 설정
    let address = format!(
        "{}:{}",
        configuration.application.host, configuration.application.port
    );
    let listener = TcpListener::bind(&address)?;
    tracing::info!("Server listening on: {}", address);

    let server = run(listener, Collaborators::postgres(pool), configuration.jwt)?;
    server.await
}
