//! Integration tests for the health endpoint

use std::net::TcpListener;
use std::sync::Arc;

use campus_share::configuration::JwtSettings;
use campus_share::startup::{run, Collaborators};
use campus_share::tokens::{InMemoryTokenStore, OsRngTokenGenerator};
use campus_share::users::InMemoryUserDirectory;

fn spawn_app() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    let collaborators = Collaborators {
        tokens: Arc::new(InMemoryTokenStore::new()),
        users: Arc::new(InMemoryUserDirectory::new()),
        generator: Arc::new(OsRngTokenGenerator),
    };
    let jwt = JwtSettings {
        secret: "integration-secret-key-at-least-32-chars".to_string(),
        access_token_expiry: 900,
        refresh_token_expiry: 604800,
        issuer: "campus_share-test".to_string(),
    };
    let server = run(listener, collaborators, jwt).expect("Failed to create server");

    let _ = tokio::spawn(server);

    format!("http://127.0.0.1:{}", port)
}

#[tokio::test]
async fn health_check_works() {
    let addr = spawn_app();

    let response = reqwest::Client::new()
        .get(&format!("{}/health_check", addr))
        .send()
        .await
        .expect("Failed to execute request");

    assert!(response.status().is_success());
    assert!(response.text().await.unwrap().is_empty());
}

#[tokio::test]
async fn protected_route_requires_a_token() {
    let addr = spawn_app();

    let response = reqwest::Client::new()
        .get(&format!("{}/api/me", addr))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(401, response.status().as_u16());
}
