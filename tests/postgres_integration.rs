use chrono::{Duration, Utc};
use serde_json::{json, Value};
use sqlx::{Connection, Executor, PgConnection, PgPool};
use std::net::TcpListener;
use uuid::Uuid;

use campus_share::configuration::{get_configuration, DatabaseSettings};
use campus_share::error::{AppError, DatabaseError};
use campus_share::startup::{run, Collaborators};
use campus_share::tokens::{
    hash_token, PgTokenStore, RefreshTokenRecord, RotationOutcome, TokenRecordStore,
    REASON_REUSE_DETECTED, REASON_ROTATED,
};
use campus_share::users::{PgUserDirectory, UserDirectory};

const EMAIL: &str = "student@campus.edu";
const PASSWORD: &str = "SecurePass123";

pub struct TestApp {
    pub address: String,
    pub db_pool: PgPool,
    pub store: PgTokenStore,
    pub user_id: Uuid,
    pub client: reqwest::Client,
}

impl TestApp {
    async fn post_json(&self, path: &str, body: &Value) -> reqwest::Response {
        self.client
            .post(&format!("{}{}", &self.address, path))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    async fn login(&self) -> String {
        let response = self
            .post_json("/login", &json!({"Email": EMAIL, "Password": PASSWORD}))
            .await;
        assert_eq!(200, response.status().as_u16());
        let body: Value = response.json().await.expect("Failed to parse response");
        body["refreshToken"].as_str().unwrap().to_string()
    }

    async fn refresh(&self, refresh_token: &str) -> reqwest::Response {
        self.post_json("/refresh", &json!({"RefreshToken": refresh_token}))
            .await
    }

    async fn record_for(&self, refresh_token: &str) -> RefreshTokenRecord {
        self.store
            .find_by_token_hash(&hash_token(refresh_token))
            .await
            .expect("Failed to query refresh_tokens")
            .expect("token was issued")
    }

    async fn family_of(&self, refresh_token: &str) -> Vec<RefreshTokenRecord> {
        let record = self.record_for(refresh_token).await;
        self.store
            .find_family(record.token_family, record.user_id)
            .await
            .expect("Failed to query refresh_tokens")
    }
}

async fn spawn_app() -> TestApp {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    let mut configuration = get_configuration().expect("Failed to read configuration.");
    configuration.database.database_name = Uuid::new_v4().to_string();
    let connection_pool = configure_database(&configuration.database).await;
    let user_id = seed_user(&connection_pool).await;

    let server = run(
        listener,
        Collaborators::postgres(connection_pool.clone()),
        configuration.jwt.clone(),
    )
    .expect("Failed to bind address");
    let _ = tokio::spawn(server);

    TestApp {
        address,
        store: PgTokenStore::new(connection_pool.clone()),
        db_pool: connection_pool,
        user_id,
        client: reqwest::Client::new(),
    }
}

pub async fn configure_database(config: &DatabaseSettings) -> PgPool {
    // Create database
    let mut connection = PgConnection::connect(&config.connection_string_without_db())
        .await
        .expect("Failed to connect to Postgres");
    connection
        .execute(&*format!(r#"CREATE DATABASE "{}";"#, config.database_name))
        .await
        .expect("Failed to create database.");
    // Migrate database
    let connection_pool = PgPool::connect(&config.connection_string())
        .await
        .expect("Failed to connect to Postgres.");
    sqlx::migrate!("./migrations")
        .run(&connection_pool)
        .await
        .expect("Failed to migrate the database.");
    connection_pool
}

async fn seed_user(pool: &PgPool) -> Uuid {
    let user_id = Uuid::new_v4();
    let password_hash = bcrypt::hash(PASSWORD, 4).expect("Failed to hash password");

    sqlx::query("INSERT INTO users (id, email, password_hash) VALUES ($1, $2, $3)")
        .bind(user_id)
        .bind(EMAIL)
        .bind(password_hash)
        .execute(pool)
        .await
        .expect("Failed to insert user");

    for role in ["student", "moderator"] {
        sqlx::query("INSERT INTO user_roles (user_id, role) VALUES ($1, $2)")
            .bind(user_id)
            .bind(role)
            .execute(pool)
            .await
            .expect("Failed to insert role");
    }

    user_id
}

// --- Session flows over Postgres ---

#[tokio::test]
async fn refresh_links_parent_and_child_rows() {
    let app = spawn_app().await;
    let t0 = app.login().await;

    let response = app.refresh(&t0).await;
    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    let t1 = body["refreshToken"].as_str().unwrap().to_string();

    let parent = app.record_for(&t0).await;
    let child = app.record_for(&t1).await;
    assert!(parent.is_revoked);
    assert!(parent.revoked_at.is_some());
    assert_eq!(parent.reason_revoked.as_deref(), Some(REASON_ROTATED));
    assert_eq!(parent.replaced_by_token_id, Some(child.id));
    assert_eq!(child.parent_token_id, Some(parent.id));
    assert_eq!(child.token_family, parent.token_family);
    assert_eq!(child.user_id, app.user_id);
    assert!(!child.is_revoked);

    let stored_plaintext: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM refresh_tokens WHERE token_hash = $1 OR token_hash = $2")
            .bind(&t0)
            .bind(&t1)
            .fetch_one(&app.db_pool)
            .await
            .unwrap();
    assert_eq!(stored_plaintext, 0);
}

#[tokio::test]
async fn replaying_a_rotated_token_revokes_the_family() {
    let app = spawn_app().await;
    let t0 = app.login().await;
    let body: Value = app.refresh(&t0).await.json().await.unwrap();
    let t1 = body["refreshToken"].as_str().unwrap().to_string();

    assert_eq!(401, app.refresh(&t0).await.status().as_u16());

    assert_eq!(
        app.record_for(&t0).await.reason_revoked.as_deref(),
        Some(REASON_ROTATED)
    );
    let t1_record = app.record_for(&t1).await;
    assert!(t1_record.is_revoked);
    assert_eq!(t1_record.reason_revoked.as_deref(), Some(REASON_REUSE_DETECTED));

    assert_eq!(401, app.refresh(&t1).await.status().as_u16());
    assert_eq!(app.family_of(&t0).await.len(), 2);
}

#[tokio::test]
async fn concurrent_refresh_lets_exactly_one_through() {
    let app = spawn_app().await;
    let t0 = app.login().await;

    let (first, second) = tokio::join!(app.refresh(&t0), app.refresh(&t0));
    let mut statuses = vec![first.status().as_u16(), second.status().as_u16()];
    statuses.sort();
    assert_eq!(statuses, vec![200, 401]);

    // The loser rolled back its child, then contained the winner's.
    let family = app.family_of(&t0).await;
    assert_eq!(family.len(), 2);
    assert!(family.iter().all(|r| r.is_revoked));
}

// --- Store and schema ---

#[tokio::test]
async fn rotate_of_a_revoked_parent_rolls_back() {
    let app = spawn_app().await;
    let now = Utc::now();
    let parent = RefreshTokenRecord::origin(app.user_id, hash_token("t0"), Duration::days(7), now);
    app.store.insert(&parent).await.unwrap();
    assert!(app
        .store
        .revoke_if_active(parent.id, now, REASON_REUSE_DETECTED)
        .await
        .unwrap());

    let child = RefreshTokenRecord::child_of(&parent, hash_token("t1"), Duration::days(7), now);
    let outcome = app.store.rotate(parent.id, &child, now, REASON_ROTATED).await.unwrap();
    assert_eq!(outcome, RotationOutcome::ParentAlreadyRevoked);

    assert!(app.store.find_by_id(child.id).await.unwrap().is_none());
    let parent = app.store.find_by_id(parent.id).await.unwrap().unwrap();
    assert_eq!(parent.reason_revoked.as_deref(), Some(REASON_REUSE_DETECTED));
    assert!(parent.replaced_by_token_id.is_none());
}

#[tokio::test]
async fn a_family_has_only_one_origin() {
    let app = spawn_app().await;
    let now = Utc::now();
    let first = RefreshTokenRecord::origin(app.user_id, hash_token("a"), Duration::days(7), now);
    app.store.insert(&first).await.unwrap();

    let mut second = RefreshTokenRecord::origin(app.user_id, hash_token("b"), Duration::days(7), now);
    second.token_family = first.token_family;

    let err = app.store.insert(&second).await.unwrap_err();
    assert!(matches!(
        err,
        AppError::Database(DatabaseError::UniqueConstraintViolation(_))
    ));
}

#[tokio::test]
async fn child_of_an_unknown_parent_is_rejected() {
    let app = spawn_app().await;
    let now = Utc::now();
    let never_stored = RefreshTokenRecord::origin(app.user_id, hash_token("ghost"), Duration::days(7), now);
    let orphan = RefreshTokenRecord::child_of(&never_stored, hash_token("orphan"), Duration::days(7), now);

    assert!(matches!(
        app.store.insert(&orphan).await,
        Err(AppError::Database(_))
    ));
    assert!(app.store.find_by_id(orphan.id).await.unwrap().is_none());
}

#[tokio::test]
async fn directory_reads_roles_and_hides_inactive_users() {
    let app = spawn_app().await;
    let directory = PgUserDirectory::new(app.db_pool.clone());

    let account = directory.find_active(app.user_id).await.unwrap().expect("user is active");
    assert_eq!(account.email, EMAIL);
    assert_eq!(account.roles, vec!["moderator".to_string(), "student".to_string()]);

    sqlx::query("UPDATE users SET is_active = false WHERE id = $1")
        .bind(app.user_id)
        .execute(&app.db_pool)
        .await
        .unwrap();

    assert!(directory.find_active(app.user_id).await.unwrap().is_none());
    let credentials = directory
        .find_credentials(EMAIL)
        .await
        .unwrap()
        .expect("credentials still readable");
    assert_eq!(credentials.id, app.user_id);
    assert!(!credentials.is_active);
    assert!(directory.find_credentials("nobody@campus.edu").await.unwrap().is_none());
}
