use axum::body::Body;
use axum::http::Request;
use http_body_util::BodyExt;
use jsonwebtoken::{EncodingKey, Header, encode};
use sqlx::PgPool;
use uuid::Uuid;
use warden::config::cors::CorsConfig;
use warden::config::jwt::JwtConfig;
use warden::middleware::auth::Claims;
use warden::router::init_router;
use warden::state::AppState;
use warden::utils::password::hash_password;

#[allow(dead_code)]
pub async fn setup_test_app(pool: PgPool) -> axum::Router {
    dotenvy::dotenv().ok();
    let state = AppState {
        db: pool,
        jwt_config: JwtConfig::from_env(),
        cors_config: CorsConfig::default(),
    };
    init_router(state)
}

/// Mint a bearer token the way the external identity provider would.
/// The service only verifies signatures, so the principal does not need
/// a matching database row.
#[allow(dead_code)]
pub fn mint_token(user_id: Uuid, email: &str) -> String {
    dotenvy::dotenv().ok();
    let jwt_config = JwtConfig::from_env();
    let now = chrono::Utc::now().timestamp() as usize;
    let claims = Claims {
        sub: user_id.to_string(),
        email: email.to_string(),
        iat: now,
        exp: now + 3600,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(jwt_config.secret.as_bytes()),
    )
    .unwrap()
}

#[allow(dead_code)]
pub fn caller_token() -> String {
    mint_token(Uuid::new_v4(), "caller@test.com")
}

#[allow(dead_code)]
pub struct TestUser {
    pub id: Uuid,
    pub email: String,
}

#[allow(dead_code)]
pub async fn create_test_user(pool: &PgPool, email: &str, password: &str) -> TestUser {
    let hashed = hash_password(password).unwrap();

    let id: Uuid = sqlx::query_scalar(
        "INSERT INTO users (name, email, password) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind("Test User")
    .bind(email)
    .bind(hashed)
    .fetch_one(pool)
    .await
    .unwrap();

    TestUser {
        id,
        email: email.to_string(),
    }
}

#[allow(dead_code)]
pub async fn create_role(pool: &PgPool, name: &str) -> Uuid {
    sqlx::query_scalar("INSERT INTO roles (name) VALUES ($1) RETURNING id")
        .bind(name)
        .fetch_one(pool)
        .await
        .unwrap()
}

#[allow(dead_code)]
pub async fn create_permission(pool: &PgPool, name: &str) -> Uuid {
    sqlx::query_scalar("INSERT INTO permissions (name) VALUES ($1) RETURNING id")
        .bind(name)
        .fetch_one(pool)
        .await
        .unwrap()
}

#[allow(dead_code)]
pub async fn grant_role_permission(pool: &PgPool, role_id: Uuid, permission_id: Uuid) {
    sqlx::query("INSERT INTO role_permissions (role_id, permission_id) VALUES ($1, $2)")
        .bind(role_id)
        .bind(permission_id)
        .execute(pool)
        .await
        .unwrap();
}

#[allow(dead_code)]
pub async fn assign_role_to_user(pool: &PgPool, user_id: Uuid, role_id: Uuid) {
    sqlx::query("INSERT INTO user_roles (user_id, role_id) VALUES ($1, $2)")
        .bind(user_id)
        .bind(role_id)
        .execute(pool)
        .await
        .unwrap();
}

#[allow(dead_code)]
pub fn generate_unique_email() -> String {
    format!("test-{}@test.com", Uuid::new_v4())
}

/// Build an authenticated JSON request.
#[allow(dead_code)]
pub fn request(method: &str, uri: &str, token: &str, body: Option<serde_json::Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", format!("Bearer {}", token));

    match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&json).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

#[allow(dead_code)]
pub async fn response_json(response: axum::response::Response) -> serde_json::Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}
