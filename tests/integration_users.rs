mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::{
    caller_token, create_permission, create_role, create_test_user, generate_unique_email, request,
    response_json, setup_test_app,
};
use serde_json::json;
use sqlx::PgPool;
use tower::ServiceExt;
use uuid::Uuid;

#[sqlx::test(migrations = "./migrations")]
async fn test_create_user_success(pool: PgPool) {
    create_role(&pool, "user").await;
    let token = caller_token();
    let app = setup_test_app(pool.clone()).await;

    let response = app
        .oneshot(request(
            "POST",
            "/api/users",
            &token,
            Some(json!({
                "name": "Jane Doe",
                "email": "Jane@Example.com",
                "password": "secret1"
            })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = response_json(response).await;

    // Email is normalized to lowercase; the hash never appears.
    assert_eq!(body["email"], "jane@example.com");
    assert_eq!(body["name"], "Jane Doe");
    assert!(body.get("password").is_none());

    // Default role assigned on creation.
    let roles: Vec<String> = body["roles"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r.as_str().unwrap().to_string())
        .collect();
    assert_eq!(roles, vec!["user"]);

    // Stored password is a hash, never the plaintext.
    let stored: String = sqlx::query_scalar("SELECT password FROM users WHERE email = $1")
        .bind("jane@example.com")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_ne!(stored, "secret1");
    assert!(stored.starts_with("$2"));
}

#[sqlx::test(migrations = "./migrations")]
async fn test_create_user_duplicate_email(pool: PgPool) {
    create_role(&pool, "user").await;
    let email = generate_unique_email();
    create_test_user(&pool, &email, "password123").await;

    let token = caller_token();
    let app = setup_test_app(pool.clone()).await;

    let response = app
        .oneshot(request(
            "POST",
            "/api/users",
            &token,
            Some(json!({
                "name": "Copycat",
                "email": email,
                "password": "password123"
            })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    // No second row was created.
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE email = $1")
        .bind(&email)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_create_user_short_password(pool: PgPool) {
    let token = caller_token();
    let app = setup_test_app(pool.clone()).await;

    let response = app
        .oneshot(request(
            "POST",
            "/api/users",
            &token,
            Some(json!({
                "name": "Jane Doe",
                "email": generate_unique_email(),
                "password": "short"
            })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_create_user_missing_field(pool: PgPool) {
    let token = caller_token();
    let app = setup_test_app(pool.clone()).await;

    let response = app
        .oneshot(request(
            "POST",
            "/api/users",
            &token,
            Some(json!({
                "name": "Jane Doe"
            })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_get_users(pool: PgPool) {
    create_test_user(&pool, &generate_unique_email(), "password123").await;
    create_test_user(&pool, &generate_unique_email(), "password123").await;

    let token = caller_token();
    let app = setup_test_app(pool.clone()).await;

    let response = app
        .oneshot(request("GET", "/api/users", &token, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body.as_array().unwrap().len(), 2);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_get_user_not_found(pool: PgPool) {
    let token = caller_token();
    let app = setup_test_app(pool.clone()).await;

    let response = app
        .oneshot(request(
            "GET",
            &format!("/api/users/{}", Uuid::new_v4()),
            &token,
            None,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_update_user_partial(pool: PgPool) {
    let email = generate_unique_email();
    let user = create_test_user(&pool, &email, "password123").await;

    let token = caller_token();
    let app = setup_test_app(pool.clone()).await;

    let response = app
        .oneshot(request(
            "PUT",
            &format!("/api/users/{}", user.id),
            &token,
            Some(json!({
                "name": "Renamed"
            })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["name"], "Renamed");
    // Unspecified fields stay untouched.
    assert_eq!(body["email"], email);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_update_user_empty_body_changes_nothing(pool: PgPool) {
    let email = generate_unique_email();
    let user = create_test_user(&pool, &email, "password123").await;

    let before: chrono::DateTime<chrono::Utc> =
        sqlx::query_scalar("SELECT updated_at FROM users WHERE id = $1")
            .bind(user.id)
            .fetch_one(&pool)
            .await
            .unwrap();

    let token = caller_token();
    let app = setup_test_app(pool.clone()).await;

    let response = app
        .oneshot(request(
            "PUT",
            &format!("/api/users/{}", user.id),
            &token,
            Some(json!({})),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["email"], email);

    let after: chrono::DateTime<chrono::Utc> =
        sqlx::query_scalar("SELECT updated_at FROM users WHERE id = $1")
            .bind(user.id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(after, before);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_update_user_rehashes_password(pool: PgPool) {
    let email = generate_unique_email();
    let user = create_test_user(&pool, &email, "password123").await;

    let token = caller_token();
    let app = setup_test_app(pool.clone()).await;

    let response = app
        .oneshot(request(
            "PUT",
            &format!("/api/users/{}", user.id),
            &token,
            Some(json!({
                "password": "newsecret"
            })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let stored: String = sqlx::query_scalar("SELECT password FROM users WHERE id = $1")
        .bind(user.id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_ne!(stored, "newsecret");
    assert!(warden::utils::password::verify_password("newsecret", &stored).unwrap());
}

#[sqlx::test(migrations = "./migrations")]
async fn test_update_user_duplicate_email(pool: PgPool) {
    let taken = generate_unique_email();
    create_test_user(&pool, &taken, "password123").await;
    let user = create_test_user(&pool, &generate_unique_email(), "password123").await;

    let token = caller_token();
    let app = setup_test_app(pool.clone()).await;

    let response = app
        .oneshot(request(
            "PUT",
            &format!("/api/users/{}", user.id),
            &token,
            Some(json!({
                "email": taken
            })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_update_user_not_found(pool: PgPool) {
    let token = caller_token();
    let app = setup_test_app(pool.clone()).await;

    let response = app
        .oneshot(request(
            "PUT",
            &format!("/api/users/{}", Uuid::new_v4()),
            &token,
            Some(json!({
                "name": "Ghost"
            })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_delete_user_twice_reports_not_found(pool: PgPool) {
    let user = create_test_user(&pool, &generate_unique_email(), "password123").await;
    let token = caller_token();

    let app = setup_test_app(pool.clone()).await;
    let response = app
        .oneshot(request(
            "DELETE",
            &format!("/api/users/{}", user.id),
            &token,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["message"], "User deleted");

    // The user is already gone; a second delete is NotFound, not a no-op.
    let app = setup_test_app(pool.clone()).await;
    let response = app
        .oneshot(request(
            "DELETE",
            &format!("/api/users/{}", user.id),
            &token,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_delete_user_cascades_associations_only(pool: PgPool) {
    let role_id = create_role(&pool, "editor").await;
    let permission_id = create_permission(&pool, "edit posts").await;

    let user = create_test_user(&pool, &generate_unique_email(), "password123").await;
    let other = create_test_user(&pool, &generate_unique_email(), "password123").await;

    for id in [user.id, other.id] {
        sqlx::query("INSERT INTO user_roles (user_id, role_id) VALUES ($1, $2)")
            .bind(id)
            .bind(role_id)
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO user_permissions (user_id, permission_id) VALUES ($1, $2)")
            .bind(id)
            .bind(permission_id)
            .execute(&pool)
            .await
            .unwrap();
    }

    let token = caller_token();
    let app = setup_test_app(pool.clone()).await;
    let response = app
        .oneshot(request(
            "DELETE",
            &format!("/api/users/{}", user.id),
            &token,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // The deleted user's association rows are gone.
    let user_assocs: i64 = sqlx::query_scalar(
        "SELECT (SELECT COUNT(*) FROM user_roles WHERE user_id = $1)
            + (SELECT COUNT(*) FROM user_permissions WHERE user_id = $1)",
    )
    .bind(user.id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(user_assocs, 0);

    // Shared role/permission rows and the other user's associations survive.
    let roles: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM roles")
        .fetch_one(&pool)
        .await
        .unwrap();
    let permissions: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM permissions")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(roles, 1);
    assert_eq!(permissions, 1);

    let other_assocs: i64 = sqlx::query_scalar(
        "SELECT (SELECT COUNT(*) FROM user_roles WHERE user_id = $1)
            + (SELECT COUNT(*) FROM user_permissions WHERE user_id = $1)",
    )
    .bind(other.id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(other_assocs, 2);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_requests_without_token_are_unauthorized(pool: PgPool) {
    let app = setup_test_app(pool.clone()).await;

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/users")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
