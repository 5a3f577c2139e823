use chrono::Utc;
use foodgram::{
    config::{Config, Limits},
    jwt::generate_jwt_session,
    routes::{api, State},
    schema::{User, UserRole},
};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use sqlx::postgres::PgPoolOptions;
use warp::http::StatusCode;

const SECRET: &str = "integration-secret";

/// The pool never connects; every request below is answered before storage
/// is touched.
fn state() -> State {
    let pool = PgPoolOptions::new()
        .connect_lazy("postgres://foodgram@localhost/foodgram")
        .unwrap();
    let config = Config {
        port: 0,
        database_url: String::from("postgres://foodgram@localhost/foodgram"),
        max_connections: 1,
        secret: SECRET.into(),
        session_hours: 1,
        page_size: 6,
        limits: Limits::default(),
    };
    State::new(pool, config)
}

fn token(id: i32) -> String {
    let user = User {
        id,
        email: format!("user{id}@example.com"),
        username: format!("user{id}"),
        first_name: String::from("Test"),
        last_name: String::from("User"),
        password: String::new(),
        role: UserRole::Authorized,
        is_superuser: false,
        is_staff: false,
        date_joined: Utc::now(),
    };
    let token = generate_jwt_session(&user, SECRET.as_bytes(), 1).unwrap();
    format!("Token {token}")
}

fn body(bytes: &[u8]) -> Value {
    serde_json::from_slice(bytes).unwrap()
}

#[tokio::test]
async fn shopping_list_requires_session() {
    let response = warp::test::request()
        .method("GET")
        .path("/api/recipes/download_shopping_cart")
        .reply(&api(state()))
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn creating_recipe_requires_session() {
    let response = warp::test::request()
        .method("POST")
        .path("/api/recipes")
        .json(&json!({"name": "Pancakes"}))
        .reply(&api(state()))
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn forged_token_is_unauthorized() {
    let response = warp::test::request()
        .method("GET")
        .path("/api/users/me")
        .header("authorization", "Token forged")
        .reply(&api(state()))
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn following_yourself_is_rejected() {
    let response = warp::test::request()
        .method("POST")
        .path("/api/users/2/subscribe")
        .header("authorization", token(2))
        .reply(&api(state()))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body(response.body()), json!({"detail": "You cannot follow yourself"}));
}

#[tokio::test]
async fn invalid_recipe_reports_the_failing_field() {
    let response = warp::test::request()
        .method("POST")
        .path("/api/recipes")
        .header("authorization", token(3))
        .json(&json!({
            "name": "Pancakes",
            "text": "Mix and fry.",
            "cooking_time": 0,
            "tags": [1],
            "ingredients": [{"id": 1, "amount": 200}]
        }))
        .reply(&api(state()))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body(response.body())["cooking_time"].is_array());
}

#[tokio::test]
async fn recipe_without_ingredients_is_rejected() {
    let response = warp::test::request()
        .method("PATCH")
        .path("/api/recipes/5")
        .header("authorization", token(3))
        .json(&json!({
            "name": "Pancakes",
            "text": "Mix and fry.",
            "cooking_time": 20,
            "tags": [1],
            "ingredients": []
        }))
        .reply(&api(state()))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body(response.body())["ingredients"].is_array());
}

#[tokio::test]
async fn anonymous_favorites_filter_is_empty() {
    let response = warp::test::request()
        .method("GET")
        .path("/api/recipes?is_favorited=1")
        .reply(&api(state()))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body(response.body()),
        json!({"count": 0, "next": null, "previous": null, "results": []})
    );
}

#[tokio::test]
async fn malformed_page_is_rejected() {
    let response = warp::test::request()
        .method("GET")
        .path("/api/recipes?page=first")
        .reply(&api(state()))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn weak_new_password_is_rejected() {
    let response = warp::test::request()
        .method("POST")
        .path("/api/users/set_password")
        .header("authorization", token(4))
        .json(&json!({"current_password": "old password", "new_password": "1234"}))
        .reply(&api(state()))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body(response.body())["new_password"].is_array());
}

#[tokio::test]
async fn unknown_route_is_not_found() {
    let response = warp::test::request()
        .method("GET")
        .path("/api/nothing")
        .reply(&api(state()))
        .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
