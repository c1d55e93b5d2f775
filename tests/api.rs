use serde_json::{json, Value};
use sqlx::{postgres::PgPoolOptions, PgPool};
use warp::{http::StatusCode, test::request, Filter, Reply};

use recipe_hub::{
    filters::{routes, Context},
    jwt::generate_jwt_session,
    schema::{User, UserRole},
    Config,
};

// The pool never connects; every request below is rejected before a query runs.
fn api() -> impl Filter<Extract = (impl Reply,), Error = std::convert::Infallible> + Clone {
    let config = Config::default();
    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect_lazy(&config.database_url)
        .unwrap();

    routes(Context::new(pool, config))
}

fn api_on(pool: PgPool) -> impl Filter<Extract = (impl Reply,), Error = std::convert::Infallible> + Clone {
    routes(Context::new(pool, Config::default()))
}

async fn insert_user(username: &str, pool: &PgPool) -> i32 {
    let row: (i32,) = sqlx::query_as(
        "INSERT INTO users (email, username, first_name, last_name, password) VALUES ($1, $2, 'Test', 'Cook', '') RETURNING id",
    )
    .bind(format!("{username}@example.com"))
    .bind(username)
    .fetch_one(pool)
    .await
    .unwrap();
    row.0
}

async fn insert_ingredient(name: &str, pool: &PgPool) -> i32 {
    let row: (i32,) = sqlx::query_as(
        "INSERT INTO ingredients (name, measurement_unit) VALUES ($1, 'g') RETURNING id",
    )
    .bind(name)
    .fetch_one(pool)
    .await
    .unwrap();
    row.0
}

async fn insert_tag(pool: &PgPool) -> i32 {
    let row: (i32,) = sqlx::query_as(
        "INSERT INTO tags (name, color, slug) VALUES ('Lunch', '#00ff00', 'lunch') RETURNING id",
    )
    .fetch_one(pool)
    .await
    .unwrap();
    row.0
}

fn token_for(id: i32) -> String {
    let user = User {
        id,
        email: format!("cook{id}@example.com"),
        username: format!("cook{id}"),
        first_name: String::from("Test"),
        last_name: String::from("Cook"),
        password: String::new(),
        role: UserRole::User,
    };
    let config = Config::default();
    let token = generate_jwt_session(&user, config.jwt_secret.as_bytes(), 1).unwrap();
    format!("Token {token}")
}

fn body(bytes: &[u8]) -> Value {
    serde_json::from_slice(bytes).unwrap()
}

fn recipe(ingredients: Value, cooking_time: i32) -> Value {
    json!({
        "ingredients": ingredients,
        "tags": [1, 2],
        "name": "Tomato salad",
        "text": "Slice and salt.",
        "cooking_time": cooking_time,
    })
}

#[tokio::test]
async fn cart_download_requires_a_token() {
    let response = request()
        .method("GET")
        .path("/api/recipes/download_shopping_cart/")
        .reply(&api())
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        body(response.body()),
        json!({ "errors": "Authentication credentials were not provided." })
    );
}

#[tokio::test]
async fn invalid_tokens_are_rejected() {
    let response = request()
        .method("GET")
        .path("/api/users/me/")
        .header("authorization", "Token not-a-jwt")
        .reply(&api())
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn invalid_tokens_are_rejected_on_public_routes() {
    let response = request()
        .method("GET")
        .path("/api/recipes/")
        .header("authorization", "Token not-a-jwt")
        .reply(&api())
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn duplicate_ingredients_are_rejected() {
    let response = request()
        .method("POST")
        .path("/api/recipes/")
        .header("authorization", token_for(1))
        .json(&recipe(
            json!([{ "id": 3, "amount": 2 }, { "id": 3, "amount": 5 }]),
            10,
        ))
        .reply(&api())
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body(response.body()),
        json!({ "ingredients": ["This ingredient is already in the list."] })
    );
}

#[tokio::test]
async fn non_positive_amounts_are_rejected() {
    let response = request()
        .method("POST")
        .path("/api/recipes/")
        .header("authorization", token_for(1))
        .json(&recipe(json!([{ "id": 3, "amount": 0 }]), 10))
        .reply(&api())
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body(response.body()).get("ingredients").is_some());
}

#[tokio::test]
async fn empty_ingredient_lists_are_rejected() {
    let response = request()
        .method("POST")
        .path("/api/recipes/")
        .header("authorization", token_for(1))
        .json(&recipe(json!([]), 10))
        .reply(&api())
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body(response.body()),
        json!({ "ingredients": ["No ingredients were added."] })
    );
}

#[tokio::test]
async fn zero_cooking_time_is_rejected() {
    let response = request()
        .method("POST")
        .path("/api/recipes/")
        .header("authorization", token_for(1))
        .json(&recipe(json!([{ "id": 3, "amount": 2 }]), 0))
        .reply(&api())
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body(response.body()).get("cooking_time").is_some());
}

#[tokio::test]
async fn malformed_images_are_rejected() {
    let mut form = recipe(json!([{ "id": 3, "amount": 2 }]), 10);
    form["image"] = json!("http://example.com/tomato.png");

    let response = request()
        .method("POST")
        .path("/api/recipes/")
        .header("authorization", token_for(1))
        .json(&form)
        .reply(&api())
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body(response.body()), json!({ "image": ["Upload a valid image."] }));
}

#[tokio::test]
async fn recipes_cannot_be_created_anonymously() {
    let response = request()
        .method("POST")
        .path("/api/recipes/")
        .json(&recipe(json!([{ "id": 3, "amount": 2 }]), 10))
        .reply(&api())
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn recipes_can_be_replaced_with_put() {
    let api = api();

    let response = request()
        .method("PUT")
        .path("/api/recipes/1/")
        .json(&recipe(json!([{ "id": 3, "amount": 2 }]), 10))
        .reply(&api)
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // A full update needs every field.
    let response = request()
        .method("PUT")
        .path("/api/recipes/1/")
        .header("authorization", token_for(1))
        .json(&json!({ "name": "Soup" }))
        .reply(&api)
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn subscribing_to_yourself_is_rejected() {
    let response = request()
        .method("POST")
        .path("/api/users/5/subscribe/")
        .header("authorization", token_for(5))
        .reply(&api())
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body(response.body()),
        json!({ "errors": "You cannot subscribe to yourself." })
    );
}

#[tokio::test]
async fn invalid_usernames_are_rejected() {
    let response = request()
        .method("POST")
        .path("/api/users/")
        .json(&json!({
            "email": "cook@example.com",
            "username": "bad name!",
            "first_name": "Test",
            "last_name": "Cook",
            "password": "secret-password",
        }))
        .reply(&api())
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body(response.body()).get("username").is_some());
}

#[tokio::test]
async fn blank_passwords_are_rejected_on_registration() {
    let response = request()
        .method("POST")
        .path("/api/users/")
        .json(&json!({
            "email": "cook@example.com",
            "username": "cook",
            "first_name": "Test",
            "last_name": "Cook",
            "password": "",
        }))
        .reply(&api())
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body(response.body()),
        json!({ "password": ["This field may not be blank."] })
    );
}

#[tokio::test]
async fn logout_needs_a_valid_token() {
    let api = api();

    let response = request()
        .method("POST")
        .path("/api/auth/token/logout/")
        .header("authorization", token_for(2))
        .reply(&api)
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = request()
        .method("POST")
        .path("/api/auth/token/logout/")
        .reply(&api)
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn malformed_json_is_a_bad_request() {
    let response = request()
        .method("POST")
        .path("/api/recipes/")
        .header("authorization", token_for(1))
        .header("content-type", "application/json")
        .body("{\"ingredients\": [")
        .reply(&api())
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_routes_are_not_found() {
    let response = request()
        .method("GET")
        .path("/api/unknown/")
        .reply(&api())
        .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn wrong_methods_are_not_allowed() {
    let response = request()
        .method("PUT")
        .path("/api/tags/")
        .reply(&api())
        .await;

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[sqlx::test(migrations = "./migrations")]
async fn favoriting_twice_is_a_bad_request(pool: PgPool) {
    let user = insert_user("cook", &pool).await;
    let tomato = insert_ingredient("tomato", &pool).await;
    let tag = insert_tag(&pool).await;
    let api = api_on(pool);

    let mut form = recipe(json!([{ "id": tomato, "amount": 2 }]), 10);
    form["tags"] = json!([tag]);
    let response = request()
        .method("POST")
        .path("/api/recipes/")
        .header("authorization", token_for(user))
        .json(&form)
        .reply(&api)
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let id = body(response.body())["id"].as_i64().unwrap();

    let favorite = || {
        request()
            .method("POST")
            .path(&format!("/api/recipes/{id}/favorite/"))
            .header("authorization", token_for(user))
    };
    assert_eq!(favorite().reply(&api).await.status(), StatusCode::CREATED);
    let response = favorite().reply(&api).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body(response.body()),
        json!({ "errors": "Recipe is already in favorites." })
    );

    let response = request()
        .method("DELETE")
        .path(&format!("/api/recipes/{id}/shopping_cart/"))
        .header("authorization", token_for(user))
        .reply(&api)
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "./migrations")]
async fn shopping_cart_downloads_as_text(pool: PgPool) {
    let user = insert_user("cook", &pool).await;
    let tomato = insert_ingredient("tomato", &pool).await;
    let salt = insert_ingredient("Salt", &pool).await;
    let tag = insert_tag(&pool).await;
    let api = api_on(pool);

    let download = || {
        request()
            .method("GET")
            .path("/api/recipes/download_shopping_cart/")
            .header("authorization", token_for(user))
    };
    let response = download().reply(&api).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body(response.body()), json!({ "errors": "Shopping cart is empty." }));

    for ingredients in [
        json!([{ "id": tomato, "amount": 2 }, { "id": salt, "amount": 1 }]),
        json!([{ "id": tomato, "amount": 3 }]),
    ] {
        let mut form = recipe(ingredients, 10);
        form["tags"] = json!([tag]);
        let response = request()
            .method("POST")
            .path("/api/recipes/")
            .header("authorization", token_for(user))
            .json(&form)
            .reply(&api)
            .await;
        let id = body(response.body())["id"].as_i64().unwrap();

        let response = request()
            .method("POST")
            .path(&format!("/api/recipes/{id}/shopping_cart/"))
            .header("authorization", token_for(user))
            .reply(&api)
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let response = download().reply(&api).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "text/plain; charset=utf-8");
    assert_eq!(
        response.headers()["content-disposition"],
        "attachment; filename=shopping-cart.txt"
    );
    assert_eq!(response.body(), "Salt (g) — 1\ntomato (g) — 5\n");
}

#[sqlx::test(migrations = "./migrations")]
async fn patching_only_the_name_keeps_tags_and_ingredients(pool: PgPool) {
    let user = insert_user("cook", &pool).await;
    let tomato = insert_ingredient("tomato", &pool).await;
    let tag = insert_tag(&pool).await;
    let api = api_on(pool);

    let mut form = recipe(json!([{ "id": tomato, "amount": 2 }]), 10);
    form["tags"] = json!([tag]);
    let response = request()
        .method("POST")
        .path("/api/recipes/")
        .header("authorization", token_for(user))
        .json(&form)
        .reply(&api)
        .await;
    let id = body(response.body())["id"].as_i64().unwrap();

    let response = request()
        .method("PATCH")
        .path(&format!("/api/recipes/{id}/"))
        .header("authorization", token_for(user))
        .json(&json!({ "name": "Summer salad" }))
        .reply(&api)
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let detail = body(response.body());
    assert_eq!(detail["name"], "Summer salad");
    assert_eq!(detail["tags"][0]["id"], tag);
    assert_eq!(detail["ingredients"][0]["amount"], 2);
}
