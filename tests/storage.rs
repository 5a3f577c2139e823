//! Tests against a real database. `#[sqlx::test]` creates a fresh database per
//! test from `DATABASE_URL` and applies the schema migration.

use foodgram::{
    actions::{
        add_to_list, create_recipe, fetch_recipes, fetch_shopping_list, get_recipe_view,
        register_user, update_recipe, RecipeFilter, RecipeList,
    },
    config::{Config, Limits},
    error::HtmlError,
    jwt::{generate_jwt_session, JwtSessionData, SessionData},
    pagination::Pagination,
    routes::{api, State},
    schema::{Id, User},
    validation::{IngredientForm, ValidRecipe, ValidRegistration},
};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use sqlx::PgPool;
use warp::http::StatusCode;

const SECRET: &str = "storage-secret";

async fn user(pool: &PgPool, username: &str) -> User {
    let form = ValidRegistration {
        email: format!("{username}@example.com"),
        username: username.to_string(),
        first_name: String::from("Test"),
        last_name: String::from("User"),
        password: String::from("long enough"),
    };
    register_user(form, pool).await.unwrap()
}

fn session(user: &User) -> SessionData {
    SessionData::from(JwtSessionData::new(user, 1))
}

async fn tag(pool: &PgPool, slug: &str, color: &str) -> Id {
    let row: (Id,) =
        sqlx::query_as("INSERT INTO tags (name, color, slug) VALUES ($1, $2, $3) RETURNING id")
            .bind(slug)
            .bind(color)
            .bind(slug)
            .fetch_one(pool)
            .await
            .unwrap();
    row.0
}

async fn ingredient(pool: &PgPool, name: &str, unit: &str) -> Id {
    let row: (Id,) = sqlx::query_as(
        "INSERT INTO ingredients (name, measurement_unit) VALUES ($1, $2) RETURNING id",
    )
    .bind(name)
    .bind(unit)
    .fetch_one(pool)
    .await
    .unwrap();
    row.0
}

fn recipe(name: &str, tags: Vec<Id>, ingredients: &[(Id, i32)]) -> ValidRecipe {
    ValidRecipe {
        name: name.to_string(),
        text: String::from("Mix and cook."),
        cooking_time: 20,
        image: None,
        tags,
        ingredients: ingredients
            .iter()
            .map(|(id, amount)| IngredientForm {
                id: *id,
                amount: *amount,
            })
            .collect(),
    }
}

async fn count(pool: &PgPool, table: &str) -> i64 {
    let row: (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(pool)
        .await
        .unwrap();
    row.0
}

#[sqlx::test(migrations = "./migrations")]
async fn created_recipe_reads_back(pool: PgPool) {
    let chef = session(&user(&pool, "chef").await);
    let breakfast = tag(&pool, "breakfast", "#E26C2D").await;
    let flour = ingredient(&pool, "flour", "g").await;
    let sugar = ingredient(&pool, "sugar", "g").await;

    let id = create_recipe(
        &chef,
        recipe("Pancakes", vec![breakfast], &[(flour, 200), (sugar, 200)]),
        &pool,
    )
    .await
    .unwrap();
    let view = get_recipe_view(Some(&chef), id, &pool).await.unwrap();

    let tags: Vec<Id> = view.tags.iter().map(|tag| tag.id).collect();
    assert_eq!(tags, vec![breakfast]);
    let amounts: Vec<(Id, i32)> = view
        .ingredients
        .iter()
        .map(|ingredient| (ingredient.id, ingredient.amount))
        .collect();
    assert_eq!(amounts, vec![(flour, 200), (sugar, 200)]);
    assert_eq!(view.author.username, "chef");
    assert!(!view.is_favorited);
    assert!(!view.is_in_shopping_cart);
}

#[sqlx::test(migrations = "./migrations")]
async fn update_replaces_tags_and_ingredients(pool: PgPool) {
    let chef = session(&user(&pool, "chef").await);
    let breakfast = tag(&pool, "breakfast", "#E26C2D").await;
    let lunch = tag(&pool, "lunch", "#49B64E").await;
    let flour = ingredient(&pool, "flour", "g").await;
    let milk = ingredient(&pool, "milk", "cup").await;

    let id = create_recipe(&chef, recipe("Pancakes", vec![breakfast], &[(flour, 200)]), &pool)
        .await
        .unwrap();
    update_recipe(&chef, id, recipe("Crepes", vec![lunch], &[(milk, 2)]), &pool)
        .await
        .unwrap();

    let view = get_recipe_view(None, id, &pool).await.unwrap();
    assert_eq!(view.name, "Crepes");
    assert_eq!(view.tags.len(), 1);
    assert_eq!(view.tags[0].id, lunch);
    assert_eq!(view.ingredients.len(), 1);
    assert_eq!((view.ingredients[0].id, view.ingredients[0].amount), (milk, 2));
    assert_eq!(count(&pool, "ingredient_amounts").await, 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn unknown_tag_persists_nothing(pool: PgPool) {
    let chef = session(&user(&pool, "chef").await);
    let flour = ingredient(&pool, "flour", "g").await;

    let error = create_recipe(&chef, recipe("Pancakes", vec![99], &[(flour, 200)]), &pool)
        .await
        .unwrap_err();

    assert_eq!(error.kind, HtmlError::NotFound);
    assert!(error.fields.contains_key("tags"));
    assert_eq!(count(&pool, "recipes").await, 0);
}

#[sqlx::test(migrations = "./migrations")]
async fn shopping_list_sums_cart_recipes(pool: PgPool) {
    let chef = session(&user(&pool, "chef").await);
    let breakfast = tag(&pool, "breakfast", "#E26C2D").await;
    let flour = ingredient(&pool, "flour", "g").await;
    let egg = ingredient(&pool, "egg", "pcs").await;
    let milk = ingredient(&pool, "milk", "cup").await;

    let a = create_recipe(&chef, recipe("A", vec![breakfast], &[(flour, 200), (egg, 2)]), &pool)
        .await
        .unwrap();
    let b = create_recipe(&chef, recipe("B", vec![breakfast], &[(flour, 100), (milk, 1)]), &pool)
        .await
        .unwrap();
    add_to_list(RecipeList::ShoppingCart, &chef, a, &pool).await.unwrap();
    add_to_list(RecipeList::ShoppingCart, &chef, b, &pool).await.unwrap();

    let rendered = fetch_shopping_list(&chef, &pool).await.unwrap().render();

    assert_eq!(
        rendered,
        "Список покупок:\n\negg - 2 pcs\nflour - 300 g\nmilk - 1 cup\n"
    );
}

#[sqlx::test(migrations = "./migrations")]
async fn second_cart_add_conflicts(pool: PgPool) {
    let owner = user(&pool, "chef").await;
    let chef = session(&owner);
    let breakfast = tag(&pool, "breakfast", "#E26C2D").await;
    let flour = ingredient(&pool, "flour", "g").await;
    let id = create_recipe(&chef, recipe("Pancakes", vec![breakfast], &[(flour, 200)]), &pool)
        .await
        .unwrap();

    let config = Config {
        port: 0,
        database_url: String::new(),
        max_connections: 1,
        secret: SECRET.into(),
        session_hours: 1,
        page_size: 6,
        limits: Limits::default(),
    };
    let filter = api(State::new(pool.clone(), config));
    let token = generate_jwt_session(&owner, SECRET.as_bytes(), 1).unwrap();
    let path = format!("/api/recipes/{id}/shopping_cart");

    let first = warp::test::request()
        .method("POST")
        .path(&path)
        .header("authorization", format!("Token {token}"))
        .reply(&filter)
        .await;
    assert_eq!(first.status(), StatusCode::CREATED);

    let second = warp::test::request()
        .method("POST")
        .path(&path)
        .header("authorization", format!("Token {token}"))
        .reply(&filter)
        .await;
    assert_eq!(second.status(), StatusCode::CONFLICT);
    let body: Value = serde_json::from_slice(second.body()).unwrap();
    assert_eq!(body, json!({"detail": "Recipe is already in the shopping cart"}));

    assert_eq!(count(&pool, "shopping_cart").await, 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn page_past_the_end_is_not_found(pool: PgPool) {
    let chef = session(&user(&pool, "chef").await);
    let breakfast = tag(&pool, "breakfast", "#E26C2D").await;
    let flour = ingredient(&pool, "flour", "g").await;
    create_recipe(&chef, recipe("Pancakes", vec![breakfast], &[(flour, 200)]), &pool)
        .await
        .unwrap();

    let filter = RecipeFilter::default();
    let page = fetch_recipes(None, &filter, Pagination::new(1, 6), &pool)
        .await
        .unwrap();
    assert_eq!(page.count, 1);

    let error = fetch_recipes(None, &filter, Pagination::new(2, 6), &pool)
        .await
        .unwrap_err();
    assert_eq!(error.kind, HtmlError::NotFound);
}
