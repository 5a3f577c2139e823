use crate::{
    authentication::permissions::ActionType,
    error::{Error, QueryError},
    jwt::SessionData,
    schema::{Id, Ingredient},
};

use sqlx::{Pool, Postgres};

/// `ILIKE` pattern matching names that start with `prefix` literally.
fn like_prefix(prefix: &str) -> String {
    let escaped = prefix
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("{escaped}%")
}

pub async fn create_ingredient(
    session: &SessionData,
    name: String,
    measurement_unit: String,
    pool: &Pool<Postgres>,
) -> Result<Ingredient, Error> {
    session.authenticate(ActionType::ManageIngredients)?;

    let ingredient: Ingredient = sqlx::query_as(
        "INSERT INTO ingredients (name, measurement_unit) VALUES ($1, $2) RETURNING *",
    )
    .bind(name)
    .bind(measurement_unit)
    .fetch_one(pool)
    .await
    .map_err(QueryError::from)?;

    log::info!("Created ingredient {} ({})", ingredient.name, ingredient.id);
    Ok(ingredient)
}

pub async fn get_ingredient(id: Id, pool: &Pool<Postgres>) -> Result<Option<Ingredient>, Error> {
    let row: Option<Ingredient> = sqlx::query_as("SELECT * FROM ingredients WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row)
}

pub async fn list_ingredients(
    name: Option<&str>,
    pool: &Pool<Postgres>,
) -> Result<Vec<Ingredient>, Error> {
    let rows: Vec<Ingredient> = match name.map(str::trim).filter(|name| !name.is_empty()) {
        Some(name) => {
            sqlx::query_as("SELECT * FROM ingredients WHERE name ILIKE $1 ORDER BY name, id")
                .bind(like_prefix(name))
                .fetch_all(pool)
                .await
                .map_err(QueryError::from)?
        }
        None => sqlx::query_as("SELECT * FROM ingredients ORDER BY name, id")
            .fetch_all(pool)
            .await
            .map_err(QueryError::from)?,
    };

    Ok(rows)
}
