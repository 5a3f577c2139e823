use std::collections::HashMap;

use crate::{
    authentication::permissions::ActionType,
    error::{Error, QueryError},
    jwt::SessionData,
    schema::{Id, LinkedRecipeTag, Tag},
    validation::ValidTag,
};

use sqlx::{Pool, Postgres};

pub async fn create_tag(
    session: &SessionData,
    tag: ValidTag,
    pool: &Pool<Postgres>,
) -> Result<Tag, Error> {
    session.authenticate(ActionType::ManageTags)?;

    let tag: Tag =
        sqlx::query_as("INSERT INTO tags (name, color, slug) VALUES ($1, $2, $3) RETURNING *")
            .bind(tag.name)
            .bind(tag.color)
            .bind(tag.slug)
            .fetch_one(pool)
            .await
            .map_err(QueryError::from)?;

    log::info!("Created tag {} ({})", tag.slug, tag.id);
    Ok(tag)
}

pub async fn get_tag(id: Id, pool: &Pool<Postgres>) -> Result<Option<Tag>, Error> {
    let tag: Option<Tag> = sqlx::query_as("SELECT * FROM tags WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(tag)
}

pub async fn list_tags(pool: &Pool<Postgres>) -> Result<Vec<Tag>, Error> {
    let list: Vec<Tag> = sqlx::query_as("SELECT * FROM tags ORDER BY id")
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(list)
}

/// Tags of each recipe in `recipe_ids`, keyed by recipe.
pub async fn list_recipe_tags(
    pool: &Pool<Postgres>,
    recipe_ids: &[Id],
) -> Result<HashMap<Id, Vec<Tag>>, Error> {
    let list: Vec<LinkedRecipeTag> = sqlx::query_as(
        "
        SELECT rt.recipe_id AS recipe_id, t.id AS id, t.name AS name, t.color AS color, t.slug AS slug
        FROM recipe_tags rt
        INNER JOIN tags t ON t.id = rt.tag_id
        WHERE rt.recipe_id = ANY($1)
        ORDER BY t.id
    ",
    )
    .bind(recipe_ids)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    let mut hashmap: HashMap<Id, Vec<Tag>> = HashMap::new();
    for tag in list {
        hashmap.entry(tag.recipe_id).or_default().push(tag.into());
    }
    Ok(hashmap)
}
