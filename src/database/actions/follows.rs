use std::collections::HashMap;

use crate::{
    authentication::permissions::ActionType,
    error::{Error, HtmlError, QueryError},
    jwt::SessionData,
    pagination::{PageContext, Pagination},
    schema::{Id, Recipe, RecipeRow, User, UserRow},
    validation::check_follow,
    views::{FollowView, RecipeShortView, UserView},
};

use super::users::get_user_by_id;

use sqlx::{Pool, Postgres};

/// Newest recipes of each author, at most `recipes_limit` per author, with the
/// author's total recipe count carried in every row.
async fn list_author_recipes(
    author_ids: &[Id],
    recipes_limit: Option<i64>,
    pool: &Pool<Postgres>,
) -> Result<HashMap<Id, (Vec<Recipe>, i64)>, Error> {
    let rows: Vec<RecipeRow> = sqlx::query_as(
        "
        SELECT id, author_id, name, text, image, cooking_time, pub_date, count
        FROM (
            SELECT r.*,
                   COUNT(*) OVER (PARTITION BY r.author_id) AS count,
                   ROW_NUMBER() OVER (PARTITION BY r.author_id ORDER BY r.pub_date DESC, r.id DESC) AS position
            FROM recipes r
            WHERE r.author_id = ANY($1)
        ) ranked
        WHERE $2::BIGINT IS NULL OR position <= $2
        ORDER BY author_id, position
    ",
    )
    .bind(author_ids)
    .bind(recipes_limit)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    let mut hashmap: HashMap<Id, (Vec<Recipe>, i64)> = HashMap::new();
    for row in rows {
        let entry = hashmap.entry(row.author_id).or_insert((vec![], row.count));
        entry.0.push(row.into());
    }
    Ok(hashmap)
}

/// Follow views for authors the requester is known to follow.
async fn build_follow_views(
    authors: Vec<User>,
    recipes_limit: Option<i64>,
    pool: &Pool<Postgres>,
) -> Result<Vec<FollowView>, Error> {
    let author_ids: Vec<Id> = authors.iter().map(|author| author.id).collect();
    let mut recipes = list_author_recipes(&author_ids, recipes_limit, pool).await?;

    Ok(authors
        .iter()
        .map(|author| {
            let (list, recipes_count) = recipes.remove(&author.id).unwrap_or_default();
            FollowView {
                author: UserView::from_user(author, true),
                recipes: list.iter().map(RecipeShortView::from).collect(),
                recipes_count,
            }
        })
        .collect())
}

pub async fn follow_author(
    session: &SessionData,
    author_id: Id,
    recipes_limit: Option<i64>,
    pool: &Pool<Postgres>,
) -> Result<FollowView, Error> {
    check_follow(session.user_id, author_id)?;
    session.authenticate(ActionType::ManageOwnFollows)?;

    let author = get_user_by_id(pool, author_id)
        .await?
        .ok_or_else(|| HtmlError::NotFound.new("No user exists with specified id"))?;

    let result = sqlx::query(
        "INSERT INTO follows (user_id, author_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
    )
    .bind(session.user_id)
    .bind(author.id)
    .execute(pool)
    .await
    .map_err(QueryError::from)?;

    if result.rows_affected() == 0 {
        return Err(HtmlError::Conflict.new("You already follow this author"));
    }

    log::info!("User {} followed {}", session.user_id, author.id);
    build_follow_views(vec![author], recipes_limit, pool)
        .await?
        .pop()
        .ok_or_else(|| HtmlError::InternalServerError.default())
}

pub async fn unfollow_author(
    session: &SessionData,
    author_id: Id,
    pool: &Pool<Postgres>,
) -> Result<(), Error> {
    session.authenticate(ActionType::ManageOwnFollows)?;

    let result = sqlx::query("DELETE FROM follows WHERE user_id = $1 AND author_id = $2")
        .bind(session.user_id)
        .bind(author_id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    if result.rows_affected() == 0 {
        return Err(HtmlError::NotFound.new("You do not follow this author"));
    }

    log::info!("User {} unfollowed {}", session.user_id, author_id);
    Ok(())
}

pub async fn fetch_subscriptions(
    session: &SessionData,
    pagination: Pagination,
    recipes_limit: Option<i64>,
    pool: &Pool<Postgres>,
) -> Result<PageContext<FollowView>, Error> {
    session.authenticate(ActionType::ManageOwnFollows)?;

    let rows: Vec<UserRow> = sqlx::query_as(
        "
        SELECT u.*, COUNT(*) OVER() AS count
        FROM follows f
        INNER JOIN users u ON u.id = f.author_id
        WHERE f.user_id = $1
        ORDER BY u.id
        LIMIT $2 OFFSET $3
    ",
    )
    .bind(session.user_id)
    .bind(pagination.limit)
    .bind(pagination.offset())
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    let total_count = rows.first().map(|row| row.count).unwrap_or(0);
    let authors = rows.into_iter().map(User::from).collect();
    let views = build_follow_views(authors, recipes_limit, pool).await?;

    PageContext::from_rows(views, total_count, pagination)
}
