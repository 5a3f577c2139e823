use crate::{
    authentication::permissions::ActionType,
    error::{Error, HtmlError, QueryError},
    jwt::SessionData,
    schema::Id,
    views::RecipeShortView,
};

use super::recipes::get_recipe;

use sqlx::{Pool, Postgres};

/// The per-user recipe collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecipeList {
    Favorites,
    ShoppingCart,
}

impl RecipeList {
    fn table(&self) -> &'static str {
        match self {
            Self::Favorites => "favorites",
            Self::ShoppingCart => "shopping_cart",
        }
    }

    fn action(&self) -> ActionType {
        match self {
            Self::Favorites => ActionType::ManageOwnFavorites,
            Self::ShoppingCart => ActionType::ManageOwnCart,
        }
    }

    fn already_present(&self) -> &'static str {
        match self {
            Self::Favorites => "Recipe is already in favorites",
            Self::ShoppingCart => "Recipe is already in the shopping cart",
        }
    }

    fn missing(&self) -> &'static str {
        match self {
            Self::Favorites => "Recipe is not in favorites",
            Self::ShoppingCart => "Recipe is not in the shopping cart",
        }
    }
}

/// Adds a recipe to one of the requester's lists. The unique pair constraint
/// decides whether it was already there.
pub async fn add_to_list(
    list: RecipeList,
    session: &SessionData,
    recipe_id: Id,
    pool: &Pool<Postgres>,
) -> Result<RecipeShortView, Error> {
    session.authenticate(list.action())?;

    let recipe = get_recipe(recipe_id, pool)
        .await?
        .ok_or_else(|| HtmlError::NotFound.new("No recipe exists with specified id"))?;

    let result = sqlx::query(&format!(
        "INSERT INTO {} (user_id, recipe_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        list.table()
    ))
    .bind(session.user_id)
    .bind(recipe.id)
    .execute(pool)
    .await
    .map_err(QueryError::from)?;

    if result.rows_affected() == 0 {
        return Err(HtmlError::Conflict.new(list.already_present()));
    }

    log::info!("User {} added recipe {} to {}", session.user_id, recipe.id, list.table());
    Ok(RecipeShortView::from(&recipe))
}

pub async fn remove_from_list(
    list: RecipeList,
    session: &SessionData,
    recipe_id: Id,
    pool: &Pool<Postgres>,
) -> Result<(), Error> {
    session.authenticate(list.action())?;

    let result = sqlx::query(&format!(
        "DELETE FROM {} WHERE user_id = $1 AND recipe_id = $2",
        list.table()
    ))
    .bind(session.user_id)
    .bind(recipe_id)
    .execute(pool)
    .await
    .map_err(QueryError::from)?;

    if result.rows_affected() == 0 {
        return Err(HtmlError::NotFound.new(list.missing()));
    }

    log::info!("User {} removed recipe {} from {}", session.user_id, recipe_id, list.table());
    Ok(())
}
