use crate::{
    authentication::permissions::ActionType,
    error::{Error, QueryError},
    jwt::SessionData,
    schema::CartIngredientRow,
    shopping_list::ShoppingList,
};

use sqlx::{Pool, Postgres};

/// Totals of every ingredient across the recipes in the requester's cart.
pub async fn fetch_shopping_list(
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<ShoppingList, Error> {
    session.authenticate(ActionType::ManageOwnCart)?;

    let rows: Vec<CartIngredientRow> = sqlx::query_as(
        "
        SELECT i.name AS name, i.measurement_unit AS measurement_unit, ia.amount AS amount
        FROM shopping_cart c
        INNER JOIN ingredient_amounts ia ON ia.recipe_id = c.recipe_id
        INNER JOIN ingredients i ON i.id = ia.ingredient_id
        WHERE c.user_id = $1
    ",
    )
    .bind(session.user_id)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(ShoppingList::aggregate(rows))
}
