use std::collections::{HashMap, HashSet};

use crate::{
    annotations::{annotate_authors, annotate_recipes},
    authentication::permissions::ActionType,
    error::{Error, HtmlError, QueryError},
    form::Form,
    jwt::SessionData,
    pagination::{PageContext, Pagination},
    schema::{Id, Recipe, RecipePart, RecipeRow, User},
    validation::ValidRecipe,
    views::{RecipeView, UserView},
};

use super::{tags::list_recipe_tags, users::get_users_by_ids};

use sqlx::{Pool, Postgres, QueryBuilder, Transaction};

/// Narrowing options of the recipe list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipeFilter {
    pub author: Option<Id>,
    /// Tag slugs; a recipe matches when it carries any of them.
    pub tags: Vec<String>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
}

impl RecipeFilter {
    pub fn from_form(form: &Form) -> Result<Self, Error> {
        Ok(Self {
            author: form.get_number::<Id>("author")?,
            tags: form.get_all("tags"),
            is_favorited: form.get_flag("is_favorited"),
            is_in_shopping_cart: form.get_flag("is_in_shopping_cart"),
        })
    }

    fn is_personal(&self) -> bool {
        self.is_favorited || self.is_in_shopping_cart
    }
}

pub async fn fetch_recipes(
    requester: Option<&SessionData>,
    filter: &RecipeFilter,
    pagination: Pagination,
    pool: &Pool<Postgres>,
) -> Result<PageContext<RecipeView>, Error> {
    let session = match requester {
        Some(session) => Some(session),
        None if filter.is_personal() => return Ok(PageContext::no_rows()),
        None => None,
    };

    let mut query =
        QueryBuilder::<Postgres>::new("SELECT r.*, COUNT(*) OVER() AS count FROM recipes r WHERE TRUE");

    if let Some(author) = filter.author {
        query.push(" AND r.author_id = ").push_bind(author);
    }
    if !filter.tags.is_empty() {
        query
            .push(
                " AND EXISTS (SELECT 1 FROM recipe_tags rt INNER JOIN tags t ON t.id = rt.tag_id WHERE rt.recipe_id = r.id AND t.slug = ANY(",
            )
            .push_bind(filter.tags.clone())
            .push("))");
    }
    if let Some(session) = session {
        if filter.is_favorited {
            query
                .push(" AND EXISTS (SELECT 1 FROM favorites f WHERE f.recipe_id = r.id AND f.user_id = ")
                .push_bind(session.user_id)
                .push(")");
        }
        if filter.is_in_shopping_cart {
            query
                .push(" AND EXISTS (SELECT 1 FROM shopping_cart c WHERE c.recipe_id = r.id AND c.user_id = ")
                .push_bind(session.user_id)
                .push(")");
        }
    }

    query
        .push(" ORDER BY r.pub_date DESC, r.id DESC LIMIT ")
        .push_bind(pagination.limit)
        .push(" OFFSET ")
        .push_bind(pagination.offset());

    let rows: Vec<RecipeRow> = query
        .build_query_as()
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;

    let total_count = rows.first().map(|row| row.count).unwrap_or(0);
    let recipes = rows.into_iter().map(Recipe::from).collect();
    let views = load_recipe_views(requester, recipes, pool).await?;

    PageContext::from_rows(views, total_count, pagination)
}

/// Ingredient lines of each recipe in `recipe_ids`, in the order they were added.
pub async fn list_recipe_parts(
    pool: &Pool<Postgres>,
    recipe_ids: &[Id],
) -> Result<HashMap<Id, Vec<RecipePart>>, Error> {
    let rows: Vec<RecipePart> = sqlx::query_as(
        "
        SELECT ia.recipe_id AS recipe_id, i.id AS ingredient_id, i.name AS name,
               i.measurement_unit AS measurement_unit, ia.amount AS amount
        FROM ingredient_amounts ia
        INNER JOIN ingredients i ON i.id = ia.ingredient_id
        WHERE ia.recipe_id = ANY($1)
        ORDER BY ia.id
    ",
    )
    .bind(recipe_ids)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    let mut hashmap: HashMap<Id, Vec<RecipePart>> = HashMap::new();
    for part in rows {
        hashmap.entry(part.recipe_id).or_default().push(part);
    }
    Ok(hashmap)
}

/// Builds full views for `recipes`, keeping their order. Every relation is
/// fetched once for the whole batch.
pub async fn load_recipe_views(
    requester: Option<&SessionData>,
    recipes: Vec<Recipe>,
    pool: &Pool<Postgres>,
) -> Result<Vec<RecipeView>, Error> {
    if recipes.is_empty() {
        return Ok(vec![]);
    }

    let recipe_ids: Vec<Id> = recipes.iter().map(|recipe| recipe.id).collect();
    let mut author_ids: Vec<Id> = recipes.iter().map(|recipe| recipe.author_id).collect();
    author_ids.sort_unstable();
    author_ids.dedup();

    let authors: HashMap<Id, User> = get_users_by_ids(pool, &author_ids)
        .await?
        .into_iter()
        .map(|user| (user.id, user))
        .collect();
    let subscribed = annotate_authors(pool, requester, &author_ids).await?;
    let mut tags = list_recipe_tags(pool, &recipe_ids).await?;
    let mut parts = list_recipe_parts(pool, &recipe_ids).await?;
    let flags = annotate_recipes(pool, requester, &recipe_ids).await?;

    let mut views = Vec::with_capacity(recipes.len());
    for recipe in recipes {
        let author = match authors.get(&recipe.author_id) {
            Some(author) => UserView::from_user(
                author,
                subscribed.get(&author.id).copied().unwrap_or(false),
            ),
            None => {
                log::error!("Recipe {} has no author {}", recipe.id, recipe.author_id);
                return Err(HtmlError::InternalServerError.default());
            }
        };
        let id = recipe.id;
        views.push(RecipeView::assemble(
            recipe,
            author,
            tags.remove(&id).unwrap_or_default(),
            parts.remove(&id).unwrap_or_default(),
            flags.get(&id).copied().unwrap_or_default(),
        ));
    }
    Ok(views)
}

pub async fn get_recipe(id: Id, pool: &Pool<Postgres>) -> Result<Option<Recipe>, Error> {
    let row: Option<Recipe> = sqlx::query_as("SELECT * FROM recipes WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row)
}

pub async fn get_recipe_view(
    requester: Option<&SessionData>,
    id: Id,
    pool: &Pool<Postgres>,
) -> Result<RecipeView, Error> {
    let recipe = get_recipe(id, pool)
        .await?
        .ok_or_else(|| HtmlError::NotFound.new("No recipe exists with specified id"))?;

    load_recipe_views(requester, vec![recipe], pool)
        .await?
        .pop()
        .ok_or_else(|| HtmlError::InternalServerError.default())
}

/// Fetches a recipe the session is allowed to change.
pub async fn get_recipe_mut(
    id: Id,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<Recipe, Error> {
    session.authenticate(ActionType::ManageOwnRecipes)?;
    let recipe = get_recipe(id, pool).await?;

    match recipe {
        Some(recipe) => match session.authenticate(ActionType::ManageAllRecipes) {
            Ok(_) => Ok(recipe),
            Err(_) => {
                if recipe.author_id != session.user_id {
                    Err(HtmlError::Forbidden.new("Only the author may change this recipe"))
                } else {
                    Ok(recipe)
                }
            }
        },
        None => Err(HtmlError::NotFound.new("No recipe exists with specified id")),
    }
}

/// Ids among `ids` that have a row in `table`.
async fn existing_ids(
    tx: &mut Transaction<'_, Postgres>,
    table: &str,
    ids: &[Id],
) -> Result<HashSet<Id>, Error> {
    let rows: Vec<(Id,)> = sqlx::query_as(&format!("SELECT id FROM {table} WHERE id = ANY($1)"))
        .bind(ids)
        .fetch_all(&mut **tx)
        .await
        .map_err(QueryError::from)?;

    Ok(rows.into_iter().map(|row| row.0).collect())
}

/// Every tag and ingredient the recipe names must exist.
async fn ensure_references(
    tx: &mut Transaction<'_, Postgres>,
    recipe: &ValidRecipe,
) -> Result<(), Error> {
    let tags = existing_ids(tx, "tags", &recipe.tags).await?;
    if let Some(id) = recipe.tags.iter().find(|id| !tags.contains(id)) {
        return Err(HtmlError::NotFound.field("tags", &format!("Unknown tag {id}")));
    }

    let ingredient_ids: Vec<Id> = recipe.ingredients.iter().map(|i| i.id).collect();
    let ingredients = existing_ids(tx, "ingredients", &ingredient_ids).await?;
    if let Some(id) = ingredient_ids.iter().find(|id| !ingredients.contains(id)) {
        return Err(HtmlError::NotFound.field("ingredients", &format!("Unknown ingredient {id}")));
    }
    Ok(())
}

async fn insert_links(
    tx: &mut Transaction<'_, Postgres>,
    recipe_id: Id,
    recipe: &ValidRecipe,
) -> Result<(), Error> {
    let mut query = QueryBuilder::<Postgres>::new("INSERT INTO recipe_tags (recipe_id, tag_id) ");
    query.push_values(recipe.tags.iter(), |mut row, tag| {
        row.push_bind(recipe_id).push_bind(*tag);
    });
    query
        .build()
        .execute(&mut **tx)
        .await
        .map_err(QueryError::from)?;

    let mut query = QueryBuilder::<Postgres>::new(
        "INSERT INTO ingredient_amounts (recipe_id, ingredient_id, amount) ",
    );
    query.push_values(recipe.ingredients.iter(), |mut row, ingredient| {
        row.push_bind(recipe_id)
            .push_bind(ingredient.id)
            .push_bind(ingredient.amount);
    });
    query
        .build()
        .execute(&mut **tx)
        .await
        .map_err(QueryError::from)?;

    Ok(())
}

pub async fn create_recipe(
    session: &SessionData,
    recipe: ValidRecipe,
    pool: &Pool<Postgres>,
) -> Result<Id, Error> {
    session.authenticate(ActionType::CreateRecipes)?;

    let mut tx = pool.begin().await.map_err(QueryError::from)?;
    ensure_references(&mut tx, &recipe).await?;

    let id: (Id,) = sqlx::query_as(
        "
        INSERT INTO recipes (author_id, name, text, image, cooking_time)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
    ",
    )
    .bind(session.user_id)
    .bind(&recipe.name)
    .bind(&recipe.text)
    .bind(&recipe.image)
    .bind(recipe.cooking_time)
    .fetch_one(&mut *tx)
    .await
    .map_err(QueryError::from)?;

    insert_links(&mut tx, id.0, &recipe).await?;
    tx.commit().await.map_err(QueryError::from)?;

    log::info!("User {} created recipe {}", session.user_id, id.0);
    Ok(id.0)
}

/// Replaces the recipe fields, tags and ingredients in one transaction.
pub async fn update_recipe(
    session: &SessionData,
    id: Id,
    recipe: ValidRecipe,
    pool: &Pool<Postgres>,
) -> Result<(), Error> {
    let stored = get_recipe_mut(id, session, pool).await?;

    let mut tx = pool.begin().await.map_err(QueryError::from)?;
    ensure_references(&mut tx, &recipe).await?;

    sqlx::query(
        "UPDATE recipes SET name = $1, text = $2, cooking_time = $3, image = COALESCE($4, image) WHERE id = $5",
    )
    .bind(&recipe.name)
    .bind(&recipe.text)
    .bind(recipe.cooking_time)
    .bind(&recipe.image)
    .bind(stored.id)
    .execute(&mut *tx)
    .await
    .map_err(QueryError::from)?;

    sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = $1")
        .bind(stored.id)
        .execute(&mut *tx)
        .await
        .map_err(QueryError::from)?;
    sqlx::query("DELETE FROM ingredient_amounts WHERE recipe_id = $1")
        .bind(stored.id)
        .execute(&mut *tx)
        .await
        .map_err(QueryError::from)?;

    insert_links(&mut tx, stored.id, &recipe).await?;
    tx.commit().await.map_err(QueryError::from)?;

    log::info!("User {} updated recipe {}", session.user_id, stored.id);
    Ok(())
}

pub async fn delete_recipe(
    session: &SessionData,
    id: Id,
    pool: &Pool<Postgres>,
) -> Result<(), Error> {
    let recipe = get_recipe_mut(id, session, pool).await?;

    sqlx::query("DELETE FROM recipes WHERE id = $1")
        .bind(recipe.id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    log::info!("User {} deleted recipe {}", session.user_id, recipe.id);
    Ok(())
}
