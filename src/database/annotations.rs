use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use serde::Serialize;
use sqlx::{Pool, Postgres};

use crate::{
    error::{Error, QueryError},
    jwt::SessionData,
    schema::Id,
};

/// Batched existence checks over the per-user link tables.
#[async_trait]
pub trait RelationLookup: Sync {
    /// Recipes among `recipe_ids` that `user_id` has favorited.
    async fn favorited_among(&self, user_id: Id, recipe_ids: &[Id]) -> Result<HashSet<Id>, Error>;

    /// Recipes among `recipe_ids` that sit in `user_id`'s shopping cart.
    async fn in_cart_among(&self, user_id: Id, recipe_ids: &[Id]) -> Result<HashSet<Id>, Error>;

    /// Authors among `author_ids` that `user_id` follows.
    async fn followed_among(&self, user_id: Id, author_ids: &[Id]) -> Result<HashSet<Id>, Error>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RecipeFlags {
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
}

/// Flags for every id in `recipe_ids`. Anonymous requesters get all-false
/// flags and `lookup` is never consulted.
pub async fn annotate_recipes<L>(
    lookup: &L,
    requester: Option<&SessionData>,
    recipe_ids: &[Id],
) -> Result<HashMap<Id, RecipeFlags>, Error>
where
    L: RelationLookup + ?Sized,
{
    let session = match requester {
        Some(session) if !recipe_ids.is_empty() => session,
        _ => {
            return Ok(recipe_ids
                .iter()
                .map(|id| (*id, RecipeFlags::default()))
                .collect())
        }
    };

    let favorited = lookup.favorited_among(session.user_id, recipe_ids).await?;
    let in_cart = lookup.in_cart_among(session.user_id, recipe_ids).await?;

    Ok(recipe_ids
        .iter()
        .map(|id| {
            (
                *id,
                RecipeFlags {
                    is_favorited: favorited.contains(id),
                    is_in_shopping_cart: in_cart.contains(id),
                },
            )
        })
        .collect())
}

/// `is_subscribed` for every id in `author_ids`, false for anonymous requesters.
pub async fn annotate_authors<L>(
    lookup: &L,
    requester: Option<&SessionData>,
    author_ids: &[Id],
) -> Result<HashMap<Id, bool>, Error>
where
    L: RelationLookup + ?Sized,
{
    let followed = match requester {
        Some(session) if !author_ids.is_empty() => {
            lookup.followed_among(session.user_id, author_ids).await?
        }
        _ => HashSet::new(),
    };

    Ok(author_ids
        .iter()
        .map(|id| (*id, followed.contains(id)))
        .collect())
}

async fn select_ids(
    pool: &Pool<Postgres>,
    query: &str,
    user_id: Id,
    ids: &[Id],
) -> Result<HashSet<Id>, Error> {
    let rows: Vec<(Id,)> = sqlx::query_as(query)
        .bind(user_id)
        .bind(ids)
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(rows.into_iter().map(|row| row.0).collect())
}

#[async_trait]
impl RelationLookup for Pool<Postgres> {
    async fn favorited_among(&self, user_id: Id, recipe_ids: &[Id]) -> Result<HashSet<Id>, Error> {
        select_ids(
            self,
            "SELECT recipe_id FROM favorites WHERE user_id = $1 AND recipe_id = ANY($2)",
            user_id,
            recipe_ids,
        )
        .await
    }

    async fn in_cart_among(&self, user_id: Id, recipe_ids: &[Id]) -> Result<HashSet<Id>, Error> {
        select_ids(
            self,
            "SELECT recipe_id FROM shopping_cart WHERE user_id = $1 AND recipe_id = ANY($2)",
            user_id,
            recipe_ids,
        )
        .await
    }

    async fn followed_among(&self, user_id: Id, author_ids: &[Id]) -> Result<HashSet<Id>, Error> {
        select_ids(
            self,
            "SELECT author_id FROM follows WHERE user_id = $1 AND author_id = ANY($2)",
            user_id,
            author_ids,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    };

    use super::*;
    use crate::schema::UserRole;
    use pretty_assertions::assert_eq;

    /// In-memory link tables that count how often they are asked.
    #[derive(Default)]
    struct MemoryRelations {
        pub favorites: Mutex<HashSet<(Id, Id)>>,
        pub cart: Mutex<HashSet<(Id, Id)>>,
        pub follows: Mutex<HashSet<(Id, Id)>>,
        pub queries: AtomicUsize,
    }

    impl MemoryRelations {
        fn among(&self, table: &Mutex<HashSet<(Id, Id)>>, user_id: Id, ids: &[Id]) -> HashSet<Id> {
            self.queries.fetch_add(1, Ordering::SeqCst);
            let table = table.lock().unwrap();
            ids.iter()
                .copied()
                .filter(|id| table.contains(&(user_id, *id)))
                .collect()
        }
    }

    #[async_trait]
    impl RelationLookup for MemoryRelations {
        async fn favorited_among(&self, user_id: Id, recipe_ids: &[Id]) -> Result<HashSet<Id>, Error> {
            Ok(self.among(&self.favorites, user_id, recipe_ids))
        }

        async fn in_cart_among(&self, user_id: Id, recipe_ids: &[Id]) -> Result<HashSet<Id>, Error> {
            Ok(self.among(&self.cart, user_id, recipe_ids))
        }

        async fn followed_among(&self, user_id: Id, author_ids: &[Id]) -> Result<HashSet<Id>, Error> {
            Ok(self.among(&self.follows, user_id, author_ids))
        }
    }

    fn session(user_id: Id) -> SessionData {
        SessionData {
            user_id,
            username: format!("user{user_id}"),
            role: UserRole::Authorized,
            is_admin: false,
            is_staff: false,
        }
    }

    #[tokio::test]
    async fn favorite_flag_follows_the_link_row() {
        let relations = MemoryRelations::default();
        let user = session(1);

        let flags = annotate_recipes(&relations, Some(&user), &[10]).await.unwrap();
        assert!(!flags[&10].is_favorited);

        relations.favorites.lock().unwrap().insert((1, 10));
        let flags = annotate_recipes(&relations, Some(&user), &[10]).await.unwrap();
        assert!(flags[&10].is_favorited);
        assert!(!flags[&10].is_in_shopping_cart);

        relations.favorites.lock().unwrap().remove(&(1, 10));
        let flags = annotate_recipes(&relations, Some(&user), &[10]).await.unwrap();
        assert!(!flags[&10].is_favorited);
    }

    #[tokio::test]
    async fn flags_are_per_user() {
        let relations = MemoryRelations::default();
        relations.cart.lock().unwrap().insert((2, 10));
        relations.favorites.lock().unwrap().insert((2, 11));

        let flags = annotate_recipes(&relations, Some(&session(2)), &[10, 11, 12])
            .await
            .unwrap();
        assert_eq!(
            flags[&10],
            RecipeFlags {
                is_favorited: false,
                is_in_shopping_cart: true
            }
        );
        assert!(flags[&11].is_favorited);
        assert_eq!(flags[&12], RecipeFlags::default());

        let flags = annotate_recipes(&relations, Some(&session(3)), &[10, 11])
            .await
            .unwrap();
        assert!(flags.values().all(|flags| *flags == RecipeFlags::default()));
    }

    #[tokio::test]
    async fn anonymous_requesters_never_query() {
        let relations = MemoryRelations::default();
        relations.favorites.lock().unwrap().insert((1, 10));
        relations.cart.lock().unwrap().insert((1, 10));
        relations.follows.lock().unwrap().insert((1, 5));

        let flags = annotate_recipes(&relations, None, &[10, 11]).await.unwrap();
        assert_eq!(flags.len(), 2);
        assert!(flags.values().all(|flags| *flags == RecipeFlags::default()));

        let subscribed = annotate_authors(&relations, None, &[5]).await.unwrap();
        assert!(!subscribed[&5]);

        assert_eq!(relations.queries.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn subscriptions_are_annotated() {
        let relations = MemoryRelations::default();
        relations.follows.lock().unwrap().insert((1, 5));

        let subscribed = annotate_authors(&relations, Some(&session(1)), &[5, 6])
            .await
            .unwrap();
        assert!(subscribed[&5]);
        assert!(!subscribed[&6]);
    }
}
