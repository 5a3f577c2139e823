//! Output shapes returned by the API, one per view, each built by an
//! explicit mapping from the stored entities.

use serde::Serialize;

use super::{
    annotations::RecipeFlags,
    schema::{Id, Recipe, RecipePart, Tag, User},
};

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct UserView {
    pub email: String,
    pub id: Id,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_subscribed: bool,
}

impl UserView {
    pub fn from_user(user: &User, is_subscribed: bool) -> Self {
        Self {
            email: user.email.to_owned(),
            id: user.id,
            username: user.username.to_owned(),
            first_name: user.first_name.to_owned(),
            last_name: user.last_name.to_owned(),
            is_subscribed,
        }
    }
}

/// Returned once on registration; there is nobody to be subscribed yet.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct CreatedUserView {
    pub email: String,
    pub id: Id,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

impl From<&User> for CreatedUserView {
    fn from(user: &User) -> Self {
        Self {
            email: user.email.to_owned(),
            id: user.id,
            username: user.username.to_owned(),
            first_name: user.first_name.to_owned(),
            last_name: user.last_name.to_owned(),
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct IngredientAmountView {
    pub id: Id,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

impl From<RecipePart> for IngredientAmountView {
    fn from(part: RecipePart) -> Self {
        Self {
            id: part.ingredient_id,
            name: part.name,
            measurement_unit: part.measurement_unit,
            amount: part.amount,
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct RecipeView {
    pub id: Id,
    pub tags: Vec<Tag>,
    pub author: UserView,
    pub ingredients: Vec<IngredientAmountView>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub name: String,
    pub image: Option<String>,
    pub text: String,
    pub cooking_time: i32,
}

impl RecipeView {
    pub fn assemble(
        recipe: Recipe,
        author: UserView,
        tags: Vec<Tag>,
        ingredients: Vec<RecipePart>,
        flags: RecipeFlags,
    ) -> Self {
        Self {
            id: recipe.id,
            tags,
            author,
            ingredients: ingredients.into_iter().map(IngredientAmountView::from).collect(),
            is_favorited: flags.is_favorited,
            is_in_shopping_cart: flags.is_in_shopping_cart,
            name: recipe.name,
            image: recipe.image,
            text: recipe.text,
            cooking_time: recipe.cooking_time,
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct RecipeShortView {
    pub id: Id,
    pub name: String,
    pub image: Option<String>,
    pub cooking_time: i32,
}

impl From<&Recipe> for RecipeShortView {
    fn from(recipe: &Recipe) -> Self {
        Self {
            id: recipe.id,
            name: recipe.name.to_owned(),
            image: recipe.image.to_owned(),
            cooking_time: recipe.cooking_time,
        }
    }
}

/// An author as seen from the follower's subscriptions page.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct FollowView {
    #[serde(flatten)]
    pub author: UserView,
    pub recipes: Vec<RecipeShortView>,
    pub recipes_count: i64,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct TokenView {
    pub auth_token: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn recipe() -> Recipe {
        Recipe {
            id: 7,
            author_id: 1,
            name: String::from("Pancakes"),
            text: String::from("Mix and fry."),
            image: Some(String::from("recipes/pancakes.png")),
            cooking_time: 20,
            pub_date: Utc::now(),
        }
    }

    fn author() -> UserView {
        UserView {
            email: String::from("chef@example.com"),
            id: 1,
            username: String::from("chef"),
            first_name: String::from("Ivan"),
            last_name: String::from("Petrov"),
            is_subscribed: true,
        }
    }

    #[test]
    fn full_recipe_shape() {
        let tag = Tag {
            id: 2,
            name: String::from("Breakfast"),
            color: String::from("#E26C2D"),
            slug: String::from("breakfast"),
        };
        let parts = vec![
            RecipePart {
                recipe_id: 7,
                ingredient_id: 3,
                name: String::from("flour"),
                measurement_unit: String::from("g"),
                amount: 200,
            },
            RecipePart {
                recipe_id: 7,
                ingredient_id: 4,
                name: String::from("sugar"),
                measurement_unit: String::from("g"),
                amount: 200,
            },
        ];
        let flags = RecipeFlags {
            is_favorited: true,
            is_in_shopping_cart: false,
        };

        let view = RecipeView::assemble(recipe(), author(), vec![tag], parts, flags);
        let value = serde_json::to_value(&view).unwrap();

        assert_eq!(value["ingredients"][0], json!({"id": 3, "name": "flour", "measurement_unit": "g", "amount": 200}));
        assert_eq!(value["ingredients"][1]["amount"], json!(200));
        assert_eq!(value["tags"][0]["slug"], json!("breakfast"));
        assert_eq!(value["author"]["is_subscribed"], json!(true));
        assert_eq!(value["is_favorited"], json!(true));
        assert_eq!(value["is_in_shopping_cart"], json!(false));
    }

    #[test]
    fn short_recipe_shape() {
        let value = serde_json::to_value(RecipeShortView::from(&recipe())).unwrap();
        assert_eq!(
            value,
            json!({"id": 7, "name": "Pancakes", "image": "recipes/pancakes.png", "cooking_time": 20})
        );
    }

    #[test]
    fn follow_view_flattens_author() {
        let view = FollowView {
            author: author(),
            recipes: vec![RecipeShortView::from(&recipe())],
            recipes_count: 4,
        };
        let value = serde_json::to_value(&view).unwrap();
        assert_eq!(value["username"], json!("chef"));
        assert_eq!(value["recipes_count"], json!(4));
        assert_eq!(value["recipes"][0]["id"], json!(7));
    }
}
