use std::collections::HashSet;

use serde::Deserialize;

use crate::{
    config::Limits,
    constants::{
        MAX_EMAIL_LENGTH, MAX_NAME_LENGTH, MAX_TAG_LENGTH, MIN_PASSWORD_LENGTH, RESERVED_USERNAMES,
    },
    error::{Error, HtmlError},
    schema::Id,
};

const REQUIRED: &str = "This field is required.";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IngredientForm {
    pub id: Id,
    pub amount: i32,
}

/// Body of recipe create and update requests, as submitted.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecipeForm {
    pub name: Option<String>,
    pub text: Option<String>,
    pub cooking_time: Option<i32>,
    pub image: Option<String>,
    #[serde(default)]
    pub tags: Vec<Id>,
    #[serde(default)]
    pub ingredients: Vec<IngredientForm>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidRecipe {
    pub name: String,
    pub text: String,
    pub cooking_time: i32,
    pub image: Option<String>,
    pub tags: Vec<Id>,
    pub ingredients: Vec<IngredientForm>,
}

fn required_text(field: &str, value: Option<String>, max_length: Option<usize>) -> Result<String, Error> {
    let value = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| Error::field(field, REQUIRED))?;

    if let Some(max_length) = max_length {
        if value.chars().count() > max_length {
            return Err(Error::field(
                field,
                &format!("Ensure this field has no more than {max_length} characters."),
            ));
        }
    }
    Ok(value)
}

/// Runs the recipe checks in order; the first failure is returned.
pub fn validate_recipe(form: RecipeForm, limits: &Limits) -> Result<ValidRecipe, Error> {
    let name = required_text("name", form.name, Some(MAX_NAME_LENGTH))?;
    let text = required_text("text", form.text, None)?;
    let cooking_time = form
        .cooking_time
        .ok_or_else(|| Error::field("cooking_time", REQUIRED))?;

    if !(limits.min_cooking_time..=limits.max_cooking_time).contains(&cooking_time) {
        return Err(Error::field(
            "cooking_time",
            &format!(
                "Cooking time must be between {} and {} minutes.",
                limits.min_cooking_time, limits.max_cooking_time
            ),
        ));
    }

    if form.tags.is_empty() {
        return Err(Error::field("tags", "Choose at least one tag."));
    }

    if form.ingredients.is_empty() {
        return Err(Error::field("ingredients", "A recipe needs at least one ingredient."));
    }

    let mut seen = HashSet::new();
    if form.ingredients.iter().any(|ingredient| !seen.insert(ingredient.id)) {
        return Err(Error::field("ingredients", "Ingredients are repeated."));
    }

    if let Some(ingredient) = form
        .ingredients
        .iter()
        .find(|ingredient| !(limits.min_amount..=limits.max_amount).contains(&ingredient.amount))
    {
        return Err(Error::field(
            "ingredients",
            &format!(
                "Amount of ingredient {} must be between {} and {}.",
                ingredient.id, limits.min_amount, limits.max_amount
            ),
        ));
    }

    let mut seen = HashSet::new();
    let tags = form.tags.into_iter().filter(|tag| seen.insert(*tag)).collect();

    Ok(ValidRecipe {
        name,
        text,
        cooking_time,
        image: form.image.filter(|image| !image.trim().is_empty()),
        tags,
        ingredients: form.ingredients,
    })
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegistrationForm {
    pub email: Option<String>,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidRegistration {
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
}

fn is_email(value: &str) -> bool {
    match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !value.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

pub fn validate_registration(form: RegistrationForm) -> Result<ValidRegistration, Error> {
    let email = required_text("email", form.email, Some(MAX_EMAIL_LENGTH))?;
    if !is_email(&email) {
        return Err(Error::field("email", "Enter a valid email address."));
    }

    let username = required_text("username", form.username, Some(MAX_NAME_LENGTH))?;
    if RESERVED_USERNAMES.contains(&username.as_str()) {
        return Err(Error::field(
            "username",
            &format!("Username \"{username}\" is reserved."),
        ));
    }
    if !username
        .chars()
        .all(|c| c.is_alphanumeric() || "_.@+-".contains(c))
    {
        return Err(Error::field(
            "username",
            "Username may contain only letters, digits and @/./+/-/_ characters.",
        ));
    }

    let first_name = required_text("first_name", form.first_name, Some(MAX_NAME_LENGTH))?;
    let last_name = required_text("last_name", form.last_name, Some(MAX_NAME_LENGTH))?;

    let password = form
        .password
        .filter(|password| !password.is_empty())
        .ok_or_else(|| Error::field("password", REQUIRED))?;

    Ok(ValidRegistration {
        email: email.to_lowercase(),
        username,
        first_name,
        last_name,
        password,
    })
}

pub fn validate_new_password(password: &str) -> Result<(), Error> {
    if password.is_empty() {
        return Err(Error::field("new_password", REQUIRED));
    }
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(Error::field(
            "new_password",
            &format!("This password is too short. It must contain at least {MIN_PASSWORD_LENGTH} characters."),
        ));
    }
    if password.chars().all(|c| c.is_ascii_digit()) {
        return Err(Error::field("new_password", "This password is entirely numeric."));
    }
    Ok(())
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginForm {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Email and password, both required.
pub fn validate_login(form: LoginForm) -> Result<(String, String), Error> {
    let email = required_text("email", form.email, Some(MAX_EMAIL_LENGTH))?;
    let password = form
        .password
        .filter(|password| !password.is_empty())
        .ok_or_else(|| Error::field("password", REQUIRED))?;

    Ok((email, password))
}

#[derive(Debug, Clone, Deserialize)]
pub struct PasswordForm {
    pub current_password: Option<String>,
    pub new_password: Option<String>,
}

pub fn validate_password_change(form: PasswordForm) -> Result<(String, String), Error> {
    let current_password = form
        .current_password
        .filter(|password| !password.is_empty())
        .ok_or_else(|| Error::field("current_password", REQUIRED))?;
    let new_password = form.new_password.unwrap_or_default();
    validate_new_password(&new_password)?;

    Ok((current_password, new_password))
}

#[derive(Debug, Clone, Deserialize)]
pub struct TagForm {
    pub name: Option<String>,
    pub color: Option<String>,
    pub slug: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidTag {
    pub name: String,
    pub color: String,
    pub slug: String,
}

fn is_hex_color(value: &str) -> bool {
    value.len() == 7
        && value.starts_with('#')
        && value[1..].chars().all(|c| c.is_ascii_hexdigit())
}

pub fn validate_tag(form: TagForm) -> Result<ValidTag, Error> {
    let name = required_text("name", form.name, Some(MAX_TAG_LENGTH))?;

    let color = required_text("color", form.color, None)?;
    if !is_hex_color(&color) {
        return Err(Error::field("color", "Color must be a HEX code like #49B64E."));
    }

    let slug = required_text("slug", form.slug, Some(MAX_TAG_LENGTH))?;
    if !slug
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(Error::field(
            "slug",
            "Slug may contain only letters, numbers, underscores or hyphens.",
        ));
    }

    Ok(ValidTag {
        name,
        color: color.to_uppercase(),
        slug,
    })
}

#[derive(Debug, Clone, Deserialize)]
pub struct IngredientCreateForm {
    pub name: Option<String>,
    pub measurement_unit: Option<String>,
}

pub fn validate_ingredient(form: IngredientCreateForm) -> Result<(String, String), Error> {
    let name = required_text("name", form.name, Some(MAX_NAME_LENGTH))?;
    let measurement_unit =
        required_text("measurement_unit", form.measurement_unit, Some(MAX_NAME_LENGTH))?;

    Ok((name, measurement_unit))
}

/// A user may follow anybody except themselves. Storage does not enforce this.
pub fn check_follow(user_id: Id, author_id: Id) -> Result<(), Error> {
    if user_id == author_id {
        return Err(HtmlError::InvalidRequest.new("You cannot follow yourself"));
    }
    Ok(())
}
