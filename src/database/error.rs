use std::{collections::BTreeMap, convert::Infallible};

use serde_json::json;
use warp::{
    http::StatusCode,
    reject::{self, Rejection},
    reply::Response,
    Reply,
};

/// Constraint names from the schema migration mapped to the message a client sees.
const CONSTRAINT_MESSAGES: &[(&str, &str)] = &[
    ("users_email_key", "A user with that email already exists"),
    ("users_username_key", "A user with that username already exists"),
    ("unique_ingredient", "Ingredient with this name and unit already exists"),
    ("tags_name_key", "A tag with that name already exists"),
    ("tags_color_key", "A tag with that color already exists"),
    ("tags_slug_key", "A tag with that slug already exists"),
    ("unique_recipe_per_author", "You already have a recipe with this name"),
    ("unique_ingredient_amount", "Ingredients are repeated"),
    ("unique_favorite", "Recipe is already in favorites"),
    ("unique_shopping_cart", "Recipe is already in the shopping cart"),
    ("unique_follow", "You are already following this author"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HtmlError {
    InvalidRequest,
    InvalidSession,
    Unauthorized,
    Forbidden,
    NotFound,
    MethodNotAllowed,
    Conflict,
    InternalServerError,
}

impl HtmlError {
    pub fn status(&self) -> StatusCode {
        match self {
            HtmlError::InvalidRequest => StatusCode::BAD_REQUEST,
            HtmlError::InvalidSession | HtmlError::Unauthorized => StatusCode::UNAUTHORIZED,
            HtmlError::Forbidden => StatusCode::FORBIDDEN,
            HtmlError::NotFound => StatusCode::NOT_FOUND,
            HtmlError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            HtmlError::Conflict => StatusCode::CONFLICT,
            HtmlError::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> &'static str {
        match self {
            HtmlError::InvalidRequest => "Invalid request",
            HtmlError::InvalidSession => "Invalid session",
            HtmlError::Unauthorized => "Authentication credentials were not provided",
            HtmlError::Forbidden => "You don't have permission to perform this action",
            HtmlError::NotFound => "Not found",
            HtmlError::MethodNotAllowed => "Method not allowed",
            HtmlError::Conflict => "Object already exists",
            HtmlError::InternalServerError => "Internal server error",
        }
    }

    pub fn new(self, info: &str) -> Error {
        Error {
            kind: self,
            info: info.to_string(),
            fields: BTreeMap::new(),
        }
    }

    /// An error of this kind attached to a single input field.
    pub fn field(self, field: &str, message: &str) -> Error {
        let mut error = self.default();
        error
            .fields
            .insert(field.to_string(), vec![message.to_string()]);
        error
    }

    pub fn default(self) -> Error {
        Error {
            kind: self,
            info: self.message().to_string(),
            fields: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("{kind:?}: {info}")]
pub struct Error {
    pub kind: HtmlError,
    pub info: String,
    pub fields: BTreeMap<String, Vec<String>>,
}

impl Error {
    /// Validation failure attached to a single input field.
    pub fn field(field: &str, message: &str) -> Self {
        HtmlError::InvalidRequest.field(field, message)
    }

    pub fn status(&self) -> StatusCode {
        self.kind.status()
    }

    pub fn into_response(self) -> Response {
        let body = if self.fields.is_empty() {
            json!({ "detail": self.info })
        } else {
            json!(self.fields)
        };

        warp::reply::with_status(warp::reply::json(&body), self.status()).into_response()
    }
}

impl reject::Reject for Error {}

pub struct QueryError {
    kind: HtmlError,
    info: String,
}

impl QueryError {
    pub fn new(kind: HtmlError, info: String) -> Self {
        Self { kind, info }
    }

    fn constraint_message(constraint: Option<&str>) -> String {
        constraint
            .and_then(|name| {
                CONSTRAINT_MESSAGES
                    .iter()
                    .find(|(constraint, _)| *constraint == name)
                    .map(|(_, message)| message.to_string())
            })
            .unwrap_or_else(|| HtmlError::Conflict.message().to_string())
    }
}

impl From<sqlx::Error> for QueryError {
    fn from(value: sqlx::Error) -> Self {
        match value {
            sqlx::Error::Database(e) if e.is_unique_violation() => Self::new(
                HtmlError::Conflict,
                Self::constraint_message(e.constraint()),
            ),
            sqlx::Error::Database(e) if e.is_foreign_key_violation() => Self::new(
                HtmlError::NotFound,
                format!("Referenced object does not exist ({})", e.constraint().unwrap_or("-")),
            ),
            sqlx::Error::Database(e) if e.is_check_violation() => Self::new(
                HtmlError::InvalidRequest,
                format!("Value out of range ({})", e.constraint().unwrap_or("-")),
            ),
            sqlx::Error::RowNotFound => Self::new(HtmlError::NotFound, String::from("RowNotFound")),
            sqlx::Error::PoolTimedOut => {
                Self::new(HtmlError::InternalServerError, String::from("Pool timed out"))
            }
            sqlx::Error::PoolClosed => {
                Self::new(HtmlError::InternalServerError, String::from("Pool closed"))
            }
            e => Self::new(HtmlError::InternalServerError, format!("{e}")),
        }
    }
}

impl From<QueryError> for Error {
    fn from(value: QueryError) -> Self {
        if value.kind == HtmlError::InternalServerError {
            log::error!("> Query failed: {}", value.info);
            return value.kind.default();
        }
        value.kind.new(&value.info)
    }
}

pub async fn handle_rejection(err: Rejection) -> Result<Response, Infallible> {
    let error = if let Some(e) = err.find::<Error>() {
        e.clone()
    } else if err.is_not_found() {
        HtmlError::NotFound.default()
    } else if let Some(e) = err.find::<warp::filters::body::BodyDeserializeError>() {
        HtmlError::InvalidRequest.new(&e.to_string())
    } else if let Some(e) = err.find::<warp::reject::InvalidHeader>() {
        HtmlError::InvalidRequest.new(&e.to_string())
    } else if err.find::<warp::reject::UnsupportedMediaType>().is_some() {
        HtmlError::InvalidRequest.new("Unsupported media type")
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        HtmlError::MethodNotAllowed.default()
    } else {
        log::error!("> Unhandled rejection: {err:?}");
        HtmlError::InternalServerError.default()
    };

    log::debug!("> Rejected request: {error}");
    Ok(error.into_response())
}
