//! HTTP surface of the service. Every route resolves to a [`Response`]; failures
//! travel as rejections carrying [`Error`] and are rendered by
//! [`handle_rejection`].

use std::{convert::Infallible, sync::Arc};

use serde::{de::DeserializeOwned, Serialize};
use sqlx::{Pool, Postgres};
use warp::{http::StatusCode, reply::Response, Filter, Reply};

use crate::{
    config::Config,
    error::{handle_rejection, Error},
    form::Form,
};

mod catalog;
mod recipes;
mod users;

const MAX_BODY_SIZE: u64 = 1024 * 1024;

#[derive(Clone)]
pub struct State {
    pub pool: Pool<Postgres>,
    pub config: Arc<Config>,
}

impl State {
    pub fn new(pool: Pool<Postgres>, config: Config) -> Self {
        Self {
            pool,
            config: Arc::new(config),
        }
    }
}

fn with_state(state: State) -> impl Filter<Extract = (State,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

/// Query-string parameters; a request without a query yields an empty form.
fn with_query() -> impl Filter<Extract = (Form,), Error = Infallible> + Clone {
    warp::query::raw()
        .or(warp::any().map(String::new))
        .unify()
        .map(|query: String| Form::from_query(&query))
}

fn json_body<T>() -> impl Filter<Extract = (T,), Error = warp::Rejection> + Clone
where
    T: DeserializeOwned + Send,
{
    warp::body::content_length_limit(MAX_BODY_SIZE).and(warp::body::json())
}

fn json_response<T: Serialize>(value: &T, status: StatusCode) -> Response {
    warp::reply::with_status(warp::reply::json(value), status).into_response()
}

fn no_content() -> Response {
    warp::reply::with_status(warp::reply(), StatusCode::NO_CONTENT).into_response()
}

/// Optional non-negative `recipes_limit` query parameter.
fn recipes_limit(form: &Form) -> Result<Option<i64>, Error> {
    match form.get_number::<i64>("recipes_limit")? {
        Some(limit) if limit < 0 => Err(Error::field(
            "recipes_limit",
            "Ensure this value is greater than or equal to 0.",
        )),
        limit => Ok(limit),
    }
}

/// The complete API with rejection handling and request logging.
pub fn api(state: State) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    users::routes(state.clone())
        .or(catalog::routes(state.clone()))
        .unify()
        .or(recipes::routes(state))
        .unify()
        .recover(handle_rejection)
        .unify()
        .with(warp::log("foodgram"))
}
