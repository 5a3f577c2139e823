use warp::{filters::BoxedFilter, http::StatusCode, reply::Response, Filter, Rejection};

use crate::{
    actions::{create_ingredient, create_tag, get_ingredient, get_tag, list_ingredients, list_tags},
    error::HtmlError,
    form::Form,
    jwt::SessionData,
    middleware::with_session,
    schema::Id,
    validation::{validate_ingredient, validate_tag, IngredientCreateForm, TagForm},
};

use super::{json_body, json_response, with_query, with_state, State};

async fn tags(state: State) -> Result<Response, Rejection> {
    let tags = list_tags(&state.pool).await?;
    Ok(json_response(&tags, StatusCode::OK))
}

async fn tag(id: Id, state: State) -> Result<Response, Rejection> {
    let tag = get_tag(id, &state.pool)
        .await?
        .ok_or_else(|| HtmlError::NotFound.new("No tag exists with specified id"))?;

    Ok(json_response(&tag, StatusCode::OK))
}

async fn new_tag(session: SessionData, form: TagForm, state: State) -> Result<Response, Rejection> {
    let tag = validate_tag(form)?;
    let tag = create_tag(&session, tag, &state.pool).await?;

    Ok(json_response(&tag, StatusCode::CREATED))
}

async fn ingredients(form: Form, state: State) -> Result<Response, Rejection> {
    let name = form.get_str("name");
    let ingredients = list_ingredients(name.as_deref(), &state.pool).await?;

    Ok(json_response(&ingredients, StatusCode::OK))
}

async fn ingredient(id: Id, state: State) -> Result<Response, Rejection> {
    let ingredient = get_ingredient(id, &state.pool)
        .await?
        .ok_or_else(|| HtmlError::NotFound.new("No ingredient exists with specified id"))?;

    Ok(json_response(&ingredient, StatusCode::OK))
}

async fn new_ingredient(
    session: SessionData,
    form: IngredientCreateForm,
    state: State,
) -> Result<Response, Rejection> {
    let (name, measurement_unit) = validate_ingredient(form)?;
    let ingredient = create_ingredient(&session, name, measurement_unit, &state.pool).await?;

    Ok(json_response(&ingredient, StatusCode::CREATED))
}

pub fn routes(state: State) -> BoxedFilter<(Response,)> {
    let secret = state.config.secret.clone();

    let list_tags = warp::path!("api" / "tags")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(tags);

    let get_tag = warp::path!("api" / "tags" / Id)
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(tag);

    let create_tag = warp::path!("api" / "tags")
        .and(warp::post())
        .and(with_session(secret.clone()))
        .and(json_body())
        .and(with_state(state.clone()))
        .and_then(new_tag);

    let list_ingredients = warp::path!("api" / "ingredients")
        .and(warp::get())
        .and(with_query())
        .and(with_state(state.clone()))
        .and_then(ingredients);

    let get_ingredient = warp::path!("api" / "ingredients" / Id)
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(ingredient);

    let create_ingredient = warp::path!("api" / "ingredients")
        .and(warp::post())
        .and(with_session(secret))
        .and(json_body())
        .and(with_state(state))
        .and_then(new_ingredient);

    list_tags
        .or(get_tag)
        .unify()
        .or(create_tag)
        .unify()
        .or(list_ingredients)
        .unify()
        .or(get_ingredient)
        .unify()
        .or(create_ingredient)
        .unify()
        .boxed()
}
