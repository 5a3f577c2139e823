use warp::{filters::BoxedFilter, http::StatusCode, reply::Response, Filter, Rejection, Reply};

use crate::{
    actions::{
        add_to_list, create_recipe, delete_recipe, fetch_recipes, fetch_shopping_list,
        get_recipe_view, remove_from_list, update_recipe, RecipeFilter, RecipeList,
    },
    constants::SHOPPING_LIST_FILENAME,
    form::Form,
    jwt::SessionData,
    middleware::{with_possible_session, with_session},
    pagination::Pagination,
    schema::Id,
    validation::{validate_recipe, RecipeForm},
};

use super::{json_body, json_response, no_content, with_query, with_state, State};

async fn list(session: Option<SessionData>, form: Form, state: State) -> Result<Response, Rejection> {
    let pagination = Pagination::from_form(&form, state.config.page_size)?;
    let filter = RecipeFilter::from_form(&form)?;
    let page = fetch_recipes(session.as_ref(), &filter, pagination, &state.pool).await?;

    Ok(json_response(&page, StatusCode::OK))
}

async fn create(session: SessionData, form: RecipeForm, state: State) -> Result<Response, Rejection> {
    let recipe = validate_recipe(form, &state.config.limits)?;
    let id = create_recipe(&session, recipe, &state.pool).await?;
    let view = get_recipe_view(Some(&session), id, &state.pool).await?;

    Ok(json_response(&view, StatusCode::CREATED))
}

async fn detail(id: Id, session: Option<SessionData>, state: State) -> Result<Response, Rejection> {
    let view = get_recipe_view(session.as_ref(), id, &state.pool).await?;
    Ok(json_response(&view, StatusCode::OK))
}

async fn update(
    id: Id,
    session: SessionData,
    form: RecipeForm,
    state: State,
) -> Result<Response, Rejection> {
    let recipe = validate_recipe(form, &state.config.limits)?;
    update_recipe(&session, id, recipe, &state.pool).await?;
    let view = get_recipe_view(Some(&session), id, &state.pool).await?;

    Ok(json_response(&view, StatusCode::OK))
}

async fn delete(id: Id, session: SessionData, state: State) -> Result<Response, Rejection> {
    delete_recipe(&session, id, &state.pool).await?;
    Ok(no_content())
}

async fn add(
    list: RecipeList,
    id: Id,
    session: SessionData,
    state: State,
) -> Result<Response, Rejection> {
    let view = add_to_list(list, &session, id, &state.pool).await?;
    Ok(json_response(&view, StatusCode::CREATED))
}

async fn remove(
    list: RecipeList,
    id: Id,
    session: SessionData,
    state: State,
) -> Result<Response, Rejection> {
    remove_from_list(list, &session, id, &state.pool).await?;
    Ok(no_content())
}

async fn download(session: SessionData, state: State) -> Result<Response, Rejection> {
    let list = fetch_shopping_list(&session, &state.pool).await?;
    log::info!("User {} downloaded a shopping list of {} lines", session.user_id, list.lines().len());

    Ok(warp::reply::with_header(
        list.render(),
        "content-disposition",
        format!("attachment; filename={SHOPPING_LIST_FILENAME}"),
    )
    .into_response())
}

pub fn routes(state: State) -> BoxedFilter<(Response,)> {
    let secret = state.config.secret.clone();

    let download = warp::path!("api" / "recipes" / "download_shopping_cart")
        .and(warp::get())
        .and(with_session(secret.clone()))
        .and(with_state(state.clone()))
        .and_then(download);

    let list = warp::path!("api" / "recipes")
        .and(warp::get())
        .and(with_possible_session(secret.clone()))
        .and(with_query())
        .and(with_state(state.clone()))
        .and_then(list);

    let create = warp::path!("api" / "recipes")
        .and(warp::post())
        .and(with_session(secret.clone()))
        .and(json_body())
        .and(with_state(state.clone()))
        .and_then(create);

    let detail = warp::path!("api" / "recipes" / Id)
        .and(warp::get())
        .and(with_possible_session(secret.clone()))
        .and(with_state(state.clone()))
        .and_then(detail);

    let update = warp::path!("api" / "recipes" / Id)
        .and(warp::patch())
        .and(with_session(secret.clone()))
        .and(json_body())
        .and(with_state(state.clone()))
        .and_then(update);

    let delete = warp::path!("api" / "recipes" / Id)
        .and(warp::delete())
        .and(with_session(secret.clone()))
        .and(with_state(state.clone()))
        .and_then(delete);

    let favorite = warp::path!("api" / "recipes" / Id / "favorite")
        .and(warp::post())
        .and(with_session(secret.clone()))
        .and(with_state(state.clone()))
        .and_then(|id: Id, session: SessionData, state: State| add(RecipeList::Favorites, id, session, state));

    let unfavorite = warp::path!("api" / "recipes" / Id / "favorite")
        .and(warp::delete())
        .and(with_session(secret.clone()))
        .and(with_state(state.clone()))
        .and_then(|id: Id, session: SessionData, state: State| remove(RecipeList::Favorites, id, session, state));

    let add_to_cart = warp::path!("api" / "recipes" / Id / "shopping_cart")
        .and(warp::post())
        .and(with_session(secret.clone()))
        .and(with_state(state.clone()))
        .and_then(|id: Id, session: SessionData, state: State| add(RecipeList::ShoppingCart, id, session, state));

    let remove_from_cart = warp::path!("api" / "recipes" / Id / "shopping_cart")
        .and(warp::delete())
        .and(with_session(secret))
        .and(with_state(state))
        .and_then(|id: Id, session: SessionData, state: State| remove(RecipeList::ShoppingCart, id, session, state));

    download
        .or(list)
        .unify()
        .or(create)
        .unify()
        .or(detail)
        .unify()
        .or(update)
        .unify()
        .or(delete)
        .unify()
        .or(favorite)
        .unify()
        .or(unfavorite)
        .unify()
        .or(add_to_cart)
        .unify()
        .or(remove_from_cart)
        .unify()
        .boxed()
}
