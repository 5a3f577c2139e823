use warp::{filters::BoxedFilter, http::StatusCode, reply::Response, Filter, Rejection};

use crate::{
    actions::{
        fetch_subscriptions, fetch_users, follow_author, get_user_view, login_user,
        register_user, set_password, unfollow_author,
    },
    form::Form,
    jwt::SessionData,
    middleware::{with_possible_session, with_session},
    pagination::Pagination,
    schema::Id,
    validation::{
        validate_login, validate_password_change, validate_registration, LoginForm, PasswordForm,
        RegistrationForm,
    },
    views::{CreatedUserView, TokenView},
};

use super::{json_body, json_response, no_content, recipes_limit, with_query, with_state, State};

async fn register(form: RegistrationForm, state: State) -> Result<Response, Rejection> {
    let form = validate_registration(form)?;
    let user = register_user(form, &state.pool).await?;

    Ok(json_response(&CreatedUserView::from(&user), StatusCode::CREATED))
}

async fn login(form: LoginForm, state: State) -> Result<Response, Rejection> {
    let (email, password) = validate_login(form)?;
    let auth_token = login_user(
        &email,
        &password,
        state.config.secret.as_bytes(),
        state.config.session_hours,
        &state.pool,
    )
    .await?;

    Ok(json_response(&TokenView { auth_token }, StatusCode::OK))
}

async fn list_users(
    session: Option<SessionData>,
    form: Form,
    state: State,
) -> Result<Response, Rejection> {
    let pagination = Pagination::from_form(&form, state.config.page_size)?;
    let page = fetch_users(session.as_ref(), pagination, &state.pool).await?;

    Ok(json_response(&page, StatusCode::OK))
}

async fn me(session: SessionData, state: State) -> Result<Response, Rejection> {
    let user = get_user_view(Some(&session), session.user_id, &state.pool).await?;
    Ok(json_response(&user, StatusCode::OK))
}

async fn change_password(
    session: SessionData,
    form: PasswordForm,
    state: State,
) -> Result<Response, Rejection> {
    let (current_password, new_password) = validate_password_change(form)?;
    set_password(&session, &current_password, &new_password, &state.pool).await?;

    Ok(no_content())
}

async fn subscriptions(
    session: SessionData,
    form: Form,
    state: State,
) -> Result<Response, Rejection> {
    let pagination = Pagination::from_form(&form, state.config.page_size)?;
    let limit = recipes_limit(&form)?;
    let page = fetch_subscriptions(&session, pagination, limit, &state.pool).await?;

    Ok(json_response(&page, StatusCode::OK))
}

async fn get_user(id: Id, session: SessionData, state: State) -> Result<Response, Rejection> {
    let user = get_user_view(Some(&session), id, &state.pool).await?;
    Ok(json_response(&user, StatusCode::OK))
}

async fn subscribe(
    id: Id,
    session: SessionData,
    form: Form,
    state: State,
) -> Result<Response, Rejection> {
    let limit = recipes_limit(&form)?;
    let view = follow_author(&session, id, limit, &state.pool).await?;

    Ok(json_response(&view, StatusCode::CREATED))
}

async fn unsubscribe(id: Id, session: SessionData, state: State) -> Result<Response, Rejection> {
    unfollow_author(&session, id, &state.pool).await?;
    Ok(no_content())
}

pub fn routes(state: State) -> BoxedFilter<(Response,)> {
    let secret = state.config.secret.clone();

    let register = warp::path!("api" / "users")
        .and(warp::post())
        .and(json_body())
        .and(with_state(state.clone()))
        .and_then(register);

    let list = warp::path!("api" / "users")
        .and(warp::get())
        .and(with_possible_session(secret.clone()))
        .and(with_query())
        .and(with_state(state.clone()))
        .and_then(list_users);

    let me = warp::path!("api" / "users" / "me")
        .and(warp::get())
        .and(with_session(secret.clone()))
        .and(with_state(state.clone()))
        .and_then(me);

    let set_password = warp::path!("api" / "users" / "set_password")
        .and(warp::post())
        .and(with_session(secret.clone()))
        .and(json_body())
        .and(with_state(state.clone()))
        .and_then(change_password);

    let subscriptions = warp::path!("api" / "users" / "subscriptions")
        .and(warp::get())
        .and(with_session(secret.clone()))
        .and(with_query())
        .and(with_state(state.clone()))
        .and_then(subscriptions);

    let user = warp::path!("api" / "users" / Id)
        .and(warp::get())
        .and(with_session(secret.clone()))
        .and(with_state(state.clone()))
        .and_then(get_user);

    let subscribe = warp::path!("api" / "users" / Id / "subscribe")
        .and(warp::post())
        .and(with_session(secret.clone()))
        .and(with_query())
        .and(with_state(state.clone()))
        .and_then(subscribe);

    let unsubscribe = warp::path!("api" / "users" / Id / "subscribe")
        .and(warp::delete())
        .and(with_session(secret))
        .and(with_state(state.clone()))
        .and_then(unsubscribe);

    let login = warp::path!("api" / "auth" / "token" / "login")
        .and(warp::post())
        .and(json_body())
        .and(with_state(state))
        .and_then(login);

    register
        .or(list)
        .unify()
        .or(me)
        .unify()
        .or(set_password)
        .unify()
        .or(subscriptions)
        .unify()
        .or(user)
        .unify()
        .or(subscribe)
        .unify()
        .or(unsubscribe)
        .unify()
        .or(login)
        .unify()
        .boxed()
}
