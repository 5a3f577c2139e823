use crate::{
    annotations::annotate_authors,
    authentication::{
        cryptography::{hash_password, verify_password},
        jwt::{generate_jwt_session, SessionData},
    },
    error::{Error, HtmlError, QueryError},
    pagination::{PageContext, Pagination},
    schema::{Id, User, UserRow},
    validation::{validate_new_password, ValidRegistration},
    views::UserView,
};

use sqlx::{Pool, Postgres};

pub async fn get_user_by_email(
    pool: &Pool<Postgres>,
    email: &str,
) -> Result<Option<User>, Error> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE LOWER(email) = LOWER($1)")
        .bind(email.trim())
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row)
}

pub async fn get_user_by_id(pool: &Pool<Postgres>, user_id: Id) -> Result<Option<User>, Error> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row)
}

pub async fn get_users_by_ids(pool: &Pool<Postgres>, user_ids: &[Id]) -> Result<Vec<User>, Error> {
    let rows: Vec<User> = sqlx::query_as("SELECT * FROM users WHERE id = ANY($1)")
        .bind(user_ids)
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(rows)
}

/// Creates a user; the password is stored as an Argon2 hash. A taken email or
/// username surfaces as a conflict from the storage constraint.
pub async fn register_user(form: ValidRegistration, pool: &Pool<Postgres>) -> Result<User, Error> {
    let password = hash_password(&form.password)?;

    let user: User = sqlx::query_as(
        "
        INSERT INTO users (email, username, first_name, last_name, password)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *;
    ",
    )
    .bind(form.email)
    .bind(form.username)
    .bind(form.first_name)
    .bind(form.last_name)
    .bind(password)
    .fetch_one(pool)
    .await
    .map_err(QueryError::from)?;

    log::info!("Registered user {} ({})", user.username, user.id);
    Ok(user)
}

pub async fn login_user(
    email: &str,
    password: &str,
    secret: &[u8],
    lifetime_hours: i64,
    pool: &Pool<Postgres>,
) -> Result<String, Error> {
    let user = match get_user_by_email(pool, email).await? {
        Some(user) => user,
        None => return Err(HtmlError::InvalidRequest.new("Invalid credentials")),
    };

    if !verify_password(password, &user.password)? {
        return Err(HtmlError::InvalidRequest.new("Invalid credentials"));
    }

    generate_jwt_session(&user, secret, lifetime_hours)
}

pub async fn set_password(
    session: &SessionData,
    current_password: &str,
    new_password: &str,
    pool: &Pool<Postgres>,
) -> Result<(), Error> {
    validate_new_password(new_password)?;

    let user = get_user_by_id(pool, session.user_id)
        .await?
        .ok_or_else(|| HtmlError::InvalidSession.new("User no longer exists"))?;

    if !verify_password(current_password, &user.password)? {
        return Err(Error::field("current_password", "Wrong password."));
    }
    if current_password == new_password {
        return Err(Error::field(
            "new_password",
            "The new password must differ from the current password.",
        ));
    }

    let password = hash_password(new_password)?;
    sqlx::query("UPDATE users SET password = $1 WHERE id = $2")
        .bind(password)
        .bind(user.id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    log::info!("User {} changed their password", user.id);
    Ok(())
}

pub async fn fetch_users(
    requester: Option<&SessionData>,
    pagination: Pagination,
    pool: &Pool<Postgres>,
) -> Result<PageContext<UserView>, Error> {
    let rows: Vec<UserRow> =
        sqlx::query_as("SELECT u.*, COUNT(*) OVER() AS count FROM users u ORDER BY u.id LIMIT $1 OFFSET $2")
            .bind(pagination.limit)
            .bind(pagination.offset())
            .fetch_all(pool)
            .await
            .map_err(QueryError::from)?;

    let total_count = rows.first().map(|row| row.count).unwrap_or(0);
    let users: Vec<User> = rows.into_iter().map(User::from).collect();
    let ids: Vec<Id> = users.iter().map(|user| user.id).collect();
    let subscribed = annotate_authors(pool, requester, &ids).await?;

    let views = users
        .iter()
        .map(|user| UserView::from_user(user, subscribed.get(&user.id).copied().unwrap_or(false)))
        .collect();

    PageContext::from_rows(views, total_count, pagination)
}

pub async fn get_user_view(
    requester: Option<&SessionData>,
    user_id: Id,
    pool: &Pool<Postgres>,
) -> Result<UserView, Error> {
    let user = get_user_by_id(pool, user_id)
        .await?
        .ok_or_else(|| HtmlError::NotFound.new("No user exists with specified id"))?;

    let subscribed = annotate_authors(pool, requester, &[user.id]).await?;
    Ok(UserView::from_user(
        &user,
        subscribed.get(&user.id).copied().unwrap_or(false),
    ))
}
