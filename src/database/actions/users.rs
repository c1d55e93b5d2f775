use std::collections::{HashMap, HashSet};

use crate::{
    authentication::{
        cryptography::{hash_password, verify_password},
        jwt::generate_jwt_session,
    },
    config::Config,
    error::{Error, HtmlError, QueryError},
    pagination::{Page, PageRequest},
    schema::{Id, User, UserForm, UserProfile, UserRow},
};

use sqlx::{Pool, Postgres};

use super::subscribed_authors;

pub async fn get_user_by_email(
    pool: &Pool<Postgres>,
    email: &str,
) -> Result<Option<User>, Error> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE LOWER(email) = LOWER($1)")
        .bind(email)
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

pub async fn get_users_by_id(
    pool: &Pool<Postgres>,
    user_ids: &[Id],
) -> Result<HashMap<Id, User>, Error> {
    let rows: Vec<User> = sqlx::query_as("SELECT * FROM users WHERE id = ANY($1)")
        .bind(user_ids)
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(rows.into_iter().map(|user| (user.id, user)).collect())
}

/// Creates a user; `password` is already hashed. Returns `None` when the email
/// or username is taken.
pub async fn register_user(
    form: &UserForm,
    password: &str,
    pool: &Pool<Postgres>,
) -> Result<Option<User>, Error> {
    let user: Option<User> = sqlx::query_as(
        "
        INSERT INTO users (email, username, first_name, last_name, password)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT DO NOTHING RETURNING *;
    ",
    )
    .bind(&form.email)
    .bind(&form.username)
    .bind(&form.first_name)
    .bind(&form.last_name)
    .bind(password)
    .fetch_optional(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(user)
}

pub async fn login_user(
    email: &str,
    password: &str,
    config: &Config,
    pool: &Pool<Postgres>,
) -> Result<String, Error> {
    let user = match get_user_by_email(pool, email).await? {
        Some(user) => user,
        None => return Err(HtmlError::InvalidRequest.new("Invalid credentials.")),
    };

    let authenticated = verify_password(password, &user.password).map_err(|e| {
        log::error!("Stored password hash for user {} is unreadable: {e}", user.id);
        HtmlError::InternalServerError.default()
    })?;
    if !authenticated {
        return Err(HtmlError::InvalidRequest.new("Invalid credentials."));
    }

    generate_jwt_session(&user, config.jwt_secret.as_bytes(), config.session_hours)
}

pub async fn change_password(
    user_id: Id,
    current_password: &str,
    new_password: &str,
    pool: &Pool<Postgres>,
) -> Result<(), Error> {
    let user = get_user_by_id(pool, user_id)
        .await?
        .ok_or_else(|| HtmlError::InvalidSession.new("User not found."))?;

    let authenticated = verify_password(current_password, &user.password)
        .map_err(|_| HtmlError::InternalServerError.default())?;
    if !authenticated {
        return Err(Error {
            field: Some("current_password"),
            ..HtmlError::InvalidRequest.new("Invalid password.")
        });
    }

    let hash = hash_password(new_password).map_err(|e| {
        log::error!("Failed to hash password: {e}");
        HtmlError::InternalServerError.default()
    })?;

    sqlx::query("UPDATE users SET password = $1 WHERE id = $2")
        .bind(hash)
        .bind(user_id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(())
}

fn is_subscribed(viewer: Option<Id>, user_id: Id, subscribed: &HashSet<Id>) -> bool {
    viewer.is_some_and(|viewer| viewer != user_id) && subscribed.contains(&user_id)
}

pub async fn list_users(
    request: PageRequest,
    viewer: Option<Id>,
    path: &str,
    pool: &Pool<Postgres>,
) -> Result<Page<UserProfile>, Error> {
    let rows: Vec<UserRow> = sqlx::query_as(
        "
        SELECT u.id, u.email, u.username, u.first_name, u.last_name, COUNT(*) OVER() AS count
        FROM users u
        ORDER BY u.id
        LIMIT $1 OFFSET $2
    ",
    )
    .bind(request.limit)
    .bind(request.offset())
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    let total_count = rows.first().map(|row| row.count).unwrap_or(0);
    let ids: Vec<Id> = rows.iter().map(|row| row.id).collect();
    let subscribed = match viewer {
        Some(viewer) => subscribed_authors(viewer, &ids, pool).await?,
        None => Default::default(),
    };

    let page = Page::from_rows(rows, total_count, request, path).map(|row| {
        let flag = is_subscribed(viewer, row.id, &subscribed);
        UserProfile::from((row, flag))
    });
    Ok(page)
}

pub async fn get_profile(
    user_id: Id,
    viewer: Option<Id>,
    pool: &Pool<Postgres>,
) -> Result<Option<UserProfile>, Error> {
    let user = match get_user_by_id(pool, user_id).await? {
        Some(user) => user,
        None => return Ok(None),
    };

    let subscribed = match viewer {
        Some(viewer) => subscribed_authors(viewer, &[user.id], pool).await?,
        None => Default::default(),
    };

    Ok(Some(UserProfile::from_user(
        &user,
        is_subscribed(viewer, user.id, &subscribed),
    )))
}
