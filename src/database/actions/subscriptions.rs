use std::collections::{HashMap, HashSet};

use crate::{
    error::{Error, HtmlError, QueryError},
    pagination::{Page, PageRequest},
    schema::{AuthorRow, Id, MiniRecipe, Subscription},
};

use sqlx::{Pool, Postgres};

#[derive(sqlx::FromRow)]
struct AuthorRecipe {
    author_id: Id,
    #[sqlx(flatten)]
    recipe: MiniRecipe,
}

pub fn check_subscription_target(user_id: Id, author_id: Id) -> Result<(), Error> {
    if user_id == author_id {
        return Err(HtmlError::InvalidRequest.new("You cannot subscribe to yourself."));
    }
    Ok(())
}

pub async fn subscribe(user_id: Id, author_id: Id, pool: &Pool<Postgres>) -> Result<(), Error> {
    check_subscription_target(user_id, author_id)?;

    let result = sqlx::query(
        "INSERT INTO subscriptions (user_id, author_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
    )
    .bind(user_id)
    .bind(author_id)
    .execute(pool)
    .await
    .map_err(QueryError::from)?;

    if result.rows_affected() == 0 {
        return Err(HtmlError::InvalidRequest.new("You are already subscribed to this author."));
    }

    Ok(())
}

pub async fn unsubscribe(user_id: Id, author_id: Id, pool: &Pool<Postgres>) -> Result<(), Error> {
    let result = sqlx::query("DELETE FROM subscriptions WHERE user_id = $1 AND author_id = $2")
        .bind(user_id)
        .bind(author_id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    if result.rows_affected() == 0 {
        return Err(HtmlError::InvalidRequest.new("You are not subscribed to this author."));
    }

    Ok(())
}

/// Subset of `author_ids` the user follows.
pub async fn subscribed_authors(
    user_id: Id,
    author_ids: &[Id],
    pool: &Pool<Postgres>,
) -> Result<HashSet<Id>, Error> {
    let rows: Vec<(Id,)> = sqlx::query_as(
        "SELECT author_id FROM subscriptions WHERE user_id = $1 AND author_id = ANY($2)",
    )
    .bind(user_id)
    .bind(author_ids)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows.into_iter().map(|row| row.0).collect())
}

/// Newest recipes of each author, at most `limit` per author when given.
async fn author_recipes(
    author_ids: &[Id],
    limit: Option<i64>,
    pool: &Pool<Postgres>,
) -> Result<HashMap<Id, Vec<MiniRecipe>>, Error> {
    let rows: Vec<AuthorRecipe> = sqlx::query_as(
        "
        SELECT author_id, id, name, image, cooking_time
        FROM (
            SELECT r.author_id, r.id, r.name, r.image, r.cooking_time,
                ROW_NUMBER() OVER (PARTITION BY r.author_id ORDER BY r.id DESC) AS position
            FROM recipes r
            WHERE r.author_id = ANY($1)
        ) ranked
        WHERE $2::BIGINT IS NULL OR position <= $2
        ORDER BY id DESC
    ",
    )
    .bind(author_ids)
    .bind(limit)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    let mut map: HashMap<Id, Vec<MiniRecipe>> = HashMap::new();
    rows.into_iter().for_each(|row| {
        map.entry(row.author_id).or_default().push(row.recipe);
    });
    Ok(map)
}

async fn with_recipes(
    authors: Vec<AuthorRow>,
    recipes_limit: Option<i64>,
    pool: &Pool<Postgres>,
) -> Result<Vec<Subscription>, Error> {
    let ids: Vec<Id> = authors.iter().map(|author| author.id).collect();
    let mut recipes = author_recipes(&ids, recipes_limit, pool).await?;

    Ok(authors
        .into_iter()
        .map(|author| {
            let list = recipes.remove(&author.id).unwrap_or_default();
            Subscription::from_author(author, list)
        })
        .collect())
}

pub async fn get_subscription(
    author_id: Id,
    recipes_limit: Option<i64>,
    pool: &Pool<Postgres>,
) -> Result<Option<Subscription>, Error> {
    let author: Option<AuthorRow> = sqlx::query_as(
        "
        SELECT u.id, u.email, u.username, u.first_name, u.last_name,
            (SELECT COUNT(*) FROM recipes r WHERE r.author_id = u.id) AS recipes_count,
            COUNT(*) OVER() AS count
        FROM users u
        WHERE u.id = $1
    ",
    )
    .bind(author_id)
    .fetch_optional(pool)
    .await
    .map_err(QueryError::from)?;

    match author {
        Some(author) => Ok(with_recipes(vec![author], recipes_limit, pool).await?.pop()),
        None => Ok(None),
    }
}

pub async fn list_subscriptions(
    user_id: Id,
    request: PageRequest,
    recipes_limit: Option<i64>,
    path: &str,
    pool: &Pool<Postgres>,
) -> Result<Page<Subscription>, Error> {
    let authors: Vec<AuthorRow> = sqlx::query_as(
        "
        SELECT u.id, u.email, u.username, u.first_name, u.last_name,
            (SELECT COUNT(*) FROM recipes r WHERE r.author_id = u.id) AS recipes_count,
            COUNT(*) OVER() AS count
        FROM subscriptions s
        INNER JOIN users u ON u.id = s.author_id
        WHERE s.user_id = $1
        ORDER BY s.id DESC
        LIMIT $2 OFFSET $3
    ",
    )
    .bind(user_id)
    .bind(request.limit)
    .bind(request.offset())
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    let total_count = authors.first().map(|author| author.count).unwrap_or(0);
    let rows = with_recipes(authors, recipes_limit, pool).await?;

    Ok(Page::from_rows(rows, total_count, request, path))
}
