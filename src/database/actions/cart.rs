use crate::{
    error::{Error, HtmlError, QueryError},
    schema::Id,
    shopping_list::{aggregate, render, CartLine},
};

use sqlx::{Pool, Postgres};

/// Every ingredient row of every recipe in the user's shopping cart.
pub async fn fetch_cart_lines(user_id: Id, pool: &Pool<Postgres>) -> Result<Vec<CartLine>, Error> {
    let rows: Vec<CartLine> = sqlx::query_as(
        "
        SELECT i.name, i.measurement_unit, ri.amount
        FROM shopping_cart c
        INNER JOIN recipe_ingredients ri ON ri.recipe_id = c.recipe_id
        INNER JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE c.user_id = $1
    ",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows)
}

pub async fn cart_is_empty(user_id: Id, pool: &Pool<Postgres>) -> Result<bool, Error> {
    let row: (bool,) =
        sqlx::query_as("SELECT EXISTS (SELECT 1 FROM shopping_cart WHERE user_id = $1)")
            .bind(user_id)
            .fetch_one(pool)
            .await
            .map_err(QueryError::from)?;

    Ok(!row.0)
}

/// Text export of the user's aggregated shopping list.
pub async fn shopping_list(user_id: Id, pool: &Pool<Postgres>) -> Result<String, Error> {
    if cart_is_empty(user_id, pool).await? {
        return Err(HtmlError::InvalidRequest.new("Shopping cart is empty."));
    }

    let lines = fetch_cart_lines(user_id, pool).await?;
    log::debug!("Aggregating {} cart rows for user {user_id}", lines.len());

    Ok(render(&aggregate(lines)))
}
