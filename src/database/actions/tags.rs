use std::collections::{HashMap, HashSet};

use crate::{
    error::{Error, QueryError},
    schema::{Id, LinkedRecipeTag, NewTag, Tag},
};

use sqlx::{PgConnection, Pool, Postgres, QueryBuilder};

pub async fn get_tag(id: Id, pool: &Pool<Postgres>) -> Result<Option<Tag>, Error> {
    let tag: Option<Tag> = sqlx::query_as("SELECT * FROM tags WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(tag)
}

pub async fn list_tags(pool: &Pool<Postgres>) -> Result<Vec<Tag>, Error> {
    let list: Vec<Tag> = sqlx::query_as("SELECT * FROM tags ORDER BY name")
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(list)
}

/// Subset of `ids` that exist.
pub async fn existing_tag_ids(ids: &[Id], pool: &Pool<Postgres>) -> Result<HashSet<Id>, Error> {
    let rows: Vec<(Id,)> = sqlx::query_as("SELECT id FROM tags WHERE id = ANY($1)")
        .bind(ids)
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(rows.into_iter().map(|row| row.0).collect())
}

pub async fn list_recipe_tags(
    recipe_ids: &[Id],
    pool: &Pool<Postgres>,
) -> Result<HashMap<Id, Vec<Tag>>, Error> {
    let rows: Vec<LinkedRecipeTag> = sqlx::query_as(
        "
        SELECT rt.recipe_id, t.id, t.name, t.color, t.slug
        FROM recipe_tags rt
        INNER JOIN tags t ON t.id = rt.tag_id
        WHERE rt.recipe_id = ANY($1)
        ORDER BY t.id
    ",
    )
    .bind(recipe_ids)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    let mut map: HashMap<Id, Vec<Tag>> = HashMap::new();
    rows.into_iter().for_each(|row| {
        map.entry(row.recipe_id).or_default().push(row.into());
    });
    Ok(map)
}

/// Replaces the tag set of a recipe. Meant to run inside the caller's transaction.
pub async fn set_recipe_tags(
    recipe_id: Id,
    tags: &[Id],
    conn: &mut PgConnection,
) -> Result<(), Error> {
    sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = $1")
        .bind(recipe_id)
        .execute(&mut *conn)
        .await
        .map_err(QueryError::from)?;

    if tags.is_empty() {
        return Ok(());
    }

    let mut query_builder: QueryBuilder<Postgres> =
        QueryBuilder::new("INSERT INTO recipe_tags (recipe_id, tag_id) ");
    query_builder.push_values(tags.iter(), |mut b, tag_id| {
        b.push_bind(recipe_id).push_bind(*tag_id);
    });

    query_builder
        .build()
        .execute(&mut *conn)
        .await
        .map_err(QueryError::from)?;

    Ok(())
}

/// Bulk import; tags clashing with an existing name, color or slug are skipped.
pub async fn create_tags(tags: &[NewTag], pool: &Pool<Postgres>) -> Result<u64, Error> {
    if tags.is_empty() {
        return Ok(0);
    }

    let mut query_builder: QueryBuilder<Postgres> =
        QueryBuilder::new("INSERT INTO tags (name, color, slug) ");
    query_builder.push_values(tags.iter(), |mut b, tag| {
        b.push_bind(&tag.name)
            .push_bind(&tag.color)
            .push_bind(&tag.slug);
    });
    query_builder.push(" ON CONFLICT DO NOTHING");

    let result = query_builder
        .build()
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(result.rows_affected())
}
