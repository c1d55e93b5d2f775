//! Rows shared by the database tests.

use sqlx::{Pool, Postgres};

use crate::schema::{Id, IngredientAmount, RecipeForm};

use super::create_recipe;

pub async fn insert_user(username: &str, pool: &Pool<Postgres>) -> Id {
    let row: (Id,) = sqlx::query_as(
        "
        INSERT INTO users (email, username, first_name, last_name, password)
        VALUES ($1, $2, 'Test', 'Cook', '')
        RETURNING id
    ",
    )
    .bind(format!("{username}@example.com"))
    .bind(username)
    .fetch_one(pool)
    .await
    .unwrap();
    row.0
}

pub async fn insert_ingredient(name: &str, unit: &str, pool: &Pool<Postgres>) -> Id {
    let row: (Id,) = sqlx::query_as(
        "INSERT INTO ingredients (name, measurement_unit) VALUES ($1, $2) RETURNING id",
    )
    .bind(name)
    .bind(unit)
    .fetch_one(pool)
    .await
    .unwrap();
    row.0
}

pub async fn insert_tag(slug: &str, color: &str, pool: &Pool<Postgres>) -> Id {
    let row: (Id,) =
        sqlx::query_as("INSERT INTO tags (name, color, slug) VALUES ($1, $2, $1) RETURNING id")
            .bind(slug)
            .bind(color)
            .fetch_one(pool)
            .await
            .unwrap();
    row.0
}

pub fn recipe_form(ingredients: &[(Id, i32)], tags: &[Id]) -> RecipeForm {
    RecipeForm {
        ingredients: ingredients
            .iter()
            .map(|&(id, amount)| IngredientAmount { id, amount })
            .collect(),
        tags: tags.to_vec(),
        image: None,
        name: String::from("Tomato salad"),
        text: String::from("Slice and salt."),
        cooking_time: 10,
    }
}

/// A user with one recipe using a single ingredient.
pub async fn insert_recipe(author: Id, pool: &Pool<Postgres>) -> Id {
    let tomato = insert_ingredient("tomato", "g", pool).await;
    let tag = insert_tag("lunch", "#00ff00", pool).await;
    create_recipe(author, &recipe_form(&[(tomato, 2)], &[tag]), None, pool)
        .await
        .unwrap()
}
