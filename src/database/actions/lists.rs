use std::collections::HashSet;

use crate::{
    error::{Error, HtmlError, QueryError},
    schema::Id,
};

use sqlx::{Pool, Postgres};

/// Per-user recipe relations sharing the same add/remove rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecipeList {
    Favorites,
    ShoppingCart,
}

impl RecipeList {
    fn table(&self) -> &'static str {
        match self {
            RecipeList::Favorites => "favorites",
            RecipeList::ShoppingCart => "shopping_cart",
        }
    }

    fn already_listed(&self) -> &'static str {
        match self {
            RecipeList::Favorites => "Recipe is already in favorites.",
            RecipeList::ShoppingCart => "Recipe is already in the shopping cart.",
        }
    }

    fn not_listed(&self) -> &'static str {
        match self {
            RecipeList::Favorites => "Recipe is not in favorites.",
            RecipeList::ShoppingCart => "Recipe is not in the shopping cart.",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListAction {
    Add,
    Remove,
}

impl ListAction {
    /// Adding an unknown recipe is a bad request, removing one is a 404.
    pub fn missing_recipe(&self) -> Error {
        match self {
            ListAction::Add => HtmlError::InvalidRequest.new("Recipe does not exist."),
            ListAction::Remove => HtmlError::NotFound.new("Recipe does not exist."),
        }
    }
}

pub async fn add_to_list(
    list: RecipeList,
    user_id: Id,
    recipe_id: Id,
    pool: &Pool<Postgres>,
) -> Result<(), Error> {
    let result = sqlx::query(&format!(
        "INSERT INTO {} (user_id, recipe_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        list.table()
    ))
    .bind(user_id)
    .bind(recipe_id)
    .execute(pool)
    .await
    .map_err(QueryError::from)?;

    if result.rows_affected() == 0 {
        return Err(HtmlError::InvalidRequest.new(list.already_listed()));
    }

    Ok(())
}

pub async fn remove_from_list(
    list: RecipeList,
    user_id: Id,
    recipe_id: Id,
    pool: &Pool<Postgres>,
) -> Result<(), Error> {
    let result = sqlx::query(&format!(
        "DELETE FROM {} WHERE user_id = $1 AND recipe_id = $2",
        list.table()
    ))
    .bind(user_id)
    .bind(recipe_id)
    .execute(pool)
    .await
    .map_err(QueryError::from)?;

    if result.rows_affected() == 0 {
        return Err(HtmlError::InvalidRequest.new(list.not_listed()));
    }

    Ok(())
}

/// Subset of `recipe_ids` present in the user's list.
pub async fn listed_recipes(
    list: RecipeList,
    user_id: Id,
    recipe_ids: &[Id],
    pool: &Pool<Postgres>,
) -> Result<HashSet<Id>, Error> {
    let rows: Vec<(Id,)> = sqlx::query_as(&format!(
        "SELECT recipe_id FROM {} WHERE user_id = $1 AND recipe_id = ANY($2)",
        list.table()
    ))
    .bind(user_id)
    .bind(recipe_ids)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows.into_iter().map(|row| row.0).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::fixtures::{insert_recipe, insert_user};

    #[test]
    fn missing_recipe_status_depends_on_action() {
        assert_eq!(ListAction::Add.missing_recipe().code, 400);
        assert_eq!(ListAction::Remove.missing_recipe().code, 404);
    }

    #[test]
    fn lists_have_distinct_messages() {
        assert_ne!(
            RecipeList::Favorites.already_listed(),
            RecipeList::ShoppingCart.already_listed()
        );
        assert_ne!(
            RecipeList::Favorites.not_listed(),
            RecipeList::ShoppingCart.not_listed()
        );
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn adding_twice_is_rejected(pool: Pool<Postgres>) {
        let user = insert_user("cook", &pool).await;
        let recipe = insert_recipe(user, &pool).await;

        add_to_list(RecipeList::Favorites, user, recipe, &pool).await.unwrap();
        let error = add_to_list(RecipeList::Favorites, user, recipe, &pool)
            .await
            .unwrap_err();
        assert_eq!(error.code, 400);
        assert_eq!(error.info.as_deref(), Some("Recipe is already in favorites."));

        // The other list is independent.
        add_to_list(RecipeList::ShoppingCart, user, recipe, &pool).await.unwrap();
        let listed = listed_recipes(RecipeList::Favorites, user, &[recipe], &pool)
            .await
            .unwrap();
        assert!(listed.contains(&recipe));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn removing_an_unlisted_recipe_is_rejected(pool: Pool<Postgres>) {
        let user = insert_user("cook", &pool).await;
        let recipe = insert_recipe(user, &pool).await;

        let error = remove_from_list(RecipeList::ShoppingCart, user, recipe, &pool)
            .await
            .unwrap_err();
        assert_eq!(error.code, 400);
        assert_eq!(error.info.as_deref(), Some("Recipe is not in the shopping cart."));

        add_to_list(RecipeList::ShoppingCart, user, recipe, &pool).await.unwrap();
        remove_from_list(RecipeList::ShoppingCart, user, recipe, &pool)
            .await
            .unwrap();
        assert!(remove_from_list(RecipeList::ShoppingCart, user, recipe, &pool)
            .await
            .is_err());
    }
}
