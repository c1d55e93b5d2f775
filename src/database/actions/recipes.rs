use std::collections::HashSet;

use crate::{
    authentication::permissions::ActionType,
    error::{Error, HtmlError, QueryError},
    jwt::SessionData,
    pagination::PageRequest,
    schema::{Id, IngredientAmount, MiniRecipe, Recipe, RecipeDetail, RecipeForm, RecipePatch, RecipeRow, UserProfile},
    validators::check_known,
};

use sqlx::{Pool, Postgres, QueryBuilder};

use super::{
    existing_ingredient_ids, existing_tag_ids, get_users_by_id, list_recipe_ingredients,
    list_recipe_tags, listed_recipes, set_recipe_ingredients, set_recipe_tags,
    subscribed_authors, RecipeList,
};

/// Recipe list filters. Empty `tags` means no tag filter; otherwise a recipe
/// matches when it carries any of the slugs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipeFilter {
    pub author: Option<Id>,
    pub tags: Vec<String>,
    pub favorited_by: Option<Id>,
    pub in_cart_of: Option<Id>,
}

pub async fn fetch_recipes(
    filter: &RecipeFilter,
    request: PageRequest,
    pool: &Pool<Postgres>,
) -> Result<(Vec<Recipe>, i64), Error> {
    let mut query_builder: QueryBuilder<Postgres> = QueryBuilder::new(
        "SELECT r.id, r.author_id, r.name, r.image, r.text, r.cooking_time, COUNT(*) OVER() AS count FROM recipes r WHERE TRUE",
    );

    if let Some(author) = filter.author {
        query_builder.push(" AND r.author_id = ").push_bind(author);
    }
    if !filter.tags.is_empty() {
        query_builder
            .push(" AND EXISTS (SELECT 1 FROM recipe_tags rt INNER JOIN tags t ON t.id = rt.tag_id WHERE rt.recipe_id = r.id AND t.slug = ANY(")
            .push_bind(filter.tags.clone())
            .push("))");
    }
    if let Some(user_id) = filter.favorited_by {
        query_builder
            .push(" AND EXISTS (SELECT 1 FROM favorites f WHERE f.recipe_id = r.id AND f.user_id = ")
            .push_bind(user_id)
            .push(")");
    }
    if let Some(user_id) = filter.in_cart_of {
        query_builder
            .push(" AND EXISTS (SELECT 1 FROM shopping_cart c WHERE c.recipe_id = r.id AND c.user_id = ")
            .push_bind(user_id)
            .push(")");
    }

    query_builder
        .push(" ORDER BY r.id DESC LIMIT ")
        .push_bind(request.limit)
        .push(" OFFSET ")
        .push_bind(request.offset());

    let rows: Vec<RecipeRow> = query_builder
        .build_query_as()
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;

    let total_count = rows.first().map(|row| row.count).unwrap_or(0);
    Ok((rows.into_iter().map(Recipe::from).collect(), total_count))
}

pub async fn get_recipe(id: Id, pool: &Pool<Postgres>) -> Result<Option<Recipe>, Error> {
    let row: Option<Recipe> = sqlx::query_as("SELECT * FROM recipes WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row)
}

pub async fn get_mini_recipe(id: Id, pool: &Pool<Postgres>) -> Result<Option<MiniRecipe>, Error> {
    let row: Option<MiniRecipe> =
        sqlx::query_as("SELECT id, name, image, cooking_time FROM recipes WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(QueryError::from)?;

    Ok(row)
}

/// Loads a recipe the session is allowed to modify: its author or an admin.
pub async fn get_recipe_mut(
    id: Id,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<Recipe, Error> {
    session.authenticate(ActionType::ManageOwnRecipes)?;
    let recipe = get_recipe(id, pool).await?;

    match recipe {
        Some(recipe) => match session.authenticate(ActionType::ManageAllRecipes) {
            Ok(_) => Ok(recipe),
            Err(_) => {
                if recipe.author_id != session.user_id {
                    Err(HtmlError::Forbidden.default())
                } else {
                    Ok(recipe)
                }
            }
        },
        None => Err(HtmlError::NotFound.new("No recipe exists with specified id.")),
    }
}

/// Full bodies for a batch of recipes, as seen by `viewer`.
pub async fn recipe_details(
    recipes: Vec<Recipe>,
    viewer: Option<Id>,
    pool: &Pool<Postgres>,
) -> Result<Vec<RecipeDetail>, Error> {
    if recipes.is_empty() {
        return Ok(Vec::new());
    }

    let ids: Vec<Id> = recipes.iter().map(|recipe| recipe.id).collect();
    let mut author_ids: Vec<Id> = recipes.iter().map(|recipe| recipe.author_id).collect();
    author_ids.sort_unstable();
    author_ids.dedup();

    let authors = get_users_by_id(pool, &author_ids).await?;
    let mut tags = list_recipe_tags(&ids, pool).await?;
    let mut ingredients = list_recipe_ingredients(&ids, pool).await?;

    let (favorited, in_cart, subscribed): (HashSet<Id>, HashSet<Id>, HashSet<Id>) = match viewer {
        Some(viewer) => (
            listed_recipes(RecipeList::Favorites, viewer, &ids, pool).await?,
            listed_recipes(RecipeList::ShoppingCart, viewer, &ids, pool).await?,
            subscribed_authors(viewer, &author_ids, pool).await?,
        ),
        None => Default::default(),
    };

    Ok(recipes
        .into_iter()
        .filter_map(|recipe| {
            let author = authors.get(&recipe.author_id)?;
            let is_subscribed =
                viewer.is_some_and(|viewer| viewer != author.id) && subscribed.contains(&author.id);

            Some(RecipeDetail {
                id: recipe.id,
                tags: tags.remove(&recipe.id).unwrap_or_default(),
                author: UserProfile::from_user(author, is_subscribed),
                ingredients: ingredients.remove(&recipe.id).unwrap_or_default(),
                is_favorited: favorited.contains(&recipe.id),
                is_in_shopping_cart: in_cart.contains(&recipe.id),
                name: recipe.name,
                image: recipe.image,
                text: recipe.text,
                cooking_time: recipe.cooking_time,
            })
        })
        .collect())
}

pub async fn recipe_detail(
    recipe: Recipe,
    viewer: Option<Id>,
    pool: &Pool<Postgres>,
) -> Result<RecipeDetail, Error> {
    recipe_details(vec![recipe], viewer, pool)
        .await?
        .pop()
        .ok_or_else(|| HtmlError::NotFound.default())
}

/// Existence checks for submitted ingredient and tag ids. Structural checks
/// (empty, duplicate, amount) happen before this in `validators`.
pub async fn check_references(
    ingredients: Option<&[IngredientAmount]>,
    tags: Option<&[Id]>,
    pool: &Pool<Postgres>,
) -> Result<(), Error> {
    if let Some(ingredients) = ingredients {
        let ids: Vec<Id> = ingredients.iter().map(|ingredient| ingredient.id).collect();
        let known = existing_ingredient_ids(&ids, pool).await?;
        check_known("ingredients", ids, &known, "Ingredient does not exist.")?;
    }

    if let Some(tags) = tags {
        let known = existing_tag_ids(tags, pool).await?;
        check_known("tags", tags.iter().copied(), &known, "Tag does not exist.")?;
    }

    Ok(())
}

/// Inserts the recipe with its tags and ingredient rows in one transaction.
pub async fn create_recipe(
    author_id: Id,
    form: &RecipeForm,
    image: Option<&str>,
    pool: &Pool<Postgres>,
) -> Result<Id, Error> {
    let mut tr = pool
        .begin()
        .await
        .map_err(|_| QueryError::new("Could not start transaction".to_owned()))?;

    let recipe: (Id,) = sqlx::query_as(
        "
        INSERT INTO recipes (author_id, name, image, text, cooking_time)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
    ",
    )
    .bind(author_id)
    .bind(&form.name)
    .bind(image)
    .bind(&form.text)
    .bind(form.cooking_time)
    .fetch_one(&mut *tr)
    .await
    .map_err(QueryError::from)?;

    set_recipe_tags(recipe.0, &form.tags, &mut *tr).await?;
    set_recipe_ingredients(recipe.0, &form.ingredients, &mut *tr).await?;

    tr.commit()
        .await
        .map_err(|_| QueryError::new("Could not commit transaction".to_owned()))?;

    log::info!("User {author_id} created recipe {}", recipe.0);
    Ok(recipe.0)
}

/// Applies a partial update. Tag and ingredient sets are replaced only when
/// supplied; the whole update is one transaction.
pub async fn update_recipe(
    id: Id,
    patch: &RecipePatch,
    image: Option<&str>,
    pool: &Pool<Postgres>,
) -> Result<(), Error> {
    let mut tr = pool
        .begin()
        .await
        .map_err(|_| QueryError::new("Could not start transaction".to_owned()))?;

    sqlx::query(
        "
        UPDATE recipes SET
        name = COALESCE($1, name),
        text = COALESCE($2, text),
        cooking_time = COALESCE($3, cooking_time),
        image = COALESCE($4, image)
        WHERE id = $5
    ",
    )
    .bind(patch.name.as_deref())
    .bind(patch.text.as_deref())
    .bind(patch.cooking_time)
    .bind(image)
    .bind(id)
    .execute(&mut *tr)
    .await
    .map_err(QueryError::from)?;

    if let Some(tags) = &patch.tags {
        set_recipe_tags(id, tags, &mut *tr).await?;
    }
    if let Some(ingredients) = &patch.ingredients {
        set_recipe_ingredients(id, ingredients, &mut *tr).await?;
    }

    tr.commit()
        .await
        .map_err(|_| QueryError::new("Could not commit transaction".to_owned()))?;

    Ok(())
}

/// Deletes a recipe; list entries and join rows cascade. Returns the stored
/// image path, if any.
/// ATTENTION: DOES NOT CHECK FOR OWNERSHIP BY ITSELF
pub async fn delete_recipe(id: Id, pool: &Pool<Postgres>) -> Result<Option<String>, Error> {
    let row: Option<(Option<String>,)> =
        sqlx::query_as("DELETE FROM recipes WHERE id = $1 RETURNING image")
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(QueryError::from)?;

    match row {
        Some(row) => Ok(row.0),
        None => Err(HtmlError::NotFound.default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        actions::fixtures::{insert_ingredient, insert_tag, insert_user, recipe_form},
        schema::UserRole,
    };

    async fn recipe_count(pool: &Pool<Postgres>) -> i64 {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM recipes")
            .fetch_one(pool)
            .await
            .unwrap();
        row.0
    }

    async fn tag_ids(recipe: Id, pool: &Pool<Postgres>) -> Vec<Id> {
        let mut tags = list_recipe_tags(&[recipe], pool).await.unwrap();
        tags.remove(&recipe)
            .unwrap_or_default()
            .into_iter()
            .map(|tag| tag.id)
            .collect()
    }

    async fn amounts(recipe: Id, pool: &Pool<Postgres>) -> Vec<(Id, i32)> {
        let mut ingredients = list_recipe_ingredients(&[recipe], pool).await.unwrap();
        ingredients
            .remove(&recipe)
            .unwrap_or_default()
            .into_iter()
            .map(|ingredient| (ingredient.id, ingredient.amount))
            .collect()
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn failed_create_leaves_nothing_behind(pool: Pool<Postgres>) {
        let author = insert_user("cook", &pool).await;
        let tag = insert_tag("lunch", "#00ff00", &pool).await;

        // The tag rows go in before the unknown ingredient fails.
        let form = recipe_form(&[(9999, 2)], &[tag]);
        assert!(create_recipe(author, &form, None, &pool).await.is_err());

        assert_eq!(recipe_count(&pool).await, 0);
        let links: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM recipe_tags")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(links.0, 0);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn update_replaces_only_supplied_lists(pool: Pool<Postgres>) {
        let author = insert_user("cook", &pool).await;
        let tomato = insert_ingredient("tomato", "g", &pool).await;
        let salt = insert_ingredient("salt", "g", &pool).await;
        let lunch = insert_tag("lunch", "#00ff00", &pool).await;
        let dinner = insert_tag("dinner", "#0000ff", &pool).await;

        let form = recipe_form(&[(tomato, 2)], &[lunch]);
        let id = create_recipe(author, &form, None, &pool).await.unwrap();

        let rename = RecipePatch {
            name: Some(String::from("Summer salad")),
            ..Default::default()
        };
        update_recipe(id, &rename, None, &pool).await.unwrap();

        let recipe = get_recipe(id, &pool).await.unwrap().unwrap();
        assert_eq!(recipe.name, "Summer salad");
        assert_eq!(recipe.cooking_time, 10);
        assert_eq!(tag_ids(id, &pool).await, vec![lunch]);
        assert_eq!(amounts(id, &pool).await, vec![(tomato, 2)]);

        let retag = RecipePatch {
            tags: Some(vec![dinner]),
            ingredients: Some(vec![IngredientAmount { id: salt, amount: 1 }]),
            ..Default::default()
        };
        update_recipe(id, &retag, None, &pool).await.unwrap();

        assert_eq!(tag_ids(id, &pool).await, vec![dinner]);
        assert_eq!(amounts(id, &pool).await, vec![(salt, 1)]);
        assert_eq!(recipe_count(&pool).await, 1);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn only_authors_and_admins_modify_recipes(pool: Pool<Postgres>) {
        let author = insert_user("cook", &pool).await;
        let other = insert_user("guest", &pool).await;
        let tomato = insert_ingredient("tomato", "g", &pool).await;
        let tag = insert_tag("lunch", "#00ff00", &pool).await;
        let id = create_recipe(author, &recipe_form(&[(tomato, 2)], &[tag]), None, &pool)
            .await
            .unwrap();

        let session = |user_id: Id, role: UserRole| SessionData {
            user_id,
            username: String::from("someone"),
            role,
        };

        assert!(get_recipe_mut(id, &session(author, UserRole::User), &pool).await.is_ok());
        assert!(get_recipe_mut(id, &session(other, UserRole::Admin), &pool).await.is_ok());
        let error = get_recipe_mut(id, &session(other, UserRole::User), &pool)
            .await
            .unwrap_err();
        assert_eq!(error.code, 403);
        let error = get_recipe_mut(id + 1, &session(author, UserRole::User), &pool)
            .await
            .unwrap_err();
        assert_eq!(error.code, 404);
    }
}
