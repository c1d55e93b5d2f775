use std::collections::HashSet;

use crate::{
    constants::{
        MAX_EMAIL_LENGTH, MAX_PERSON_NAME_LENGTH, MAX_RECIPE_NAME_LENGTH, MAX_USERNAME_LENGTH,
        MIN_COOKING_TIME, MIN_INGREDIENT_AMOUNT,
    },
    error::ValidationError,
    schema::{Id, IngredientAmount, RecipeForm, RecipePatch, UserForm},
};

/// Structural checks on a submitted ingredient list. Existence is checked
/// separately with [`check_known`] once the stored ids have been fetched.
pub fn check_ingredients(ingredients: &[IngredientAmount]) -> Result<(), ValidationError> {
    if ingredients.is_empty() {
        return Err(ValidationError::new(
            "ingredients",
            "No ingredients were added.",
        ));
    }

    let mut seen: HashSet<Id> = HashSet::with_capacity(ingredients.len());
    for ingredient in ingredients {
        if !seen.insert(ingredient.id) {
            return Err(ValidationError::new(
                "ingredients",
                "This ingredient is already in the list.",
            ));
        }

        if ingredient.amount < MIN_INGREDIENT_AMOUNT {
            return Err(ValidationError::new(
                "ingredients",
                "Amount must be greater than zero.",
            ));
        }
    }

    Ok(())
}

pub fn check_tags(tags: &[Id]) -> Result<(), ValidationError> {
    if tags.is_empty() {
        return Err(ValidationError::new("tags", "No tags were added."));
    }

    let mut seen: HashSet<Id> = HashSet::with_capacity(tags.len());
    if tags.iter().any(|tag| !seen.insert(*tag)) {
        return Err(ValidationError::new("tags", "This tag is already in the list."));
    }

    Ok(())
}

/// Fails on the first submitted id missing from `known`.
pub fn check_known<I>(
    field: &'static str,
    ids: I,
    known: &HashSet<Id>,
    message: &str,
) -> Result<(), ValidationError>
where
    I: IntoIterator<Item = Id>,
{
    match ids.into_iter().find(|id| !known.contains(id)) {
        Some(_) => Err(ValidationError::new(field, message)),
        None => Ok(()),
    }
}

fn check_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::new("name", "This field may not be blank."));
    }
    if name.chars().count() > MAX_RECIPE_NAME_LENGTH {
        return Err(ValidationError::new(
            "name",
            &format!("Ensure this field has no more than {MAX_RECIPE_NAME_LENGTH} characters."),
        ));
    }
    Ok(())
}

fn check_text(text: &str) -> Result<(), ValidationError> {
    if text.trim().is_empty() {
        return Err(ValidationError::new("text", "This field may not be blank."));
    }
    Ok(())
}

fn check_cooking_time(cooking_time: i32) -> Result<(), ValidationError> {
    if cooking_time < MIN_COOKING_TIME {
        return Err(ValidationError::new(
            "cooking_time",
            &format!("Ensure this value is greater than or equal to {MIN_COOKING_TIME}."),
        ));
    }
    Ok(())
}

pub fn check_recipe_form(form: &RecipeForm) -> Result<(), ValidationError> {
    check_ingredients(&form.ingredients)?;
    check_tags(&form.tags)?;
    check_name(&form.name)?;
    check_text(&form.text)?;
    check_cooking_time(form.cooking_time)
}

/// Supplied lists go through the same checks as on create, so an empty list
/// is rejected rather than read as "keep the current associations".
pub fn check_recipe_patch(patch: &RecipePatch) -> Result<(), ValidationError> {
    if let Some(ingredients) = &patch.ingredients {
        check_ingredients(ingredients)?;
    }
    if let Some(tags) = &patch.tags {
        check_tags(tags)?;
    }
    if let Some(name) = &patch.name {
        check_name(name)?;
    }
    if let Some(text) = &patch.text {
        check_text(text)?;
    }
    if let Some(cooking_time) = patch.cooking_time {
        check_cooking_time(cooking_time)?;
    }
    Ok(())
}

fn check_length(field: &'static str, value: &str, max: usize) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new(field, "This field may not be blank."));
    }
    if value.chars().count() > max {
        return Err(ValidationError::new(
            field,
            &format!("Ensure this field has no more than {max} characters."),
        ));
    }
    Ok(())
}

pub fn check_password(field: &'static str, password: &str) -> Result<(), ValidationError> {
    if password.is_empty() {
        return Err(ValidationError::new(field, "This field may not be blank."));
    }
    Ok(())
}

pub fn check_user_form(form: &UserForm) -> Result<(), ValidationError> {
    check_length("email", &form.email, MAX_EMAIL_LENGTH)?;
    match form.email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => {}
        _ => {
            return Err(ValidationError::new(
                "email",
                "Enter a valid email address.",
            ))
        }
    }

    check_length("username", &form.username, MAX_USERNAME_LENGTH)?;
    let valid_username = form
        .username
        .chars()
        .all(|c| c.is_alphanumeric() || c == '_' || "@.+-".contains(c));
    if !valid_username {
        return Err(ValidationError::new(
            "username",
            "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
        ));
    }

    check_length("first_name", &form.first_name, MAX_PERSON_NAME_LENGTH)?;
    check_length("last_name", &form.last_name, MAX_PERSON_NAME_LENGTH)?;
    check_password("password", &form.password)
}
