use warp::{
    http::{header, StatusCode},
    reply::Response,
    Rejection, Reply,
};

use crate::{
    actions::{
        add_to_list, check_references, create_recipe as insert_recipe, delete_recipe as drop_recipe,
        fetch_recipes, get_mini_recipe, get_recipe, get_recipe_mut, recipe_detail,
        recipe_details, remove_from_list, shopping_list, update_recipe as patch_recipe,
        ListAction, RecipeFilter, RecipeList,
    },
    authentication::permissions::ActionType,
    constants::{RECIPE_COUNT_PER_PAGE, SHOPPING_CART_FILENAME},
    error::{Error, HtmlError, ValidationError},
    filters::Context,
    form::{Form, FormData},
    images::{decode_data_uri, remove_image, save_image, DecodedImage},
    jwt::SessionData,
    pagination::{Page, PageRequest},
    schema::{Id, RecipeForm, RecipePatch},
    validators::{check_recipe_form, check_recipe_patch},
};

use super::{detail_links, json_response, mini_links, no_content};

const RECIPES_PATH: &str = "/api/recipes/";

/// Query filters of the recipe list. The list filters apply only to signed in
/// viewers.
pub fn recipe_filter(form: &Form, viewer: Option<Id>) -> Result<RecipeFilter, ValidationError> {
    Ok(RecipeFilter {
        author: form.get_number("author")?,
        tags: form.get_all("tags"),
        favorited_by: viewer.filter(|_| form.get_flag("is_favorited")),
        in_cart_of: viewer.filter(|_| form.get_flag("is_in_shopping_cart")),
    })
}

fn decode_image(image: Option<&str>) -> Result<Option<DecodedImage>, ValidationError> {
    image.map(decode_data_uri).transpose()
}

async fn store_image(ctx: &Context, image: Option<DecodedImage>) -> Result<Option<String>, Error> {
    match image {
        Some(image) => Ok(Some(save_image(&ctx.config.media_root, image).await?)),
        None => Ok(None),
    }
}

async fn discard_image(ctx: &Context, image: Option<&str>) {
    if let Some(image) = image {
        remove_image(&ctx.config.media_root, image).await;
    }
}

pub async fn recipes(
    query: FormData,
    session: Option<SessionData>,
    ctx: Context,
) -> Result<Response, Rejection> {
    let viewer = session.map(|session| session.user_id);
    let form = Form::from_data(query);
    let filter = recipe_filter(&form, viewer)?;
    let request = PageRequest::new(
        form.get_number("page")?,
        form.get_number("limit")?,
        RECIPE_COUNT_PER_PAGE,
    )?;

    let (rows, count) = fetch_recipes(&filter, request, &ctx.pool).await?;
    let details = recipe_details(rows, viewer, &ctx.pool).await?;

    let page = Page::from_rows(details, count, request, RECIPES_PATH)
        .map(|detail| detail_links(&ctx.config, detail));
    Ok(json_response(&page, StatusCode::OK))
}

pub async fn recipe(
    id: Id,
    session: Option<SessionData>,
    ctx: Context,
) -> Result<Response, Rejection> {
    let recipe = get_recipe(id, &ctx.pool)
        .await?
        .ok_or_else(|| HtmlError::NotFound.default())?;

    let viewer = session.map(|session| session.user_id);
    let detail = recipe_detail(recipe, viewer, &ctx.pool).await?;
    Ok(json_response(&detail_links(&ctx.config, detail), StatusCode::OK))
}

pub async fn create_recipe(
    session: SessionData,
    form: RecipeForm,
    ctx: Context,
) -> Result<Response, Rejection> {
    session.authenticate(ActionType::CreateRecipes)?;
    check_recipe_form(&form)?;
    let image = decode_image(form.image.as_deref())?;
    check_references(
        Some(form.ingredients.as_slice()),
        Some(form.tags.as_slice()),
        &ctx.pool,
    )
    .await?;

    let image = store_image(&ctx, image).await?;
    let id = match insert_recipe(session.user_id, &form, image.as_deref(), &ctx.pool).await {
        Ok(id) => id,
        Err(e) => {
            discard_image(&ctx, image.as_deref()).await;
            return Err(e.into());
        }
    };

    let recipe = get_recipe(id, &ctx.pool)
        .await?
        .ok_or_else(|| HtmlError::NotFound.default())?;
    let detail = recipe_detail(recipe, Some(session.user_id), &ctx.pool).await?;
    Ok(json_response(&detail_links(&ctx.config, detail), StatusCode::CREATED))
}

pub async fn update_recipe(
    id: Id,
    session: SessionData,
    patch: RecipePatch,
    ctx: Context,
) -> Result<Response, Rejection> {
    let current = get_recipe_mut(id, &session, &ctx.pool).await?;
    check_recipe_patch(&patch)?;
    let image = decode_image(patch.image.as_deref())?;
    check_references(patch.ingredients.as_deref(), patch.tags.as_deref(), &ctx.pool).await?;

    let image = store_image(&ctx, image).await?;
    if let Err(e) = patch_recipe(id, &patch, image.as_deref(), &ctx.pool).await {
        discard_image(&ctx, image.as_deref()).await;
        return Err(e.into());
    }
    if image.is_some() {
        discard_image(&ctx, current.image.as_deref()).await;
    }

    let recipe = get_recipe(id, &ctx.pool)
        .await?
        .ok_or_else(|| HtmlError::NotFound.default())?;
    let detail = recipe_detail(recipe, Some(session.user_id), &ctx.pool).await?;
    Ok(json_response(&detail_links(&ctx.config, detail), StatusCode::OK))
}

pub async fn replace_recipe(
    id: Id,
    session: SessionData,
    form: RecipeForm,
    ctx: Context,
) -> Result<Response, Rejection> {
    update_recipe(id, session, RecipePatch::from(form), ctx).await
}

pub async fn delete_recipe(
    id: Id,
    session: SessionData,
    ctx: Context,
) -> Result<Response, Rejection> {
    get_recipe_mut(id, &session, &ctx.pool).await?;
    let image = drop_recipe(id, &ctx.pool).await?;
    discard_image(&ctx, image.as_deref()).await;

    log::info!("User {} deleted recipe {id}", session.user_id);
    Ok(no_content())
}

pub async fn add_to_recipe_list(
    list: RecipeList,
    id: Id,
    session: SessionData,
    ctx: Context,
) -> Result<Response, Rejection> {
    session.authenticate(ActionType::ManageOwnLists)?;
    let recipe = get_mini_recipe(id, &ctx.pool)
        .await?
        .ok_or_else(|| ListAction::Add.missing_recipe())?;

    add_to_list(list, session.user_id, id, &ctx.pool).await?;
    Ok(json_response(&mini_links(&ctx.config, recipe), StatusCode::CREATED))
}

pub async fn remove_from_recipe_list(
    list: RecipeList,
    id: Id,
    session: SessionData,
    ctx: Context,
) -> Result<Response, Rejection> {
    session.authenticate(ActionType::ManageOwnLists)?;
    if get_mini_recipe(id, &ctx.pool).await?.is_none() {
        return Err(ListAction::Remove.missing_recipe().into());
    }

    remove_from_list(list, session.user_id, id, &ctx.pool).await?;
    Ok(no_content())
}

pub async fn download_shopping_cart(
    session: SessionData,
    ctx: Context,
) -> Result<Response, Rejection> {
    session.authenticate(ActionType::ManageOwnLists)?;
    let content = shopping_list(session.user_id, &ctx.pool).await?;
    Ok(attachment(content))
}

fn attachment(content: String) -> Response {
    let reply = warp::reply::with_header(
        content,
        header::CONTENT_TYPE,
        "text/plain; charset=utf-8",
    );
    let reply = warp::reply::with_header(
        reply,
        header::CONTENT_DISPOSITION,
        format!("attachment; filename={SHOPPING_CART_FILENAME}"),
    );
    reply.into_response()
}
