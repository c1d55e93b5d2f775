use warp::{http::StatusCode, reply::Response, Rejection};

use crate::{
    actions::{get_ingredient, get_tag, list_ingredients, list_tags},
    error::HtmlError,
    filters::Context,
    form::{Form, FormData},
    schema::Id,
};

use super::json_response;

pub async fn tags(ctx: Context) -> Result<Response, Rejection> {
    let tags = list_tags(&ctx.pool).await?;
    Ok(json_response(&tags, StatusCode::OK))
}

pub async fn tag(id: Id, ctx: Context) -> Result<Response, Rejection> {
    let tag = get_tag(id, &ctx.pool)
        .await?
        .ok_or_else(|| HtmlError::NotFound.default())?;

    Ok(json_response(&tag, StatusCode::OK))
}

pub async fn ingredients(query: FormData, ctx: Context) -> Result<Response, Rejection> {
    let form = Form::from_data(query);
    let ingredients = list_ingredients(form.get_str("name"), &ctx.pool).await?;

    Ok(json_response(&ingredients, StatusCode::OK))
}

pub async fn ingredient(id: Id, ctx: Context) -> Result<Response, Rejection> {
    let ingredient = get_ingredient(id, &ctx.pool)
        .await?
        .ok_or_else(|| HtmlError::NotFound.default())?;

    Ok(json_response(&ingredient, StatusCode::OK))
}
