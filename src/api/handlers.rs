mod catalogue;
mod recipes;
mod users;

pub use catalogue::*;
pub use recipes::*;
pub use users::*;

use serde::Serialize;
use warp::{http::StatusCode, reply::Response, Reply};

use crate::{
    config::Config,
    schema::{MiniRecipe, RecipeDetail, Subscription},
};

pub fn json_response<T: Serialize>(value: &T, status: StatusCode) -> Response {
    warp::reply::with_status(warp::reply::json(value), status).into_response()
}

pub fn no_content() -> Response {
    StatusCode::NO_CONTENT.into_response()
}

fn link(config: &Config, image: Option<String>) -> Option<String> {
    image.map(|path| config.media_link(&path))
}

pub fn detail_links(config: &Config, mut detail: RecipeDetail) -> RecipeDetail {
    detail.image = link(config, detail.image.take());
    detail
}

pub fn mini_links(config: &Config, mut recipe: MiniRecipe) -> MiniRecipe {
    recipe.image = link(config, recipe.image.take());
    recipe
}

pub fn subscription_links(config: &Config, mut subscription: Subscription) -> Subscription {
    subscription.recipes = subscription
        .recipes
        .into_iter()
        .map(|recipe| mini_links(config, recipe))
        .collect();
    subscription
}
