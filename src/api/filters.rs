use std::{convert::Infallible, sync::Arc};

use serde::de::DeserializeOwned;
use sqlx::{Pool, Postgres};
use warp::{filters::BoxedFilter, reply::Response, Filter, Rejection, Reply};

use crate::{
    actions::RecipeList,
    config::Config,
    constants::MAX_BODY_SIZE,
    form::FormData,
    handlers,
    jwt::SessionData,
    middleware::{with_possible_session, with_session},
    rejection::handle_rejection,
    schema::{Id, LoginForm, PasswordForm, RecipeForm, RecipePatch, UserForm},
};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct Context {
    pub pool: Pool<Postgres>,
    pub config: Arc<Config>,
}

impl Context {
    pub fn new(pool: Pool<Postgres>, config: Config) -> Self {
        Self {
            pool,
            config: Arc::new(config),
        }
    }
}

fn with_context(ctx: Context) -> impl Filter<Extract = (Context,), Error = Infallible> + Clone {
    warp::any().map(move || ctx.clone())
}

fn json_body<T: DeserializeOwned + Send>() -> impl Filter<Extract = (T,), Error = Rejection> + Clone
{
    warp::body::content_length_limit(MAX_BODY_SIZE).and(warp::body::json())
}

fn query() -> impl Filter<Extract = (FormData,), Error = Rejection> + Clone {
    warp::query::<FormData>()
}

fn user_routes(ctx: &Context) -> BoxedFilter<(Response,)> {
    let session = || with_session(ctx.config.clone());
    let possible_session = || with_possible_session(ctx.config.clone());
    let context = || with_context(ctx.clone());

    let register = warp::path!("api" / "users")
        .and(warp::post())
        .and(json_body::<UserForm>())
        .and(context())
        .and_then(handlers::register);

    let list = warp::path!("api" / "users")
        .and(warp::get())
        .and(query())
        .and(possible_session())
        .and(context())
        .and_then(handlers::users);

    let me = warp::path!("api" / "users" / "me")
        .and(warp::get())
        .and(session())
        .and(context())
        .and_then(handlers::me);

    let set_password = warp::path!("api" / "users" / "set_password")
        .and(warp::post())
        .and(session())
        .and(json_body::<PasswordForm>())
        .and(context())
        .and_then(handlers::set_password);

    let subscriptions = warp::path!("api" / "users" / "subscriptions")
        .and(warp::get())
        .and(session())
        .and(query())
        .and(context())
        .and_then(handlers::subscriptions);

    let user = warp::path!("api" / "users" / Id)
        .and(warp::get())
        .and(possible_session())
        .and(context())
        .and_then(handlers::user);

    let subscribe = warp::path!("api" / "users" / Id / "subscribe")
        .and(warp::post())
        .and(session())
        .and(query())
        .and(context())
        .and_then(handlers::add_subscription);

    let unsubscribe = warp::path!("api" / "users" / Id / "subscribe")
        .and(warp::delete())
        .and(session())
        .and(context())
        .and_then(handlers::remove_subscription);

    register
        .or(list)
        .unify()
        .or(me)
        .unify()
        .or(set_password)
        .unify()
        .or(subscriptions)
        .unify()
        .or(user)
        .unify()
        .or(subscribe)
        .unify()
        .or(unsubscribe)
        .unify()
        .boxed()
}

fn auth_routes(ctx: &Context) -> BoxedFilter<(Response,)> {
    let login = warp::path!("api" / "auth" / "token" / "login")
        .and(warp::post())
        .and(json_body::<LoginForm>())
        .and(with_context(ctx.clone()))
        .and_then(handlers::login);

    let logout = warp::path!("api" / "auth" / "token" / "logout")
        .and(warp::post())
        .and(with_session(ctx.config.clone()))
        .and_then(handlers::logout);

    login.or(logout).unify().boxed()
}

fn catalogue_routes(ctx: &Context) -> BoxedFilter<(Response,)> {
    let context = || with_context(ctx.clone());

    let tags = warp::path!("api" / "tags")
        .and(warp::get())
        .and(context())
        .and_then(handlers::tags);

    let tag = warp::path!("api" / "tags" / Id)
        .and(warp::get())
        .and(context())
        .and_then(handlers::tag);

    let ingredients = warp::path!("api" / "ingredients")
        .and(warp::get())
        .and(query())
        .and(context())
        .and_then(handlers::ingredients);

    let ingredient = warp::path!("api" / "ingredients" / Id)
        .and(warp::get())
        .and(context())
        .and_then(handlers::ingredient);

    tags.or(tag)
        .unify()
        .or(ingredients)
        .unify()
        .or(ingredient)
        .unify()
        .boxed()
}

fn recipe_routes(ctx: &Context) -> BoxedFilter<(Response,)> {
    let session = || with_session(ctx.config.clone());
    let possible_session = || with_possible_session(ctx.config.clone());
    let context = || with_context(ctx.clone());

    let list = warp::path!("api" / "recipes")
        .and(warp::get())
        .and(query())
        .and(possible_session())
        .and(context())
        .and_then(handlers::recipes);

    let create = warp::path!("api" / "recipes")
        .and(warp::post())
        .and(session())
        .and(json_body::<RecipeForm>())
        .and(context())
        .and_then(handlers::create_recipe);

    let download = warp::path!("api" / "recipes" / "download_shopping_cart")
        .and(warp::get())
        .and(session())
        .and(context())
        .and_then(handlers::download_shopping_cart);

    let detail = warp::path!("api" / "recipes" / Id)
        .and(warp::get())
        .and(possible_session())
        .and(context())
        .and_then(handlers::recipe);

    let update = warp::path!("api" / "recipes" / Id)
        .and(warp::patch())
        .and(session())
        .and(json_body::<RecipePatch>())
        .and(context())
        .and_then(handlers::update_recipe);

    let replace = warp::path!("api" / "recipes" / Id)
        .and(warp::put())
        .and(session())
        .and(json_body::<RecipeForm>())
        .and(context())
        .and_then(handlers::replace_recipe);

    let delete = warp::path!("api" / "recipes" / Id)
        .and(warp::delete())
        .and(session())
        .and(context())
        .and_then(handlers::delete_recipe);

    let favorite = warp::path!("api" / "recipes" / Id / "favorite")
        .and(warp::post())
        .and(session())
        .and(context())
        .and_then(|id: Id, session: SessionData, ctx: Context| {
            handlers::add_to_recipe_list(RecipeList::Favorites, id, session, ctx)
        });

    let unfavorite = warp::path!("api" / "recipes" / Id / "favorite")
        .and(warp::delete())
        .and(session())
        .and(context())
        .and_then(|id: Id, session: SessionData, ctx: Context| {
            handlers::remove_from_recipe_list(RecipeList::Favorites, id, session, ctx)
        });

    let add_to_cart = warp::path!("api" / "recipes" / Id / "shopping_cart")
        .and(warp::post())
        .and(session())
        .and(context())
        .and_then(|id: Id, session: SessionData, ctx: Context| {
            handlers::add_to_recipe_list(RecipeList::ShoppingCart, id, session, ctx)
        });

    let remove_from_cart = warp::path!("api" / "recipes" / Id / "shopping_cart")
        .and(warp::delete())
        .and(session())
        .and(context())
        .and_then(|id: Id, session: SessionData, ctx: Context| {
            handlers::remove_from_recipe_list(RecipeList::ShoppingCart, id, session, ctx)
        });

    list.or(create)
        .unify()
        .or(download)
        .unify()
        .or(detail)
        .unify()
        .or(update)
        .unify()
        .or(replace)
        .unify()
        .or(delete)
        .unify()
        .or(favorite)
        .unify()
        .or(unfavorite)
        .unify()
        .or(add_to_cart)
        .unify()
        .or(remove_from_cart)
        .unify()
        .boxed()
}

fn media_routes(ctx: &Context) -> BoxedFilter<(Response,)> {
    warp::path("media")
        .and(warp::get())
        .and(warp::fs::dir(ctx.config.media_root.clone()))
        .map(|file: warp::fs::File| file.into_response())
        .boxed()
}

/// Every endpoint, with rejections rendered as JSON and request logging.
pub fn routes(ctx: Context) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    user_routes(&ctx)
        .or(auth_routes(&ctx))
        .unify()
        .or(catalogue_routes(&ctx))
        .unify()
        .or(recipe_routes(&ctx))
        .unify()
        .or(media_routes(&ctx))
        .unify()
        .recover(handle_rejection)
        .unify()
        .with(warp::log("recipe_hub::api"))
}
