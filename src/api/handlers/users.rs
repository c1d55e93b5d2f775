use warp::{http::StatusCode, reply::Response, Rejection};

use crate::{
    actions::{
        change_password, check_subscription_target, get_profile, get_subscription,
        get_user_by_id, list_subscriptions, list_users, login_user, register_user, subscribe,
        unsubscribe,
    },
    authentication::{cryptography::hash_password, permissions::ActionType},
    constants::USER_COUNT_PER_PAGE,
    error::{HtmlError, ValidationError},
    filters::Context,
    form::{Form, FormData},
    jwt::SessionData,
    pagination::PageRequest,
    schema::{AuthToken, Id, LoginForm, PasswordForm, RegisteredUser, UserForm},
    validators::{check_password, check_user_form},
};

use super::{json_response, no_content, subscription_links};

const USERS_PATH: &str = "/api/users/";
const SUBSCRIPTIONS_PATH: &str = "/api/users/subscriptions/";

fn page_request(form: &Form, default_limit: i64) -> Result<PageRequest, ValidationError> {
    PageRequest::new(
        form.get_number("page")?,
        form.get_number("limit")?,
        default_limit,
    )
}

fn recipes_limit(form: &Form) -> Result<Option<i64>, ValidationError> {
    match form.get_number::<i64>("recipes_limit")? {
        Some(limit) if limit < 0 => Err(ValidationError::new(
            "recipes_limit",
            "Ensure this value is greater than or equal to 0.",
        )),
        limit => Ok(limit),
    }
}

pub async fn register(form: UserForm, ctx: Context) -> Result<Response, Rejection> {
    check_user_form(&form)?;

    let hash = hash_password(&form.password).map_err(|e| {
        log::error!("Failed to hash password: {e}");
        HtmlError::InternalServerError.default()
    })?;

    let user = register_user(&form, &hash, &ctx.pool)
        .await?
        .ok_or_else(|| {
            HtmlError::InvalidRequest.new("A user with that email or username already exists.")
        })?;

    log::info!("Registered user {} ({})", user.id, user.username);
    let body = RegisteredUser {
        email: user.email,
        id: user.id,
        username: user.username,
        first_name: user.first_name,
        last_name: user.last_name,
    };
    Ok(json_response(&body, StatusCode::CREATED))
}

pub async fn login(form: LoginForm, ctx: Context) -> Result<Response, Rejection> {
    let auth_token = login_user(&form.email, &form.password, &ctx.config, &ctx.pool).await?;
    Ok(json_response(&AuthToken { auth_token }, StatusCode::OK))
}

/// Tokens are stateless; logging out only confirms the token was valid.
pub async fn logout(session: SessionData) -> Result<Response, Rejection> {
    log::debug!("User {} logged out", session.user_id);
    Ok(no_content())
}

pub async fn users(
    query: FormData,
    session: Option<SessionData>,
    ctx: Context,
) -> Result<Response, Rejection> {
    let form = Form::from_data(query);
    let request = page_request(&form, USER_COUNT_PER_PAGE)?;
    let viewer = session.map(|session| session.user_id);

    let page = list_users(request, viewer, USERS_PATH, &ctx.pool).await?;
    Ok(json_response(&page, StatusCode::OK))
}

pub async fn user(
    id: Id,
    session: Option<SessionData>,
    ctx: Context,
) -> Result<Response, Rejection> {
    let viewer = session.map(|session| session.user_id);
    let profile = get_profile(id, viewer, &ctx.pool)
        .await?
        .ok_or_else(|| HtmlError::NotFound.default())?;

    Ok(json_response(&profile, StatusCode::OK))
}

pub async fn me(session: SessionData, ctx: Context) -> Result<Response, Rejection> {
    let profile = get_profile(session.user_id, Some(session.user_id), &ctx.pool)
        .await?
        .ok_or_else(|| HtmlError::InvalidSession.new("User not found."))?;

    Ok(json_response(&profile, StatusCode::OK))
}

pub async fn set_password(
    session: SessionData,
    form: PasswordForm,
    ctx: Context,
) -> Result<Response, Rejection> {
    check_password("new_password", &form.new_password)?;
    change_password(
        session.user_id,
        &form.current_password,
        &form.new_password,
        &ctx.pool,
    )
    .await?;

    Ok(no_content())
}

pub async fn subscriptions(
    session: SessionData,
    query: FormData,
    ctx: Context,
) -> Result<Response, Rejection> {
    session.authenticate(ActionType::ManageOwnSubscriptions)?;

    let form = Form::from_data(query);
    let request = page_request(&form, USER_COUNT_PER_PAGE)?;
    let limit = recipes_limit(&form)?;

    let page = list_subscriptions(session.user_id, request, limit, SUBSCRIPTIONS_PATH, &ctx.pool)
        .await?
        .map(|subscription| subscription_links(&ctx.config, subscription));
    Ok(json_response(&page, StatusCode::OK))
}

pub async fn add_subscription(
    author_id: Id,
    session: SessionData,
    query: FormData,
    ctx: Context,
) -> Result<Response, Rejection> {
    session.authenticate(ActionType::ManageOwnSubscriptions)?;
    check_subscription_target(session.user_id, author_id)?;

    let form = Form::from_data(query);
    let limit = recipes_limit(&form)?;

    if get_user_by_id(&ctx.pool, author_id).await?.is_none() {
        return Err(HtmlError::NotFound.default().into());
    }
    subscribe(session.user_id, author_id, &ctx.pool).await?;

    let subscription = get_subscription(author_id, limit, &ctx.pool)
        .await?
        .ok_or_else(|| HtmlError::NotFound.default())?;
    Ok(json_response(
        &subscription_links(&ctx.config, subscription),
        StatusCode::CREATED,
    ))
}

pub async fn remove_subscription(
    author_id: Id,
    session: SessionData,
    ctx: Context,
) -> Result<Response, Rejection> {
    session.authenticate(ActionType::ManageOwnSubscriptions)?;

    if get_user_by_id(&ctx.pool, author_id).await?.is_none() {
        return Err(HtmlError::NotFound.default().into());
    }
    unsubscribe(session.user_id, author_id, &ctx.pool).await?;

    Ok(no_content())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(pairs: &[(&str, &str)]) -> Form {
        Form::from_data(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn recipes_limit_must_not_be_negative() {
        assert_eq!(recipes_limit(&form(&[])), Ok(None));
        assert_eq!(recipes_limit(&form(&[("recipes_limit", "3")])), Ok(Some(3)));
        assert!(recipes_limit(&form(&[("recipes_limit", "-1")])).is_err());
        assert!(recipes_limit(&form(&[("recipes_limit", "x")])).is_err());
    }
}
