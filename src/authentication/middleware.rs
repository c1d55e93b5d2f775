use std::sync::Arc;

use warp::{reject::Rejection, Filter};

use crate::{
    config::Config,
    error::{Error, HtmlError},
};

use super::jwt::{verify_jwt_session, SessionData};

/// Extracts the token from an `Authorization: Token <jwt>` header. `Bearer`
/// is accepted as well.
pub fn token_from_header(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    let token = token.trim();

    if token.is_empty() {
        return None;
    }
    if scheme.eq_ignore_ascii_case("token") || scheme.eq_ignore_ascii_case("bearer") {
        Some(token)
    } else {
        None
    }
}

fn resolve_session(header: &str, secret: &[u8]) -> Result<SessionData, Error> {
    let token = token_from_header(header).ok_or_else(|| HtmlError::InvalidSession.default())?;
    Ok(verify_jwt_session(token, secret)?.into())
}

fn with_config(
    config: Arc<Config>,
) -> impl Filter<Extract = (Arc<Config>,), Error = std::convert::Infallible> + Clone {
    warp::any().map(move || config.clone())
}

/// Requires a valid session.
pub fn with_session(
    config: Arc<Config>,
) -> impl Filter<Extract = (SessionData,), Error = Rejection> + Clone {
    warp::header::optional::<String>("authorization")
        .and(with_config(config))
        .and_then(|header: Option<String>, config: Arc<Config>| async move {
            match header {
                Some(header) => resolve_session(&header, config.jwt_secret.as_bytes())
                    .map_err(Rejection::from),
                None => Err(Rejection::from(HtmlError::Unauthorized.default())),
            }
        })
}

/// Anonymous requests pass through as `None`. A header carrying a bad token
/// is still rejected.
pub fn with_possible_session(
    config: Arc<Config>,
) -> impl Filter<Extract = (Option<SessionData>,), Error = Rejection> + Clone {
    warp::header::optional::<String>("authorization")
        .and(with_config(config))
        .and_then(|header: Option<String>, config: Arc<Config>| async move {
            match header {
                Some(header) => resolve_session(&header, config.jwt_secret.as_bytes())
                    .map(Some)
                    .map_err(Rejection::from),
                None => Ok(None),
            }
        })
}
