use std::convert::Infallible;

use serde_json::{json, Value};
use warp::{
    body::BodyDeserializeError,
    http::StatusCode,
    reject::{
        InvalidHeader, InvalidQuery, LengthRequired, MethodNotAllowed, MissingHeader,
        PayloadTooLarge, UnsupportedMediaType,
    },
    Rejection, Reply,
};

use crate::error::Error;

/// `{"<field>": ["<message>"]}` for input errors, `{"errors": "<message>"}`
/// otherwise.
pub fn error_body(error: &Error) -> Value {
    let info = error.info.as_deref().unwrap_or_default();
    match error.field {
        Some(field) => json!({ field: [info] }),
        None => json!({ "errors": info }),
    }
}

fn reply(code: StatusCode, body: Value) -> warp::reply::Response {
    warp::reply::with_status(warp::reply::json(&body), code).into_response()
}

fn message(code: StatusCode, info: &str) -> warp::reply::Response {
    reply(code, json!({ "errors": info }))
}

pub async fn handle_rejection(err: Rejection) -> Result<warp::reply::Response, Infallible> {
    if let Some(error) = err.find::<Error>() {
        let code = StatusCode::from_u16(error.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        return Ok(reply(code, error_body(error)));
    }

    let response = if let Some(e) = err.find::<BodyDeserializeError>() {
        log::debug!("Rejected body: {e}");
        message(StatusCode::BAD_REQUEST, "Malformed request body.")
    } else if let Some(e) = err.find::<InvalidQuery>() {
        log::debug!("Rejected query: {e}");
        message(StatusCode::BAD_REQUEST, "Malformed query string.")
    } else if err.find::<PayloadTooLarge>().is_some() {
        message(StatusCode::PAYLOAD_TOO_LARGE, "Request body is too large.")
    } else if err.find::<LengthRequired>().is_some() {
        message(StatusCode::LENGTH_REQUIRED, "Content-Length is required.")
    } else if err.find::<UnsupportedMediaType>().is_some() {
        message(StatusCode::UNSUPPORTED_MEDIA_TYPE, "Unsupported media type.")
    } else if let Some(e) = err.find::<MissingHeader>() {
        message(StatusCode::BAD_REQUEST, &format!("Missing header {}.", e.name()))
    } else if let Some(e) = err.find::<InvalidHeader>() {
        message(StatusCode::BAD_REQUEST, &format!("Invalid header {}.", e.name()))
    } else if err.is_not_found() {
        message(StatusCode::NOT_FOUND, "Not found.")
    } else if err.find::<MethodNotAllowed>().is_some() {
        message(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed.")
    } else {
        log::error!("Unhandled rejection: {err:?}");
        message(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error.")
    };

    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{HtmlError, ValidationError};

    #[test]
    fn field_errors_are_keyed_by_field() {
        let error: Error = ValidationError::new("ingredients", "Ingredients must be unique.").into();

        assert_eq!(
            error_body(&error),
            json!({ "ingredients": ["Ingredients must be unique."] })
        );
    }

    #[test]
    fn other_errors_use_errors_key() {
        let error = HtmlError::Forbidden.default();

        assert_eq!(
            error_body(&error),
            json!({ "errors": "You do not have permission to perform this action." })
        );
    }

    #[tokio::test]
    async fn custom_rejections_keep_their_status() {
        let rejection: Rejection = HtmlError::NotFound.default().into();
        let response = handle_rejection(rejection).await.unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn unknown_routes_are_not_found() {
        let response = handle_rejection(warp::reject::not_found()).await.unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
