use std::convert::Infallible;

use serde::Serialize;
use warp::http::StatusCode;
use warp::{reject::Rejection, reply::Reply};

use crate::database::error::ApiError;

#[derive(Serialize)]
struct ErrorBody {
    errors: String,
}

/// Terminal recovery: every rejection becomes a JSON body with a
/// machine-readable message under the original's `errors` key.
pub async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let (status, message) = if err.is_not_found() {
        (StatusCode::NOT_FOUND, "resource not found".to_string())
    } else if let Some(api_error) = err.find::<ApiError>() {
        if api_error.status() == StatusCode::INTERNAL_SERVER_ERROR {
            log::error!("internal error: {api_error}");
        }
        (api_error.status(), api_error.to_string())
    } else if let Some(e) = err.find::<warp::filters::body::BodyDeserializeError>() {
        (StatusCode::BAD_REQUEST, format!("malformed payload: {e}"))
    } else if err.find::<warp::reject::InvalidQuery>().is_some() {
        (StatusCode::BAD_REQUEST, "malformed query string".to_string())
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "method not allowed".to_string())
    } else {
        log::error!("unhandled rejection: {err:?}");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal server error".to_string(),
        )
    };

    let body = warp::reply::json(&ErrorBody { errors: message });
    Ok(warp::reply::with_status(body, status))
}
