use warp::{reject::Rejection, Filter};

use crate::database::error::ApiError;

use super::jwt::{verify_jwt_session, SessionData};

fn unauthorized() -> Rejection {
    ApiError::Unauthorized("authentication required".to_string()).into()
}

/// Requires a valid session cookie and hands the verified identity to
/// the handler.
pub fn with_session() -> impl Filter<Extract = (SessionData,), Error = Rejection> + Copy {
    warp::cookie::<String>("session").and_then(|session: String| async move {
        match verify_jwt_session(&session) {
            Ok(data) => Ok(data.into()),
            Err(_) => Err(unauthorized()),
        }
    })
}

/// Read endpoints work for anonymous callers too; an invalid or absent
/// cookie degrades to `None` instead of rejecting, so the filter
/// cannot fail.
pub fn with_possible_session(
) -> impl Filter<Extract = (Option<SessionData>,), Error = std::convert::Infallible> + Copy {
    warp::filters::cookie::optional::<String>("session").map(|session: Option<String>| {
        session
            .and_then(|s| verify_jwt_session(&s).ok())
            .map(SessionData::from)
    })
}
