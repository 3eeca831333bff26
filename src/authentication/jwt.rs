use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use jwt::{SignWithKey, VerifyWithKey};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::config::session_secret;
use crate::database::error::ApiError;
use crate::database::schema::{User, UserRole};

use super::permissions::ActionType;

const SESSION_TTL_HOURS: i64 = 24;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct JwtSessionData {
    pub user_id: i32,
    pub username: String,
    pub role: UserRole,
    iat: i64,
    exp: i64,
}

impl JwtSessionData {
    pub fn new(id: i32, username: String, role: UserRole) -> Self {
        let now = Utc::now();
        let iat = now.timestamp();
        let exp = (now + Duration::hours(SESSION_TTL_HOURS)).timestamp();

        Self {
            user_id: id,
            username,
            role,
            iat,
            exp,
        }
    }
}

/// Verified caller identity, as trusted by every action.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SessionData {
    pub user_id: i32,
    pub username: String,
    pub role: UserRole,
    pub is_admin: bool,
}

impl SessionData {
    pub fn authenticate(&self, action: ActionType) -> Result<(), ApiError> {
        if !action.permitted(self) {
            return Err(ApiError::Forbidden(
                "you don't have permission to perform this action".to_string(),
            ));
        }
        Ok(())
    }
}

impl From<JwtSessionData> for SessionData {
    fn from(value: JwtSessionData) -> Self {
        SessionData {
            user_id: value.user_id,
            username: value.username,
            is_admin: value.role == UserRole::Admin,
            role: value.role,
        }
    }
}

fn signing_key() -> Hmac<Sha256> {
    // HMAC accepts keys of any length, so this cannot fail
    Hmac::new_from_slice(&session_secret()).unwrap()
}

pub fn generate_jwt_session(user: &User) -> String {
    let claims = JwtSessionData::new(user.id, user.username.to_owned(), user.role.to_owned());

    claims.sign_with_key(&signing_key()).unwrap()
}

pub fn verify_jwt_session(token: &str) -> Result<JwtSessionData, ApiError> {
    let session: JwtSessionData = token
        .verify_with_key(&signing_key())
        .map_err(|_| ApiError::Unauthorized("invalid session token".to_string()))?;

    let now = Utc::now().timestamp();
    if session.exp <= now {
        return Err(ApiError::Unauthorized("session expired".to_string()));
    }

    Ok(session)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User {
            id: 1,
            username: "ada".to_string(),
            email: "ada@example.com".to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            password: String::new(),
            role: UserRole::User,
        }
    }

    #[test]
    fn session_round_trips() {
        let token = generate_jwt_session(&user());
        let session = verify_jwt_session(&token).unwrap();
        assert_eq!(session.user_id, 1);
        assert_eq!(session.username, "ada");
        assert_eq!(session.role, UserRole::User);
    }

    #[test]
    fn tampered_token_is_rejected() {
        let mut token = generate_jwt_session(&user());
        token.push('x');
        assert!(matches!(
            verify_jwt_session(&token),
            Err(ApiError::Unauthorized(_))
        ));
    }

    #[test]
    fn session_data_carries_admin_flag() {
        let mut user = user();
        user.role = UserRole::Admin;
        let session: SessionData =
            verify_jwt_session(&generate_jwt_session(&user)).unwrap().into();
        assert!(session.is_admin);
    }
}
