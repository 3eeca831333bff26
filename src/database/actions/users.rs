use sqlx::{Pool, Postgres};

use crate::{
    authentication::{
        cryptography::{hash_password, verify_password},
        jwt::generate_jwt_session,
    },
    error::ApiError,
    schema::{User, UserProfile, UserRole},
};

use super::follows::is_subscribed;

pub async fn get_user(pool: &Pool<Postgres>, username: &str) -> Result<Option<User>, ApiError> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE username = $1")
        .bind(username)
        .fetch_optional(pool)
        .await?;

    Ok(row)
}

pub async fn get_user_by_id(pool: &Pool<Postgres>, user_id: i32) -> Result<Option<User>, ApiError> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

    Ok(row)
}

/// Creates a user with a freshly hashed password. Username and email
/// uniqueness is enforced by the store.
pub async fn register_user(
    username: &str,
    email: &str,
    first_name: &str,
    last_name: &str,
    password: &str,
    pool: &Pool<Postgres>,
) -> Result<i32, ApiError> {
    let password = hash_password(password)
        .map_err(|e| ApiError::Validation(format!("invalid password: {e}")))?;

    let result: Option<(i32,)> = sqlx::query_as(
        "
        INSERT INTO users (username, email, first_name, last_name, password, role)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT DO NOTHING RETURNING id;
    ",
    )
    .bind(username)
    .bind(email)
    .bind(first_name)
    .bind(last_name)
    .bind(password)
    .bind(UserRole::User)
    .fetch_optional(pool)
    .await?;

    match result {
        Some((id,)) => Ok(id),
        None => Err(ApiError::Conflict(
            "username or email is already taken".to_string(),
        )),
    }
}

pub async fn login_user(
    username: &str,
    password: &str,
    pool: &Pool<Postgres>,
) -> Result<String, ApiError> {
    let user = get_user(pool, username)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("invalid credentials".to_string()))?;

    let authenticated = verify_password(password, &user.password)
        .map_err(|e| ApiError::Database(format!("stored password hash is corrupt: {e}")))?;
    if !authenticated {
        return Err(ApiError::Unauthorized("invalid credentials".to_string()));
    }

    Ok(generate_jwt_session(&user))
}

/// User as seen by `viewer` (is_subscribed resolves against the
/// viewer's follow list; anonymous viewers are never subscribed).
pub async fn user_profile(
    user_id: i32,
    viewer: Option<i32>,
    pool: &Pool<Postgres>,
) -> Result<UserProfile, ApiError> {
    let user = get_user_by_id(pool, user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("user"))?;

    let subscribed = match viewer {
        Some(viewer_id) if viewer_id != user_id => {
            is_subscribed(viewer_id, user_id, pool).await?
        }
        _ => false,
    };

    Ok(UserProfile::from_user(user, subscribed))
}
