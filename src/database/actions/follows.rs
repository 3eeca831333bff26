use std::collections::HashMap;

use sqlx::{Pool, Postgres};

use crate::{
    constants::SUBSCRIPTION_COUNT_PER_PAGE,
    error::ApiError,
    pagination::PageContext,
    schema::{FollowedAuthor, ShortRecipe, User},
};

/// Rejects a self-follow before any store access. The store backs this
/// up with CHECK(user_id <> author_id) on user_follows.
pub fn check_not_self(user_id: i32, author_id: i32) -> Result<(), ApiError> {
    if user_id == author_id {
        return Err(ApiError::Conflict(
            "subscribing to yourself is not possible".to_string(),
        ));
    }
    Ok(())
}

/// The followed author must exist before any follow outcome is
/// decided: an unknown author is NotFound on both subscribe and
/// unsubscribe, never a follow-state conflict.
fn require_author(author: Option<User>) -> Result<User, ApiError> {
    author.ok_or_else(|| ApiError::not_found("user"))
}

fn check_unfollowed(rows_affected: u64) -> Result<(), ApiError> {
    if rows_affected == 0 {
        return Err(ApiError::Conflict(
            "not subscribed to this user".to_string(),
        ));
    }
    Ok(())
}

pub async fn is_subscribed(
    user_id: i32,
    author_id: i32,
    pool: &Pool<Postgres>,
) -> Result<bool, ApiError> {
    let row: Option<(i32,)> = sqlx::query_as(
        "SELECT author_id FROM user_follows WHERE user_id = $1 AND author_id = $2",
    )
    .bind(user_id)
    .bind(author_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.is_some())
}

pub async fn subscribe(
    user_id: i32,
    author_id: i32,
    pool: &Pool<Postgres>,
) -> Result<FollowedAuthor, ApiError> {
    check_not_self(user_id, author_id)?;

    let author = require_author(super::users::get_user_by_id(pool, author_id).await?)?;

    let result = sqlx::query(
        "
        INSERT INTO user_follows (user_id, author_id)
        VALUES ($1, $2)
        ON CONFLICT DO NOTHING;
    ",
    )
    .bind(user_id)
    .bind(author_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::Conflict(
            "already subscribed to this user".to_string(),
        ));
    }

    let recipes = author_recipes(&[author_id], pool)
        .await?
        .remove(&author_id)
        .unwrap_or_default();

    Ok(FollowedAuthor {
        id: author.id,
        username: author.username,
        email: author.email,
        first_name: author.first_name,
        last_name: author.last_name,
        is_subscribed: true,
        recipes_count: recipes.len() as i64,
        recipes,
    })
}

pub async fn unsubscribe(
    user_id: i32,
    author_id: i32,
    pool: &Pool<Postgres>,
) -> Result<(), ApiError> {
    require_author(super::users::get_user_by_id(pool, author_id).await?)?;

    let result = sqlx::query("DELETE FROM user_follows WHERE user_id = $1 AND author_id = $2")
        .bind(user_id)
        .bind(author_id)
        .execute(pool)
        .await?;

    check_unfollowed(result.rows_affected())
}

#[derive(sqlx::FromRow)]
struct AuthorRow {
    id: i32,
    username: String,
    email: String,
    first_name: String,
    last_name: String,
    count: i64,
}

/// Authors the user follows, each with their recipes attached.
pub async fn list_subscriptions(
    user_id: i32,
    offset: i64,
    pool: &Pool<Postgres>,
) -> Result<PageContext<FollowedAuthor>, ApiError> {
    let authors: Vec<AuthorRow> = sqlx::query_as(
        "
        SELECT u.id, u.username, u.email, u.first_name, u.last_name, COUNT(*) OVER() AS count
        FROM user_follows f
        INNER JOIN users u ON u.id = f.author_id
        WHERE f.user_id = $1
        ORDER BY u.username
        LIMIT $2 OFFSET $3
    ",
    )
    .bind(user_id)
    .bind(SUBSCRIPTION_COUNT_PER_PAGE)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    let author_ids: Vec<i32> = authors.iter().map(|a| a.id).collect();
    let mut recipes = author_recipes(&author_ids, pool).await?;

    let total_count = authors.first().map(|a| a.count).unwrap_or(0);
    let rows = authors
        .into_iter()
        .map(|author| {
            let recipes = recipes.remove(&author.id).unwrap_or_default();
            FollowedAuthor {
                id: author.id,
                username: author.username,
                email: author.email,
                first_name: author.first_name,
                last_name: author.last_name,
                is_subscribed: true,
                recipes_count: recipes.len() as i64,
                recipes,
            }
        })
        .collect();

    Ok(PageContext::from_rows(
        rows,
        total_count,
        SUBSCRIPTION_COUNT_PER_PAGE,
        offset,
    ))
}

#[derive(sqlx::FromRow)]
struct AuthoredRecipeRow {
    author_id: i32,
    id: i32,
    name: String,
    image: String,
    cooking_time: i32,
}

async fn author_recipes(
    author_ids: &[i32],
    pool: &Pool<Postgres>,
) -> Result<HashMap<i32, Vec<ShortRecipe>>, ApiError> {
    let rows: Vec<AuthoredRecipeRow> = sqlx::query_as(
        "
        SELECT author_id, id, name, image, cooking_time
        FROM recipes
        WHERE author_id = ANY($1)
        ORDER BY pub_date DESC
    ",
    )
    .bind(author_ids)
    .fetch_all(pool)
    .await?;

    let mut map: HashMap<i32, Vec<ShortRecipe>> = HashMap::new();
    for row in rows {
        map.entry(row.author_id).or_default().push(ShortRecipe {
            id: row.id,
            name: row.name,
            image: row.image,
            cooking_time: row.cooking_time,
        });
    }

    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn self_follow_is_a_conflict() {
        assert!(matches!(
            check_not_self(7, 7),
            Err(ApiError::Conflict(_))
        ));
    }

    #[test]
    fn distinct_users_pass_the_self_check() {
        assert!(check_not_self(7, 8).is_ok());
    }

    #[test]
    fn unknown_author_is_not_found_before_any_follow_outcome() {
        assert!(matches!(require_author(None), Err(ApiError::NotFound(_))));

        let author = User {
            id: 8,
            username: "maria".to_string(),
            email: "maria@example.com".to_string(),
            first_name: "Maria".to_string(),
            last_name: "Keto".to_string(),
            password: String::new(),
            role: crate::schema::UserRole::User,
        };
        assert_eq!(require_author(Some(author)).unwrap().id, 8);
    }

    #[test]
    fn unfollowing_without_a_follow_is_a_conflict() {
        assert!(matches!(check_unfollowed(0), Err(ApiError::Conflict(_))));
        assert!(check_unfollowed(1).is_ok());
    }
}
