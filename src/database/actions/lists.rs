use sqlx::{Pool, Postgres};

use crate::{
    error::ApiError,
    schema::{ListKind, ShortRecipe},
};

/// One contract for every user-scoped recipe list: favorite and
/// shopping cart differ only in `kind`. The recipe must exist for both
/// add and remove (NotFound takes precedence over any membership
/// outcome). The unique constraint on (user_id, recipe_id, kind) is
/// the authoritative guard against concurrent duplicate adds; the
/// insert itself is the check-then-act unit, so no advisory SELECT
/// precedes it.

async fn short_recipe(
    recipe_id: i32,
    pool: &Pool<Postgres>,
) -> Result<Option<ShortRecipe>, ApiError> {
    let recipe: Option<ShortRecipe> =
        sqlx::query_as("SELECT id, name, image, cooking_time FROM recipes WHERE id = $1")
            .bind(recipe_id)
            .fetch_optional(pool)
            .await?;

    Ok(recipe)
}

fn require_recipe(recipe: Option<ShortRecipe>) -> Result<ShortRecipe, ApiError> {
    recipe.ok_or_else(|| ApiError::not_found("recipe"))
}

fn check_added(rows_affected: u64, kind: ListKind) -> Result<(), ApiError> {
    if rows_affected == 0 {
        return Err(ApiError::Conflict(format!(
            "recipe is already in {}",
            kind.label()
        )));
    }
    Ok(())
}

fn check_removed(rows_affected: u64, kind: ListKind) -> Result<(), ApiError> {
    if rows_affected == 0 {
        return Err(ApiError::Conflict(format!(
            "recipe is not in {}",
            kind.label()
        )));
    }
    Ok(())
}

pub async fn add_to_list(
    user_id: i32,
    recipe_id: i32,
    kind: ListKind,
    pool: &Pool<Postgres>,
) -> Result<ShortRecipe, ApiError> {
    let recipe = require_recipe(short_recipe(recipe_id, pool).await?)?;

    let result = sqlx::query(
        "
        INSERT INTO user_recipe_lists (user_id, recipe_id, kind)
        VALUES ($1, $2, $3)
        ON CONFLICT DO NOTHING;
    ",
    )
    .bind(user_id)
    .bind(recipe_id)
    .bind(kind)
    .execute(pool)
    .await?;

    check_added(result.rows_affected(), kind)?;

    Ok(recipe)
}

pub async fn remove_from_list(
    user_id: i32,
    recipe_id: i32,
    kind: ListKind,
    pool: &Pool<Postgres>,
) -> Result<(), ApiError> {
    require_recipe(short_recipe(recipe_id, pool).await?)?;

    let result = sqlx::query(
        "DELETE FROM user_recipe_lists WHERE user_id = $1 AND recipe_id = $2 AND kind = $3",
    )
    .bind(user_id)
    .bind(recipe_id)
    .bind(kind)
    .execute(pool)
    .await?;

    check_removed(result.rows_affected(), kind)
}

pub async fn is_in_list(
    user_id: i32,
    recipe_id: i32,
    kind: ListKind,
    pool: &Pool<Postgres>,
) -> Result<bool, ApiError> {
    let row: Option<(i32,)> = sqlx::query_as(
        "
        SELECT recipe_id FROM user_recipe_lists
        WHERE user_id = $1 AND recipe_id = $2 AND kind = $3
    ",
    )
    .bind(user_id)
    .bind(recipe_id)
    .bind(kind)
    .fetch_optional(pool)
    .await?;

    Ok(row.is_some())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recipe() -> ShortRecipe {
        ShortRecipe {
            id: 1,
            name: "Borscht".to_string(),
            image: "recipes/borscht.png".to_string(),
            cooking_time: 60,
        }
    }

    #[test]
    fn missing_recipe_is_not_found_before_any_membership_outcome() {
        // applies to both add and remove: a nonexistent recipe is 404,
        // never "not in list"
        assert!(matches!(
            require_recipe(None),
            Err(ApiError::NotFound(_))
        ));
        assert_eq!(require_recipe(Some(recipe())).unwrap().id, 1);
    }

    #[test]
    fn duplicate_add_is_a_conflict() {
        assert!(matches!(
            check_added(0, ListKind::Favorite),
            Err(ApiError::Conflict(_))
        ));
        assert!(check_added(1, ListKind::Favorite).is_ok());
    }

    #[test]
    fn removing_an_absent_membership_is_a_conflict() {
        assert!(matches!(
            check_removed(0, ListKind::ShoppingCart),
            Err(ApiError::Conflict(_))
        ));
        assert!(check_removed(1, ListKind::ShoppingCart).is_ok());
    }

    #[test]
    fn conflict_messages_name_the_list() {
        let Err(ApiError::Conflict(message)) = check_removed(0, ListKind::Favorite) else {
            panic!("expected a conflict");
        };
        assert_eq!(message, "recipe is not in favorites");
    }
}
