use sqlx::{Pool, Postgres};

use crate::{
    error::ApiError,
    schema::{Ingredient, IngredientFilter},
};

/// Lists reference ingredients, optionally narrowed by a
/// case-insensitive starts-with match on the name.
pub async fn fetch_ingredients(
    filter: &IngredientFilter,
    pool: &Pool<Postgres>,
) -> Result<Vec<Ingredient>, ApiError> {
    let rows: Vec<Ingredient> = match filter.name_pattern() {
        Some(pattern) => {
            sqlx::query_as("SELECT * FROM ingredients WHERE name ILIKE $1 ORDER BY name")
                .bind(pattern)
                .fetch_all(pool)
                .await?
        }
        None => {
            sqlx::query_as("SELECT * FROM ingredients ORDER BY name")
                .fetch_all(pool)
                .await?
        }
    };

    Ok(rows)
}

pub async fn get_ingredient(id: i32, pool: &Pool<Postgres>) -> Result<Option<Ingredient>, ApiError> {
    let row: Option<Ingredient> = sqlx::query_as("SELECT * FROM ingredients WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(row)
}

/// Returns the subset of `ids` that does not exist in the reference
/// table. Used to reject recipe payloads referencing unknown
/// ingredients before any write happens.
pub async fn missing_ingredient_ids(
    ids: &[i32],
    pool: &Pool<Postgres>,
) -> Result<Vec<i32>, ApiError> {
    let known: Vec<(i32,)> = sqlx::query_as("SELECT id FROM ingredients WHERE id = ANY($1)")
        .bind(ids)
        .fetch_all(pool)
        .await?;

    let missing = ids
        .iter()
        .copied()
        .filter(|id| !known.iter().any(|(known_id,)| known_id == id))
        .collect();

    Ok(missing)
}
