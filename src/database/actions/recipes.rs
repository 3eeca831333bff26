use std::collections::{HashMap, HashSet};

use sqlx::{Pool, Postgres, QueryBuilder};

use crate::{
    constants::RECIPE_COUNT_PER_PAGE,
    error::ApiError,
    jwt::SessionData,
    pagination::PageContext,
    permissions::{can_modify_recipe, ActionType},
    schema::{
        ListKind, NewRecipe, Recipe, RecipeFilter, RecipeIngredient, RecipeListRow, RecipeView,
        Tag, UserProfile,
    },
};

pub async fn get_recipe(id: i32, pool: &Pool<Postgres>) -> Result<Option<Recipe>, ApiError> {
    let row: Option<Recipe> = sqlx::query_as("SELECT * FROM recipes WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(row)
}

/// Fetches a recipe for mutation. Only the author or an admin gets it
/// back; everyone else is read-only.
pub async fn get_recipe_mut(
    id: i32,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<Recipe, ApiError> {
    session.authenticate(ActionType::ManageOwnRecipes)?;

    let recipe = get_recipe(id, pool)
        .await?
        .ok_or_else(|| ApiError::not_found("recipe"))?;

    if !can_modify_recipe(session, recipe.author_id) {
        return Err(ApiError::Forbidden(
            "only the author or an admin may modify this recipe".to_string(),
        ));
    }

    Ok(recipe)
}

/// Builds the dynamic listing query for the given filter. Membership
/// filters resolve against the viewer; an anonymous viewer has no
/// memberships, so those filters match nothing instead of erroring.
pub fn build_recipe_query(
    filter: &RecipeFilter,
    viewer: Option<i32>,
) -> QueryBuilder<'static, Postgres> {
    let mut query: QueryBuilder<'static, Postgres> =
        QueryBuilder::new("SELECT r.*, COUNT(*) OVER() AS count FROM recipes r WHERE TRUE");

    if let Some(author_id) = filter.author {
        query.push(" AND r.author_id = ").push_bind(author_id);
    }

    let slugs = filter.tag_slugs();
    if !slugs.is_empty() {
        query.push(
            " AND EXISTS (SELECT 1 FROM recipe_tags rt \
             INNER JOIN tags t ON t.id = rt.tag_id \
             WHERE rt.recipe_id = r.id AND t.slug = ANY(",
        );
        query.push_bind(slugs);
        query.push("))");
    }

    for kind in [ListKind::Favorite, ListKind::ShoppingCart] {
        if !filter.wants_membership(kind) {
            continue;
        }
        match viewer {
            Some(viewer_id) => {
                query.push(
                    " AND EXISTS (SELECT 1 FROM user_recipe_lists l \
                     WHERE l.recipe_id = r.id AND l.user_id = ",
                );
                query.push_bind(viewer_id);
                query.push(" AND l.kind = ").push_bind(kind);
                query.push(")");
            }
            None => {
                query.push(" AND FALSE");
            }
        }
    }

    query.push(" ORDER BY r.pub_date DESC LIMIT ");
    query.push_bind(RECIPE_COUNT_PER_PAGE);
    query.push(" OFFSET ");
    query.push_bind(filter.offset.unwrap_or(0));

    query
}

pub async fn fetch_recipes(
    filter: &RecipeFilter,
    viewer: Option<i32>,
    pool: &Pool<Postgres>,
) -> Result<PageContext<RecipeView>, ApiError> {
    let mut query = build_recipe_query(filter, viewer);
    let rows: Vec<RecipeListRow> = query.build_query_as().fetch_all(pool).await?;

    let total_count = rows.first().map(|r| r.count).unwrap_or(0);
    let recipes: Vec<Recipe> = rows.into_iter().map(Recipe::from).collect();
    let views = assemble_views(recipes, viewer, pool).await?;

    Ok(PageContext::from_rows(
        views,
        total_count,
        RECIPE_COUNT_PER_PAGE,
        filter.offset.unwrap_or(0),
    ))
}

pub async fn get_recipe_view(
    id: i32,
    viewer: Option<i32>,
    pool: &Pool<Postgres>,
) -> Result<RecipeView, ApiError> {
    let recipe = get_recipe(id, pool)
        .await?
        .ok_or_else(|| ApiError::not_found("recipe"))?;

    let mut views = assemble_views(vec![recipe], viewer, pool).await?;
    Ok(views.remove(0))
}

pub async fn create_recipe(
    session: &SessionData,
    payload: &NewRecipe,
    pool: &Pool<Postgres>,
) -> Result<RecipeView, ApiError> {
    session.authenticate(ActionType::CreateRecipes)?;
    check_payload(payload, pool).await?;

    let mut tx = pool.begin().await?;

    let recipe: (i32,) = sqlx::query_as(
        "
        INSERT INTO recipes (author_id, name, image, text, cooking_time)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
    ",
    )
    .bind(session.user_id)
    .bind(&payload.name)
    .bind(&payload.image)
    .bind(&payload.text)
    .bind(payload.cooking_time)
    .fetch_one(&mut *tx)
    .await?;
    let recipe_id = recipe.0;

    insert_ingredient_links(recipe_id, payload, &mut tx).await?;
    insert_tag_links(recipe_id, payload, &mut tx).await?;

    tx.commit().await?;

    get_recipe_view(recipe_id, Some(session.user_id), pool).await
}

/// Full-replace update: scalars are overwritten unconditionally, tag
/// and ingredient links are cleared and recreated from the payload.
/// Runs in one transaction so a partial failure never leaves a recipe
/// without ingredients.
pub async fn update_recipe(
    recipe_id: i32,
    session: &SessionData,
    payload: &NewRecipe,
    pool: &Pool<Postgres>,
) -> Result<RecipeView, ApiError> {
    let recipe = get_recipe_mut(recipe_id, session, pool).await?;
    check_payload(payload, pool).await?;

    let mut tx = pool.begin().await?;

    sqlx::query(
        "UPDATE recipes SET name = $1, image = $2, text = $3, cooking_time = $4 WHERE id = $5",
    )
    .bind(&payload.name)
    .bind(&payload.image)
    .bind(&payload.text)
    .bind(payload.cooking_time)
    .bind(recipe.id)
    .execute(&mut *tx)
    .await?;

    sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = $1")
        .bind(recipe.id)
        .execute(&mut *tx)
        .await?;
    insert_tag_links(recipe.id, payload, &mut tx).await?;

    sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = $1")
        .bind(recipe.id)
        .execute(&mut *tx)
        .await?;
    insert_ingredient_links(recipe.id, payload, &mut tx).await?;

    tx.commit().await?;

    get_recipe_view(recipe.id, Some(session.user_id), pool).await
}

pub async fn delete_recipe(
    recipe_id: i32,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<(), ApiError> {
    let recipe = get_recipe_mut(recipe_id, session, pool).await?;

    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = $1")
        .bind(recipe.id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = $1")
        .bind(recipe.id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM user_recipe_lists WHERE recipe_id = $1")
        .bind(recipe.id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM recipes WHERE id = $1")
        .bind(recipe.id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok(())
}

async fn check_payload(payload: &NewRecipe, pool: &Pool<Postgres>) -> Result<(), ApiError> {
    payload.validate()?;

    let ids: Vec<i32> = payload.ingredients.iter().map(|i| i.id).collect();
    let missing = super::ingredients::missing_ingredient_ids(&ids, pool).await?;
    if !missing.is_empty() {
        return Err(ApiError::NotFound(format!(
            "unknown ingredient ids: {missing:?}"
        )));
    }

    Ok(())
}

async fn insert_ingredient_links(
    recipe_id: i32,
    payload: &NewRecipe,
    tx: &mut sqlx::Transaction<'_, Postgres>,
) -> Result<(), ApiError> {
    let mut query: QueryBuilder<Postgres> =
        QueryBuilder::new("INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount) ");

    query.push_values(&payload.ingredients, |mut b, entry| {
        b.push_bind(recipe_id).push_bind(entry.id).push_bind(entry.amount);
    });

    query.build().execute(&mut **tx).await?;

    Ok(())
}

async fn insert_tag_links(
    recipe_id: i32,
    payload: &NewRecipe,
    tx: &mut sqlx::Transaction<'_, Postgres>,
) -> Result<(), ApiError> {
    if payload.tags.is_empty() {
        return Ok(());
    }

    let mut query: QueryBuilder<Postgres> =
        QueryBuilder::new("INSERT INTO recipe_tags (recipe_id, tag_id) ");

    query.push_values(&payload.tags, |mut b, tag_id| {
        b.push_bind(recipe_id).push_bind(tag_id);
    });

    query.build().execute(&mut **tx).await?;

    Ok(())
}

#[derive(sqlx::FromRow)]
struct RecipeTagRow {
    recipe_id: i32,
    id: i32,
    name: String,
    color: String,
    slug: String,
}

#[derive(sqlx::FromRow)]
struct RecipeIngredientRow {
    recipe_id: i32,
    id: i32,
    name: String,
    measurement_unit: String,
    amount: i32,
}

#[derive(sqlx::FromRow)]
struct MembershipRow {
    recipe_id: i32,
    kind: ListKind,
}

/// Resolves bare recipe rows into the serialized shape: author with
/// is_subscribed, tag set, ingredient amounts, and the viewer's
/// membership flags. Batched per collection, not per recipe.
async fn assemble_views(
    recipes: Vec<Recipe>,
    viewer: Option<i32>,
    pool: &Pool<Postgres>,
) -> Result<Vec<RecipeView>, ApiError> {
    if recipes.is_empty() {
        return Ok(vec![]);
    }

    let recipe_ids: Vec<i32> = recipes.iter().map(|r| r.id).collect();
    let author_ids: Vec<i32> = recipes.iter().map(|r| r.author_id).collect();

    let tag_rows: Vec<RecipeTagRow> = sqlx::query_as(
        "
        SELECT rt.recipe_id, t.id, t.name, t.color, t.slug
        FROM recipe_tags rt
        INNER JOIN tags t ON t.id = rt.tag_id
        WHERE rt.recipe_id = ANY($1)
        ORDER BY t.id
    ",
    )
    .bind(&recipe_ids)
    .fetch_all(pool)
    .await?;

    let ingredient_rows: Vec<RecipeIngredientRow> = sqlx::query_as(
        "
        SELECT ri.recipe_id, i.id, i.name, i.measurement_unit, ri.amount
        FROM recipe_ingredients ri
        INNER JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE ri.recipe_id = ANY($1)
        ORDER BY i.id
    ",
    )
    .bind(&recipe_ids)
    .fetch_all(pool)
    .await?;

    let authors: Vec<crate::schema::User> =
        sqlx::query_as("SELECT * FROM users WHERE id = ANY($1)")
            .bind(&author_ids)
            .fetch_all(pool)
            .await?;

    let (memberships, followed) = match viewer {
        Some(viewer_id) => {
            let memberships: Vec<MembershipRow> = sqlx::query_as(
                "
                SELECT recipe_id, kind FROM user_recipe_lists
                WHERE user_id = $1 AND recipe_id = ANY($2)
            ",
            )
            .bind(viewer_id)
            .bind(&recipe_ids)
            .fetch_all(pool)
            .await?;

            let followed: Vec<(i32,)> = sqlx::query_as(
                "SELECT author_id FROM user_follows WHERE user_id = $1 AND author_id = ANY($2)",
            )
            .bind(viewer_id)
            .bind(&author_ids)
            .fetch_all(pool)
            .await?;

            (memberships, followed)
        }
        None => (vec![], vec![]),
    };

    let mut tags: HashMap<i32, Vec<Tag>> = HashMap::new();
    for row in tag_rows {
        tags.entry(row.recipe_id).or_default().push(Tag {
            id: row.id,
            name: row.name,
            color: row.color,
            slug: row.slug,
        });
    }

    let mut ingredients: HashMap<i32, Vec<RecipeIngredient>> = HashMap::new();
    for row in ingredient_rows {
        ingredients
            .entry(row.recipe_id)
            .or_default()
            .push(RecipeIngredient {
                id: row.id,
                name: row.name,
                measurement_unit: row.measurement_unit,
                amount: row.amount,
            });
    }

    let authors: HashMap<i32, crate::schema::User> =
        authors.into_iter().map(|u| (u.id, u)).collect();
    let followed: HashSet<i32> = followed.into_iter().map(|(id,)| id).collect();
    let favorited: HashSet<i32> = memberships
        .iter()
        .filter(|m| m.kind == ListKind::Favorite)
        .map(|m| m.recipe_id)
        .collect();
    let in_cart: HashSet<i32> = memberships
        .iter()
        .filter(|m| m.kind == ListKind::ShoppingCart)
        .map(|m| m.recipe_id)
        .collect();

    let views = recipes
        .into_iter()
        .map(|recipe| {
            let author = authors
                .get(&recipe.author_id)
                .cloned()
                .ok_or_else(|| ApiError::Database("recipe author is missing".to_string()))?;

            Ok(RecipeView {
                id: recipe.id,
                author: UserProfile::from_user(author, followed.contains(&recipe.author_id)),
                tags: tags.remove(&recipe.id).unwrap_or_default(),
                ingredients: ingredients.remove(&recipe.id).unwrap_or_default(),
                is_favorited: favorited.contains(&recipe.id),
                is_in_shopping_cart: in_cart.contains(&recipe.id),
                name: recipe.name,
                image: recipe.image,
                text: recipe.text,
                cooking_time: recipe.cooking_time,
                pub_date: recipe.pub_date,
            })
        })
        .collect::<Result<Vec<_>, ApiError>>()?;

    Ok(views)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_filter_adds_no_clauses() {
        let query = build_recipe_query(&RecipeFilter::default(), None);
        let sql = query.sql();
        assert!(sql.contains("WHERE TRUE ORDER BY r.pub_date DESC"));
        assert!(!sql.contains("user_recipe_lists"));
    }

    #[test]
    fn tag_filter_uses_any_over_slugs() {
        let filter = RecipeFilter {
            tags: Some("breakfast,lunch".to_string()),
            ..Default::default()
        };
        let query = build_recipe_query(&filter, None);
        // one EXISTS over the slug set, so multiple tags are OR, not AND
        assert_eq!(query.sql().matches("EXISTS").count(), 1);
        assert!(query.sql().contains("t.slug = ANY("));
    }

    #[test]
    fn author_filter_is_exact_match() {
        let filter = RecipeFilter {
            author: Some(3),
            ..Default::default()
        };
        let query = build_recipe_query(&filter, None);
        assert!(query.sql().contains("r.author_id = $1"));
    }

    #[test]
    fn membership_filter_resolves_against_viewer() {
        let filter = RecipeFilter {
            is_favorited: Some(true),
            is_in_shopping_cart: Some(true),
            ..Default::default()
        };
        let query = build_recipe_query(&filter, Some(42));
        assert_eq!(query.sql().matches("user_recipe_lists").count(), 2);
    }

    #[test]
    fn anonymous_viewer_with_membership_filter_matches_nothing() {
        let filter = RecipeFilter {
            is_favorited: Some(true),
            ..Default::default()
        };
        let query = build_recipe_query(&filter, None);
        assert!(query.sql().contains("AND FALSE"));
        assert!(!query.sql().contains("user_recipe_lists"));
    }

    #[test]
    fn false_membership_filter_adds_no_clause() {
        let filter = RecipeFilter {
            is_favorited: Some(false),
            is_in_shopping_cart: Some(false),
            ..Default::default()
        };
        let query = build_recipe_query(&filter, Some(42));
        assert!(!query.sql().contains("user_recipe_lists"));
        assert!(!query.sql().contains("AND FALSE"));
    }
}
