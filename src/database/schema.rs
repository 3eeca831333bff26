use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::ApiError;

#[derive(
    Clone, Debug, PartialEq, PartialOrd, sqlx::Type, Serialize, Deserialize, Eq, Ord, Hash,
)]
#[sqlx(type_name = "user_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    User,
    Admin,
}

/// Named user-scoped recipe list. Both kinds live in one polymorphic
/// table (`user_recipe_lists`) keyed by (user, recipe, kind).
#[derive(
    Clone, Copy, Debug, PartialEq, PartialOrd, sqlx::Type, Serialize, Deserialize, Eq, Ord, Hash,
)]
#[sqlx(type_name = "list_kind", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ListKind {
    Favorite,
    ShoppingCart,
}

impl ListKind {
    pub fn label(&self) -> &'static str {
        match self {
            ListKind::Favorite => "favorites",
            ListKind::ShoppingCart => "shopping cart",
        }
    }
}

#[derive(Clone, Debug, sqlx::FromRow, Serialize)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub role: UserRole,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// User as seen by another caller.
#[derive(Clone, Debug, Serialize)]
pub struct UserProfile {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub is_subscribed: bool,
}

impl UserProfile {
    pub fn from_user(user: User, is_subscribed: bool) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            is_subscribed,
        }
    }
}

/// Immutable reference data.
#[derive(Clone, Debug, sqlx::FromRow, Serialize)]
pub struct Tag {
    pub id: i32,
    pub name: String,
    pub color: String,
    pub slug: String,
}

#[derive(Clone, Debug, sqlx::FromRow, Serialize)]
pub struct Ingredient {
    pub id: i32,
    pub name: String,
    pub measurement_unit: String,
}

#[derive(Clone, Debug, sqlx::FromRow, Serialize)]
pub struct Recipe {
    pub id: i32,
    pub author_id: i32,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
    pub pub_date: DateTime<Utc>,
}

/// Listing row carrying the window-function total alongside the data.
#[derive(Clone, Debug, sqlx::FromRow)]
pub struct RecipeListRow {
    pub id: i32,
    pub author_id: i32,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
    pub pub_date: DateTime<Utc>,
    pub count: i64,
}

impl From<RecipeListRow> for Recipe {
    fn from(row: RecipeListRow) -> Self {
        Recipe {
            id: row.id,
            author_id: row.author_id,
            name: row.name,
            image: row.image,
            text: row.text,
            cooking_time: row.cooking_time,
            pub_date: row.pub_date,
        }
    }
}

/// Short projection returned from membership toggles and subscription
/// listings.
#[derive(Clone, Debug, sqlx::FromRow, Serialize)]
pub struct ShortRecipe {
    pub id: i32,
    pub name: String,
    pub image: String,
    pub cooking_time: i32,
}

/// One ingredient of a recipe together with its required amount.
#[derive(Clone, Debug, sqlx::FromRow, Serialize)]
pub struct RecipeIngredient {
    pub id: i32,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

/// Fully resolved recipe as served to clients.
#[derive(Clone, Debug, Serialize)]
pub struct RecipeView {
    pub id: i32,
    pub author: UserProfile,
    pub tags: Vec<Tag>,
    pub ingredients: Vec<RecipeIngredient>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
    pub pub_date: DateTime<Utc>,
}

/// Followed author together with their recipes, as returned by
/// subscribe and the subscription listing.
#[derive(Clone, Debug, Serialize)]
pub struct FollowedAuthor {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub is_subscribed: bool,
    pub recipes: Vec<ShortRecipe>,
    pub recipes_count: i64,
}

#[derive(Clone, Debug, Deserialize)]
pub struct IngredientAmount {
    pub id: i32,
    pub amount: i32,
}

/// Create/update payload for a recipe. Tags and ingredients are
/// replaced wholesale on update, never merged.
#[derive(Clone, Debug, Deserialize)]
pub struct NewRecipe {
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
    pub tags: Vec<i32>,
    pub ingredients: Vec<IngredientAmount>,
}

impl NewRecipe {
    /// Structural validation, independent of the store. Referenced
    /// ingredient ids are checked for existence separately.
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.cooking_time < 1 {
            return Err(ApiError::Validation(
                "cooking_time must be at least 1 minute".to_string(),
            ));
        }
        if self.ingredients.is_empty() {
            return Err(ApiError::Validation(
                "recipe must have at least one ingredient".to_string(),
            ));
        }

        let mut seen: Vec<i32> = Vec::with_capacity(self.ingredients.len());
        for entry in &self.ingredients {
            if entry.amount < 1 {
                return Err(ApiError::Validation(format!(
                    "amount for ingredient {} must be at least 1",
                    entry.id
                )));
            }
            if seen.contains(&entry.id) {
                return Err(ApiError::Validation(
                    "ingredients must not repeat".to_string(),
                ));
            }
            seen.push(entry.id);
        }

        Ok(())
    }
}

/// Query parameters accepted by the recipe listing. Tags arrive as a
/// comma-separated list of slugs and match with OR semantics.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct RecipeFilter {
    pub tags: Option<String>,
    pub author: Option<i32>,
    pub is_favorited: Option<bool>,
    pub is_in_shopping_cart: Option<bool>,
    pub offset: Option<i64>,
}

impl RecipeFilter {
    pub fn tag_slugs(&self) -> Vec<String> {
        self.tags
            .as_deref()
            .unwrap_or("")
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Only `true` constrains the result; `false` and absent are
    /// no-ops. This asymmetry is intentional and load-bearing.
    pub fn wants_membership(&self, kind: ListKind) -> bool {
        match kind {
            ListKind::Favorite => self.is_favorited == Some(true),
            ListKind::ShoppingCart => self.is_in_shopping_cart == Some(true),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct IngredientFilter {
    pub name: Option<String>,
}

impl IngredientFilter {
    /// ILIKE pattern for a case-insensitive starts-with match, with
    /// pattern metacharacters in the needle escaped.
    pub fn name_pattern(&self) -> Option<String> {
        self.name.as_deref().map(|name| {
            let escaped = name.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_");
            format!("{escaped}%")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload() -> NewRecipe {
        NewRecipe {
            name: "Borscht".to_string(),
            image: "recipes/borscht.png".to_string(),
            text: "Simmer for an hour".to_string(),
            cooking_time: 60,
            tags: vec![1],
            ingredients: vec![
                IngredientAmount { id: 1, amount: 2 },
                IngredientAmount { id: 2, amount: 5 },
            ],
        }
    }

    #[test]
    fn valid_payload_passes() {
        assert!(payload().validate().is_ok());
    }

    #[test]
    fn empty_ingredients_rejected() {
        let mut recipe = payload();
        recipe.ingredients.clear();
        assert!(matches!(
            recipe.validate(),
            Err(ApiError::Validation(_))
        ));
    }

    #[test]
    fn duplicate_ingredient_ids_rejected() {
        let mut recipe = payload();
        recipe.ingredients.push(IngredientAmount { id: 1, amount: 3 });
        assert!(matches!(
            recipe.validate(),
            Err(ApiError::Validation(_))
        ));
    }

    #[test]
    fn zero_cooking_time_rejected() {
        let mut recipe = payload();
        recipe.cooking_time = 0;
        assert!(matches!(
            recipe.validate(),
            Err(ApiError::Validation(_))
        ));
    }

    #[test]
    fn zero_amount_rejected() {
        let mut recipe = payload();
        recipe.ingredients[0].amount = 0;
        assert!(matches!(
            recipe.validate(),
            Err(ApiError::Validation(_))
        ));
    }

    #[test]
    fn tag_slugs_split_on_commas() {
        let filter = RecipeFilter {
            tags: Some("breakfast, lunch,,dinner".to_string()),
            ..Default::default()
        };
        assert_eq!(filter.tag_slugs(), vec!["breakfast", "lunch", "dinner"]);
        assert!(RecipeFilter::default().tag_slugs().is_empty());
    }

    #[test]
    fn false_membership_filter_is_noop() {
        let filter = RecipeFilter {
            is_favorited: Some(false),
            ..Default::default()
        };
        assert!(!filter.wants_membership(ListKind::Favorite));
        assert!(!filter.wants_membership(ListKind::ShoppingCart));
    }

    #[test]
    fn name_pattern_escapes_metacharacters() {
        let filter = IngredientFilter {
            name: Some("100%_salt".to_string()),
        };
        assert_eq!(filter.name_pattern().unwrap(), "100\\%\\_salt%");
        assert_eq!(IngredientFilter::default().name_pattern(), None);
    }
}
