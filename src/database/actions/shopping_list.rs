use sqlx::{Pool, Postgres};

use crate::{
    constants::SHOPPING_LIST_FILE_PREFIX,
    error::ApiError,
    schema::ListKind,
};

/// One ingredient requirement pulled from a cart recipe, or an
/// aggregated total after grouping by (name, unit).
#[derive(Clone, Debug, PartialEq, Eq, sqlx::FromRow)]
pub struct IngredientTotal {
    pub name: String,
    pub measurement_unit: String,
    pub amount: i64,
}

/// Rendered shopping list ready to be served as a text attachment.
#[derive(Clone, Debug)]
pub struct ShoppingList {
    pub filename: String,
    pub content: String,
}

pub async fn build_shopping_list(
    user_id: i32,
    pool: &Pool<Postgres>,
) -> Result<ShoppingList, ApiError> {
    let user = super::users::get_user_by_id(pool, user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("user"))?;

    let rows: Vec<IngredientTotal> = sqlx::query_as(
        "
        SELECT i.name AS name, i.measurement_unit AS measurement_unit, ri.amount::BIGINT AS amount
        FROM user_recipe_lists l
        INNER JOIN recipe_ingredients ri ON ri.recipe_id = l.recipe_id
        INNER JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE l.user_id = $1 AND l.kind = $2
        ORDER BY ri.recipe_id, ri.ingredient_id
    ",
    )
    .bind(user_id)
    .bind(ListKind::ShoppingCart)
    .fetch_all(pool)
    .await?;

    ensure_cart_not_empty(&rows)?;

    let totals = aggregate_amounts(rows);

    Ok(ShoppingList {
        filename: format!("{SHOPPING_LIST_FILE_PREFIX}{}.txt", user.username),
        content: render_shopping_list(&user.full_name(), &totals),
    })
}

/// An empty cart never yields a report, not even an empty file.
pub fn ensure_cart_not_empty(rows: &[IngredientTotal]) -> Result<(), ApiError> {
    if rows.is_empty() {
        return Err(ApiError::Validation("shopping cart is empty".to_string()));
    }
    Ok(())
}

/// Groups requirement rows by (name, unit) and sums amounts with exact
/// integer addition. Group order is the first-seen order of the input.
pub fn aggregate_amounts(rows: Vec<IngredientTotal>) -> Vec<IngredientTotal> {
    let mut totals: Vec<IngredientTotal> = Vec::new();
    for row in rows {
        match totals
            .iter_mut()
            .find(|t| t.name == row.name && t.measurement_unit == row.measurement_unit)
        {
            Some(total) => total.amount += row.amount,
            None => totals.push(row),
        }
    }

    totals
}

/// Plain-text report: a header naming the user, then one
/// `NAME (UNIT) - TOTAL` line per aggregated ingredient.
pub fn render_shopping_list(full_name: &str, totals: &[IngredientTotal]) -> String {
    let mut out = format!("Shopping list for {full_name}\n\n");
    for total in totals {
        out.push_str(&format!(
            "{} ({}) - {}\n",
            total.name, total.measurement_unit, total.amount
        ));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(name: &str, unit: &str, amount: i64) -> IngredientTotal {
        IngredientTotal {
            name: name.to_string(),
            measurement_unit: unit.to_string(),
            amount,
        }
    }

    #[test]
    fn amounts_sum_per_name_and_unit() {
        // cart: recipe A (Salt 2g), recipe B (Salt 3g, Pepper 1g)
        let totals = aggregate_amounts(vec![
            row("Salt", "g", 2),
            row("Salt", "g", 3),
            row("Pepper", "g", 1),
        ]);

        assert_eq!(totals, vec![row("Salt", "g", 5), row("Pepper", "g", 1)]);
    }

    #[test]
    fn same_name_different_unit_stays_separate() {
        let totals = aggregate_amounts(vec![
            row("Milk", "ml", 200),
            row("Milk", "g", 50),
            row("Milk", "ml", 100),
        ]);

        assert_eq!(totals, vec![row("Milk", "ml", 300), row("Milk", "g", 50)]);
    }

    #[test]
    fn group_order_is_first_seen_order() {
        let totals = aggregate_amounts(vec![
            row("Pepper", "g", 1),
            row("Salt", "g", 2),
            row("Pepper", "g", 2),
        ]);

        assert_eq!(totals[0].name, "Pepper");
        assert_eq!(totals[1].name, "Salt");
    }

    #[test]
    fn empty_cart_fails_validation() {
        assert!(matches!(
            ensure_cart_not_empty(&[]),
            Err(ApiError::Validation(_))
        ));
        assert!(ensure_cart_not_empty(&[row("Salt", "g", 2)]).is_ok());
    }

    #[test]
    fn report_has_header_and_one_line_per_group() {
        let content = render_shopping_list(
            "Ada Lovelace",
            &[row("Salt", "g", 5), row("Pepper", "g", 1)],
        );

        assert_eq!(
            content,
            "Shopping list for Ada Lovelace\n\nSalt (g) - 5\nPepper (g) - 1\n"
        );
    }
}
