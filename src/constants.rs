pub const RECIPE_COUNT_PER_PAGE: i64 = 10;
pub const SUBSCRIPTION_COUNT_PER_PAGE: i64 = 10;

pub const LIST_KINDS: &[(&str, &str)] = &[
    ("favorite", "Favorites"),
    ("shopping_cart", "Shopping cart"),
];

pub const USER_ROLES: &[(&str, &str)] = &[("user", "User"), ("admin", "Administrator")];

pub const SHOPPING_LIST_FILE_PREFIX: &str = "shopping_cart_";
