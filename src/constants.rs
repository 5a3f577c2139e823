pub const RECIPE_COUNT_PER_PAGE: i64 = 6;
pub const MAX_COUNT_PER_PAGE: i64 = 100;

pub const MIN_COOKING_TIME: i32 = 1;
pub const MAX_COOKING_TIME: i32 = 32_000;

pub const MIN_AMOUNT_INGREDIENTS: i32 = 1;
pub const MAX_AMOUNT_INGREDIENTS: i32 = 32_000;

pub const SESSION_LIFETIME_HOURS: i64 = 24;

pub const SHOPPING_LIST_HEADER: &str = "Список покупок:";
pub const SHOPPING_LIST_FILENAME: &str = "shopping_cart.txt";

pub const RESERVED_USERNAMES: &[&str] = &["me"];

pub const MAX_EMAIL_LENGTH: usize = 254;
pub const MAX_NAME_LENGTH: usize = 150;
pub const MAX_TAG_LENGTH: usize = 50;
pub const MIN_PASSWORD_LENGTH: usize = 8;
