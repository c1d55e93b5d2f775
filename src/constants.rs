pub const RECIPE_COUNT_PER_PAGE: i64 = 6;
pub const USER_COUNT_PER_PAGE: i64 = 6;
pub const MAX_PAGE_SIZE: i64 = 100;

pub const MIN_COOKING_TIME: i32 = 1;
pub const MIN_INGREDIENT_AMOUNT: i32 = 1;

pub const MAX_RECIPE_NAME_LENGTH: usize = 200;
pub const MAX_INGREDIENT_NAME_LENGTH: usize = 200;
pub const MAX_MEASUREMENT_UNIT_LENGTH: usize = 200;
pub const MAX_TAG_NAME_LENGTH: usize = 200;
pub const MAX_TAG_COLOR_LENGTH: usize = 7;

pub const MAX_USERNAME_LENGTH: usize = 150;
pub const MAX_PERSON_NAME_LENGTH: usize = 150;
pub const MAX_EMAIL_LENGTH: usize = 254;

pub const MAX_BODY_SIZE: u64 = 1024 * 1024 * 16;

pub const RECIPE_IMAGE_DIR: &str = "recipes/images";
pub const SHOPPING_CART_FILENAME: &str = "shopping-cart.txt";

pub const IMAGE_TYPES: &[(&str, &str)] = &[
    ("image/png", "png"),
    ("image/jpeg", "jpg"),
    ("image/jpg", "jpg"),
    ("image/gif", "gif"),
    ("image/webp", "webp"),
];
