use std::{error::Error, path::Path, process};

use log::{error, info, warn};
use serde::de::DeserializeOwned;
use sqlx::postgres::PgPoolOptions;

use recipe_hub::{
    actions::{create_ingredients, create_tags},
    schema::{NewIngredient, NewTag},
    Config, MAX_INGREDIENT_NAME_LENGTH, MAX_MEASUREMENT_UNIT_LENGTH, MAX_TAG_COLOR_LENGTH,
    MAX_TAG_NAME_LENGTH,
};

const CHUNK_SIZE: usize = 1000;

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, Box<dyn Error>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("Can't read {}: {e}", path.display()))?;
    let rows = serde_json::from_str(&content)
        .map_err(|e| format!("Can't parse {}: {e}", path.display()))?;
    Ok(rows)
}

fn fits(value: &str, max: usize) -> bool {
    !value.trim().is_empty() && value.chars().count() <= max
}

fn usable_ingredient(ingredient: &NewIngredient) -> bool {
    fits(&ingredient.name, MAX_INGREDIENT_NAME_LENGTH)
        && fits(&ingredient.measurement_unit, MAX_MEASUREMENT_UNIT_LENGTH)
}

fn usable_tag(tag: &NewTag) -> bool {
    fits(&tag.name, MAX_TAG_NAME_LENGTH)
        && fits(&tag.slug, MAX_TAG_NAME_LENGTH)
        && tag.color.starts_with('#')
        && fits(&tag.color, MAX_TAG_COLOR_LENGTH)
}

async fn run(ingredients: &Path, tags: Option<&Path>) -> Result<(), Box<dyn Error>> {
    let config = Config::load()?;
    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&config.database_url)
        .await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    info!("Starting ingredient import from {}", ingredients.display());
    let (rows, skipped): (Vec<NewIngredient>, Vec<NewIngredient>) = read_json(ingredients)?
        .into_iter()
        .partition(usable_ingredient);
    if !skipped.is_empty() {
        warn!("Skipping {} ingredients with empty or oversized fields", skipped.len());
    }

    let mut inserted = 0;
    for chunk in rows.chunks(CHUNK_SIZE) {
        inserted += create_ingredients(chunk, &pool).await?;
    }
    info!("Inserted {inserted} of {} ingredients", rows.len());

    if let Some(tags) = tags {
        info!("Starting tag import from {}", tags.display());
        let (rows, skipped): (Vec<NewTag>, Vec<NewTag>) =
            read_json(tags)?.into_iter().partition(usable_tag);
        if !skipped.is_empty() {
            warn!("Skipping {} malformed tags", skipped.len());
        }

        let inserted = create_tags(&rows, &pool).await?;
        info!("Inserted {inserted} of {} tags", rows.len());
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let args: Vec<String> = std::env::args().skip(1).collect();
    let (ingredients, tags) = match args.as_slice() {
        [ingredients] => (Path::new(ingredients), None),
        [ingredients, tags] => (Path::new(ingredients), Some(Path::new(tags))),
        _ => {
            eprintln!("Usage: load_data <ingredients.json> [tags.json]");
            process::exit(2);
        }
    };

    if let Err(e) = run(ingredients, tags).await {
        error!("Import failed: {e}");
        process::exit(1);
    }
}
