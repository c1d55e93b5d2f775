use std::{error::Error, process};

use log::{error, info};
use sqlx::postgres::PgPoolOptions;

use recipe_hub::{
    filters::{routes, Context},
    Config,
};

async fn run() -> Result<(), Box<dyn Error>> {
    let config = Config::load()?;

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Database migrations applied");

    let port = config.port;
    info!("Serving media from {}", config.media_root.display());
    info!("Listening on port {port}");

    warp::serve(routes(Context::new(pool, config)))
        .run(([0, 0, 0, 0], port))
        .await;
    Ok(())
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    if let Err(e) = run().await {
        error!("Server failed to start: {e}");
        process::exit(1);
    }
}
